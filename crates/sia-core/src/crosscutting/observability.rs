//! Observability & Audit (spec.md §4.17).
//!
//! Grounded on `examples/original_source/layers/crosscutting/observability.py`'s
//! `AuditLogger`: one append-only `.jsonl` file per category, never
//! truncated or rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::error::{Result, SiaError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalLogEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: DateTime<Utc>,
    pub problem_candidate_id: String,
    pub evidence: Value,
    pub proposal_text: String,
    pub alternatives_shown: Vec<String>,
    pub user_decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub trigger_event_id: Option<String>,
    pub tool_calls: Vec<Value>,
    pub actions: Vec<Value>,
    pub outcome_metrics: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: DateTime<Utc>,
    pub error_type: String,
    pub error_message: String,
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub timestamp: DateTime<Utc>,
    pub decision_type: String,
    pub decision_data: Value,
    pub reasoning: Option<String>,
}

/// Append-only audit trail, one `.jsonl` file per category under `log_dir`.
pub struct AuditLogger {
    log_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir)
            .map_err(|e| SiaError::StoreUnavailable(format!("{}: {e}", log_dir.display())))?;
        Ok(Self { log_dir })
    }

    pub fn log_proposal(
        &self,
        problem_candidate_id: &str,
        evidence: Value,
        proposal_text: &str,
        alternatives_shown: Vec<String>,
        user_decision: &str,
    ) -> Result<()> {
        self.append(
            "proposals",
            &ProposalLogEntry {
                kind: "proposal",
                timestamp: Utc::now(),
                problem_candidate_id: problem_candidate_id.to_string(),
                evidence,
                proposal_text: proposal_text.to_string(),
                alternatives_shown,
                user_decision: user_decision.to_string(),
            },
        )
    }

    pub fn log_execution(
        &self,
        agent_id: &str,
        trigger_event_id: Option<String>,
        tool_calls: Vec<Value>,
        actions: Vec<Value>,
        outcome_metrics: Value,
    ) -> Result<()> {
        self.append(
            "executions",
            &ExecutionLogEntry {
                kind: "execution",
                timestamp: Utc::now(),
                agent_id: agent_id.to_string(),
                trigger_event_id,
                tool_calls,
                actions,
                outcome_metrics,
            },
        )
    }

    pub fn log_error(&self, error_type: &str, error_message: &str, context: Value) -> Result<()> {
        error!(error_type, error_message, "sia audit: error");
        self.append(
            "errors",
            &ErrorLogEntry {
                kind: "error",
                timestamp: Utc::now(),
                error_type: error_type.to_string(),
                error_message: error_message.to_string(),
                context,
            },
        )
    }

    pub fn log_decision(
        &self,
        decision_type: &str,
        decision_data: Value,
        reasoning: Option<String>,
    ) -> Result<()> {
        self.append(
            "decisions",
            &DecisionLogEntry {
                kind: "decision",
                timestamp: Utc::now(),
                decision_type: decision_type.to_string(),
                decision_data,
                reasoning,
            },
        )
    }

    /// Reads back every `execution` entry for `agent_id`, oldest first.
    pub fn get_execution_history(&self, agent_id: &str) -> Result<Vec<ExecutionLogEntry>> {
        let path = self.category_path("executions");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| SiaError::StoreUnavailable(format!("{}: {e}", path.display())))?;
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: ExecutionLogEntry = serde_json::from_str(line)
                .map_err(|e| SiaError::ParseError(format!("{}: {e}", path.display())))?;
            if entry.agent_id == agent_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn category_path(&self, category: &str) -> PathBuf {
        self.log_dir.join(format!("{category}.jsonl"))
    }

    fn append<T: Serialize>(&self, category: &str, entry: &T) -> Result<()> {
        let path = self.category_path(category);
        write_jsonl_line(&path, entry)
    }
}

fn write_jsonl_line<T: Serialize>(path: &Path, entry: &T) -> Result<()> {
    let line = serde_json::to_string(entry)
        .map_err(|e| SiaError::ParseError(format!("serializing audit entry: {e}")))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SiaError::StoreUnavailable(format!("{}: {e}", path.display())))?;
    writeln!(file, "{line}")
        .map_err(|e| SiaError::StoreUnavailable(format!("{}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_proposal_appends_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path()).unwrap();
        logger
            .log_proposal("problem_1", serde_json::json!({}), "do the thing", vec![], "approve")
            .unwrap();
        let contents = fs::read_to_string(dir.path().join("proposals.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn execution_history_filters_by_agent_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(dir.path()).unwrap();
        logger
            .log_execution("agent_a", None, vec![], vec![], serde_json::json!({"n": 1}))
            .unwrap();
        logger
            .log_execution("agent_b", None, vec![], vec![], serde_json::json!({"n": 2}))
            .unwrap();
        logger
            .log_execution("agent_a", None, vec![], vec![], serde_json::json!({"n": 3}))
            .unwrap();

        let history = logger.get_execution_history("agent_a").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].outcome_metrics["n"], 1);
        assert_eq!(history[1].outcome_metrics["n"], 3);
    }

    #[test]
    fn missing_log_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("logs");
        let logger = AuditLogger::new(&nested).unwrap();
        logger
            .log_decision("snooze", serde_json::json!({}), None)
            .unwrap();
        assert!(nested.join("decisions.jsonl").exists());
    }
}
