//! External capability ports (spec.md §6): the only seams through which
//! this engine talks to the outside world. Grounded on
//! `crates/pagi-core/src/orchestrator/traits.rs`'s trait-object shape
//! (async methods over `Send + Sync`, default-free).

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Domain;
use crate::error::{Result, SiaError};
use crate::types::Proposal;
use crate::world_model::WorldModel;

/// Metadata-only read from one domain Source. Raw message bodies never
/// cross this boundary (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct SourceQueryResult {
    pub domain: Domain,
    pub data: Value,
}

/// A single Execution step's outcome (spec.md §4.12). `retries` on
/// `Successful`/`Failed` counts retries already spent reaching this
/// outcome; it never replaces the outcome itself — per spec.md §7, a step
/// that exhausts its retries is still recorded as failed, and one that
/// succeeds after a retry is still recorded as successful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Successful { retries: u32 },
    Failed { reason: String, retries: u32 },
    Skipped { reason: String },
    RateLimited { retry_after_secs: u64 },
    Conflict { holder: String },
    LabelConflict { holder: String, label: String },
    PendingApproval { reason: String },
    Blocked { reason: String },
}

/// The Execution mini-runtime's result object: per-step outcomes, counts
/// per class, and domain-typed processed data, ready for the audit log.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub agent_id: String,
    pub step_outcomes: Vec<StepOutcome>,
    pub successful_count: u32,
    pub failed_count: u32,
    pub retried_count: u32,
    pub skipped_count: u32,
    pub processed_data: Value,
}

impl ExecutionResult {
    pub fn from_steps(agent_id: impl Into<String>, step_outcomes: Vec<StepOutcome>, processed_data: Value) -> Self {
        let successful_count = step_outcomes.iter().filter(|s| matches!(s, StepOutcome::Successful { .. })).count() as u32;
        let failed_count = step_outcomes.iter().filter(|s| matches!(s, StepOutcome::Failed { .. })).count() as u32;
        let retried_count = step_outcomes
            .iter()
            .filter(|s| matches!(s, StepOutcome::Successful { retries } | StepOutcome::Failed { retries, .. } if *retries > 0))
            .count() as u32;
        let skipped_count = step_outcomes
            .iter()
            .filter(|s| {
                matches!(
                    s,
                    StepOutcome::Skipped { .. }
                        | StepOutcome::RateLimited { .. }
                        | StepOutcome::Conflict { .. }
                        | StepOutcome::LabelConflict { .. }
                        | StepOutcome::PendingApproval { .. }
                        | StepOutcome::Blocked { .. }
                )
            })
            .count() as u32;
        Self {
            agent_id: agent_id.into(),
            step_outcomes,
            successful_count,
            failed_count,
            retried_count,
            skipped_count,
            processed_data,
        }
    }

    /// Learning's `success_rate` input (spec.md §4.13): fraction of steps
    /// that completed successfully, 0 when there were none.
    pub fn success_rate(&self) -> f64 {
        let total = self.step_outcomes.len();
        if total == 0 {
            return 0.0;
        }
        self.successful_count as f64 / total as f64
    }
}

/// A readable/writable domain data source. No built-in implementation
/// talks to a real Gmail/GitHub/HealthKit/finance API; `sia-runtime` wires
/// an in-memory fixture for manual exercising (spec.md §6).
#[async_trait]
pub trait Source: Send + Sync {
    async fn query(&self, scope: &str, filters: Option<Value>) -> Result<SourceQueryResult>;
    async fn write(&self, action: &str, resource_id: &str, data: Value) -> Result<()>;
}

/// The Tiered Inference escape hatch used by Comparison/Interpretation/
/// Exploration/Composition when `llm_enabled` is set (spec.md §4.7-§4.11).
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Presents pipeline outputs to whatever UI `sia-runtime` hosts. No
/// built-in implementation renders anything beyond logging (spec.md §6).
pub trait Presenter: Send + Sync {
    fn present_proposal(&self, proposal: &Proposal);
    fn present_execution(&self, result: &ExecutionResult);
    fn present_world_model_view(&self, world_model: &WorldModel);
}

/// `Presenter` that only logs via `tracing`, used when `sia-runtime` has no
/// richer UI wired up.
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present_proposal(&self, proposal: &Proposal) {
        tracing::info!(problem_id = %proposal.problem.id, status = ?proposal.status, "proposal ready");
    }

    fn present_execution(&self, result: &ExecutionResult) {
        tracing::info!(
            agent_id = %result.agent_id,
            successful = result.successful_count,
            failed = result.failed_count,
            retried = result.retried_count,
            skipped = result.skipped_count,
            "execution complete"
        );
    }

    fn present_world_model_view(&self, world_model: &WorldModel) {
        tracing::info!(
            confirmed_problems = world_model.confirmed_problems.len(),
            candidates = world_model.problem_candidates.len(),
            active_agents = world_model.active_agents.len(),
            "world model snapshot"
        );
    }
}

/// Returns `SiaError::LlmUnavailable` for any in-memory fixture that has no
/// real model behind it.
pub struct NoLlm;

#[async_trait]
impl LlmPort for NoLlm {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        Err(SiaError::LlmUnavailable("no LLM configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_counts_are_derived_from_steps() {
        let result = ExecutionResult::from_steps(
            "agent_1",
            vec![
                StepOutcome::Successful { retries: 0 },
                StepOutcome::Successful { retries: 1 },
                StepOutcome::Failed { reason: "boom".into(), retries: 3 },
                StepOutcome::Skipped { reason: "dup".into() },
            ],
            serde_json::json!({}),
        );
        assert_eq!(result.successful_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.retried_count, 2);
        assert!((result.success_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_llm_is_unavailable() {
        let err = NoLlm.generate("prompt", 10).await.unwrap_err();
        assert!(matches!(err, SiaError::LlmUnavailable(_)));
    }
}
