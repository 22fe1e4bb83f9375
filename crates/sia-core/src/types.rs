//! Typed records that flow between pipeline stages (spec.md §3).
//!
//! Every free-form dictionary in the original layers becomes a named
//! struct here; unknown LLM-sourced fields are tolerated via `#[serde(default)]`,
//! never via a catch-all map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Domain, RiskLevel, Severity};

/// Evidence backing a detected Gap (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub current_value: serde_json::Value,
    pub expected_value: serde_json::Value,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub recurrence_count: u32,
}

/// A measurable deviation between CurrentState and Expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub domain: Domain,
    pub description: String,
    pub severity: Severity,
    pub current: String,
    pub expected: String,
    pub affected_items: Vec<String>,
    pub evidence: Evidence,
    #[serde(default)]
    pub problem_score: Option<f64>,
}

/// Snapshot produced by the Sensor; immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentState {
    pub domain: Domain,
    #[serde(default)]
    pub domains: Option<Vec<Domain>>,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A per-domain ideal-state target, either from World Model or a default table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdealState {
    pub id: String,
    pub domain: Domain,
    pub condition: String,
    pub criterion: String,
    pub target_value: serde_json::Value,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationContext {
    pub day: String,
    pub time: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationItem {
    pub id: String,
    pub description: String,
    pub criterion: String,
    pub target_value: serde_json::Value,
    pub priority: Priority,
}

/// Derived, never persisted (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    pub domain: Domain,
    pub context: ExpectationContext,
    pub ideal_states: Vec<IdealState>,
    pub expectations: Vec<ExpectationItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    /// `complexity_score` used by Proposal's argmax (spec.md §4.10).
    pub fn score(&self) -> i32 {
        match self {
            Complexity::Low => 3,
            Complexity::Medium => 2,
            Complexity::High => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
    pub required_tools: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Snoozed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub problem: crate::problem::Problem,
    pub recommended_solution: Solution,
    pub alternative_solutions: Vec<Solution>,
    pub status: ProposalStatus,
}

// ---- AgentConfig (Composition output, spec.md §3 / §4.11) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    Event { source: String, event: String },
    Schedule { cron: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInputs {
    pub scope: String,
    pub sensitivity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolDescriptor {
    Mcp {
        name: String,
        source: String,
        permissions: serde_json::Value,
    },
    Llm {
        name: String,
        model: String,
        task: String,
    },
    Function {
        name: String,
    },
    /// Unknown tool name; the executor refuses to invoke these.
    Unknown {
        name: String,
    },
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        match self {
            ToolDescriptor::Mcp { name, .. }
            | ToolDescriptor::Llm { name, .. }
            | ToolDescriptor::Function { name }
            | ToolDescriptor::Unknown { name } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicRule {
    #[serde(rename = "if")]
    pub if_: String,
    pub then: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logic {
    pub rules: Vec<LogicRule>,
    #[serde(default)]
    pub llm_task: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionEffectType {
    Read,
    Write,
    Notification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "if", default)]
    pub if_: Option<String>,
    #[serde(rename = "do")]
    pub do_: String,
    #[serde(rename = "type")]
    pub kind: ActionEffectType,
    pub requires_approval: bool,
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Derived from risk level (spec.md §4.11): low auto-approves writes,
/// medium requires approval, high blocks writes outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteApprovalPolicy {
    AutoApproved,
    RequiresApproval,
    Blocked,
}

impl WriteApprovalPolicy {
    pub fn for_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Low => WriteApprovalPolicy::AutoApproved,
            RiskLevel::Medium => WriteApprovalPolicy::RequiresApproval,
            RiskLevel::High => WriteApprovalPolicy::Blocked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    pub risk_level: RiskLevel,
    pub default_write_block: bool,
    #[serde(default)]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub forbid_list: Vec<String>,
    pub approval_policy: WriteApprovalPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub solution_name: String,
    pub domain: Domain,
    pub risk_level: RiskLevel,
    pub trigger: Trigger,
    pub inputs: AgentInputs,
    pub tools: Vec<ToolDescriptor>,
    pub logic: Logic,
    pub actions: Vec<AgentAction>,
    pub safety: SafetyPolicy,
}
