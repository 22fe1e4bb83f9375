//! Policy & Consent (spec.md §4.14).
//!
//! Grounded on `examples/original_source/layers/crosscutting/policy.py`'s
//! `ActionType`/`check_permission` shape, but the check ordering here
//! follows spec.md's literal statement rather than the original's sequence
//! — see `DESIGN.md` for the divergence.

use crate::types::{AgentConfig, WriteApprovalPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Read,
    Write,
    Delete,
    Notification,
    Execute,
}

/// Keyword classification of a free-text action verb, grounded on the
/// original's `_classify_action` substring matching.
pub fn classify_action(action: &str) -> ActionType {
    let lower = action.to_lowercase();
    if lower.contains("delete") || lower.contains("remove") {
        ActionType::Delete
    } else if lower.contains("notify") || lower.contains("alert") || lower.contains("send_dm") {
        ActionType::Notification
    } else if lower.contains("read")
        || lower.contains("get")
        || lower.contains("fetch")
        || lower.contains("list")
    {
        ActionType::Read
    } else if lower.contains("execute") || lower.contains("run") {
        ActionType::Execute
    } else {
        ActionType::Write
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub requires_approval: bool,
    pub reason: String,
}

impl PolicyDecision {
    fn allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn pending_approval(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            requires_approval: true,
            reason: reason.into(),
        }
    }
}

/// Pure function from (action, agent config) to an allow/deny/pending
/// verdict. Reads are unconditional; forbidden actions are denied
/// regardless of the allowlist; an agent-level approval policy overrides
/// the default write-block behavior for its own risk tier (spec.md §4.14).
pub fn check_permission(action: &str, agent_config: &AgentConfig) -> PolicyDecision {
    let classification = classify_action(action);
    if matches!(classification, ActionType::Read) {
        return PolicyDecision::allowed("reads are always allowed");
    }

    let safety = &agent_config.safety;
    if safety.forbid_list.iter().any(|f| f == action) {
        return PolicyDecision::denied("action is on the forbidden list");
    }
    if safety.allow_list.iter().any(|a| a == action) {
        return PolicyDecision::allowed("action is on the allowlist");
    }
    if !safety.default_write_block {
        return PolicyDecision::allowed("default write block is disabled");
    }

    match safety.approval_policy {
        WriteApprovalPolicy::AutoApproved => {
            PolicyDecision::allowed("auto-approved under low-risk policy")
        }
        WriteApprovalPolicy::RequiresApproval => {
            PolicyDecision::pending_approval("write requires approval under medium-risk policy")
        }
        WriteApprovalPolicy::Blocked => PolicyDecision::denied("writes blocked under high-risk policy"),
    }
}

/// Basic shape validation for a synthesized AgentConfig, grounded on the
/// original's `validate_agent_config`: the approval policy must match the
/// risk tier it claims to be derived from.
pub fn validate_agent_config(agent_config: &AgentConfig) -> Result<(), String> {
    let expected = WriteApprovalPolicy::for_risk(agent_config.risk_level);
    if agent_config.safety.approval_policy != expected {
        return Err(format!(
            "approval policy {:?} does not match risk level {:?}",
            agent_config.safety.approval_policy, agent_config.risk_level
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, RiskLevel};
    use crate::types::{AgentInputs, Logic, SafetyPolicy, Trigger};

    fn config(risk: RiskLevel, allow: Vec<&str>, forbid: Vec<&str>, default_write_block: bool) -> AgentConfig {
        AgentConfig {
            id: "agent_1".into(),
            solution_name: "solution".into(),
            domain: Domain::Email,
            risk_level: risk,
            trigger: Trigger::Event {
                source: "email".into(),
                event: "new_mail".into(),
            },
            inputs: AgentInputs {
                scope: "metadata_and_subject".into(),
                sensitivity: "medium".into(),
            },
            tools: vec![],
            logic: Logic::default(),
            actions: vec![],
            safety: SafetyPolicy {
                risk_level: risk,
                default_write_block,
                allow_list: allow.into_iter().map(String::from).collect(),
                forbid_list: forbid.into_iter().map(String::from).collect(),
                approval_policy: WriteApprovalPolicy::for_risk(risk),
            },
        }
    }

    #[test]
    fn reads_are_always_allowed_even_under_high_risk() {
        let cfg = config(RiskLevel::High, vec![], vec![], true);
        let decision = check_permission("read_inbox", &cfg);
        assert!(decision.allowed);
    }

    #[test]
    fn forbidden_wins_over_allowlist() {
        let cfg = config(RiskLevel::Low, vec!["apply_label"], vec!["apply_label"], true);
        let decision = check_permission("apply_label", &cfg);
        assert!(!decision.allowed);
        assert!(!decision.requires_approval);
    }

    #[test]
    fn high_risk_blocks_writes_outright() {
        let cfg = config(RiskLevel::High, vec![], vec![], true);
        let decision = check_permission("apply_label", &cfg);
        assert!(!decision.allowed);
        assert!(!decision.requires_approval);
    }

    #[test]
    fn medium_risk_requires_approval() {
        let cfg = config(RiskLevel::Medium, vec![], vec![], true);
        let decision = check_permission("apply_label", &cfg);
        assert!(decision.requires_approval);
        assert!(!decision.allowed);
    }

    #[test]
    fn low_risk_auto_approves_writes() {
        let cfg = config(RiskLevel::Low, vec![], vec![], true);
        let decision = check_permission("apply_label", &cfg);
        assert!(decision.allowed);
    }

    #[test]
    fn allowlisted_action_bypasses_block() {
        let cfg = config(RiskLevel::High, vec!["apply_label"], vec![], true);
        let decision = check_permission("apply_label", &cfg);
        assert!(decision.allowed);
    }

    #[test]
    fn validate_agent_config_catches_mismatched_policy() {
        let mut cfg = config(RiskLevel::High, vec![], vec![], true);
        cfg.safety.approval_policy = WriteApprovalPolicy::AutoApproved;
        assert!(validate_agent_config(&cfg).is_err());
    }
}
