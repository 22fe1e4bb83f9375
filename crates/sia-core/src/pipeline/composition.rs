//! Composition — AgentConfig Synthesis (spec.md §4.11).
//!
//! Grounded verbatim on `examples/original_source/layers/composition.py`'s
//! `compose_agent`/`_generate_*` helpers: domain resolution order, per-
//! domain trigger/scope defaults, the tool-name mapping table, and the
//! risk-level-derived approval policy. The legacy `workflow` field and the
//! Korean solution-name keyword matching are not carried over — this
//! implementation keys off gap/problem `kind` instead (see `DESIGN.md`).

use serde_json::json;

use crate::domain::{Domain, RiskLevel};
use crate::error::{Result, SiaError};
use crate::problem::Problem;
use crate::types::{
    ActionEffectType, AgentAction, AgentConfig, AgentInputs, Logic, LogicRule, SafetyPolicy, Solution,
    ToolDescriptor, Trigger, WriteApprovalPolicy,
};
use crate::world_model::WorldModel;

/// Resolves the domain in spec.md §4.11's order: the Problem, then the
/// Solution (if it carries a recognizable name hint), then the first
/// matching connected source. Missing domain is fatal.
fn resolve_domain(problem: Option<&Problem>, world_model: &WorldModel) -> Result<Domain> {
    if let Some(problem) = problem {
        return Ok(problem.domain);
    }
    for (name, source) in world_model.connected_sources.iter() {
        if source.status == "active" {
            if let Some(domain) = Domain::from_str(&name.to_lowercase()) {
                return Ok(domain);
            }
        }
    }
    Err(SiaError::MissingDomain)
}

fn default_trigger(domain: Domain, solution_name: &str) -> Trigger {
    let lower = solution_name.to_lowercase();
    match domain {
        Domain::Email if lower.contains("summary") || lower.contains("report") => Trigger::Schedule {
            cron: "0 9 * * *".into(),
        },
        Domain::Email => Trigger::Event {
            source: "gmail".into(),
            event: "new_email".into(),
        },
        Domain::Github if lower.contains("review") => Trigger::Event {
            source: "github".into(),
            event: "new_pr".into(),
        },
        Domain::Github => Trigger::Schedule {
            cron: "0 10 * * 1-5".into(),
        },
        Domain::Health => Trigger::Schedule { cron: "0 8 * * *".into() },
        Domain::Finance => Trigger::Schedule { cron: "0 22 * * *".into() },
        Domain::Multi => Trigger::Event {
            source: "multi".into(),
            event: "data_update".into(),
        },
    }
}

fn default_inputs(domain: Domain) -> AgentInputs {
    let scope = match domain {
        Domain::Email => "metadata_and_subject",
        Domain::Github => "pr_metadata",
        Domain::Health => "aggregated_metrics",
        Domain::Finance => "transaction_metadata",
        Domain::Multi => "metadata",
    };
    AgentInputs {
        scope: scope.to_string(),
        sensitivity: if scope == "metadata" { "low".into() } else { "medium".into() },
    }
}

/// Maps a required tool name to a typed descriptor using the domain's tool
/// table; unknown names fall through to `ToolDescriptor::Unknown`.
fn resolve_tool(tool_name: &str, domain: Domain) -> ToolDescriptor {
    let table: &[(&str, &str, &str)] = match domain {
        // (tool_name, mcp source name or "llm"/"function", model/implementation)
        Domain::Email => &[
            ("email_reader", "mcp:gmail", ""),
            ("classifier", "llm", "email_classifier"),
            ("label_applier", "mcp:gmail", ""),
            ("priority_scorer", "llm", "priority_scorer"),
            ("sorter", "function", "email_sorter"),
            ("summarizer", "llm", "email_summarizer"),
        ],
        Domain::Github => &[
            ("pr_reader", "mcp:github", ""),
            ("reviewer", "llm", "pr_reviewer"),
            ("notifier", "mcp:slack", ""),
            ("priority_scorer", "llm", "pr_priority_scorer"),
        ],
        Domain::Health => &[
            ("health_reader", "mcp:apple_health", ""),
            ("analyzer", "llm", "health_analyzer"),
            ("notifier", "mcp:notification", ""),
        ],
        Domain::Finance => &[
            ("transaction_reader", "mcp:finance_app", ""),
            ("categorizer", "llm", "transaction_categorizer"),
            ("analyzer", "llm", "spending_analyzer"),
        ],
        Domain::Multi => &[],
    };

    const COMMON: &[(&str, &str, &str)] = &[
        ("notification", "mcp:notification", ""),
        ("report_generator", "llm", "report_generator"),
    ];

    let entry = table
        .iter()
        .chain(COMMON.iter())
        .find(|(name, ..)| *name == tool_name);

    let Some((name, kind, detail)) = entry else {
        return ToolDescriptor::Unknown { name: tool_name.to_string() };
    };

    if let Some(source) = kind.strip_prefix("mcp:") {
        ToolDescriptor::Mcp {
            name: name.to_string(),
            source: source.to_string(),
            permissions: json!({"read": [], "write": []}),
        }
    } else if *kind == "llm" {
        ToolDescriptor::Llm {
            name: detail.to_string(),
            model: "sia-default-llm".to_string(),
            task: name.to_string(),
        }
    } else {
        ToolDescriptor::Function { name: detail.to_string() }
    }
}

fn default_logic(domain: Domain, gap_kind: &str) -> Logic {
    let rule = |if_: &str, then: &str| LogicRule { if_: if_.to_string(), then: then.to_string() };
    let rules = match (domain, gap_kind) {
        (Domain::Email, "visibility") => vec![rule("sender in VIP_LIST", "importance = high")],
        (Domain::Github, "review_delay") => vec![rule("pr.age_hours > 48", "review_priority = high")],
        (Domain::Health, "sleep_deficit") => vec![rule("sleep.duration_hours < 7", "alert = true")],
        (Domain::Finance, "overspending") => vec![rule("category == 'delivery_app' and weekly_total > 50000", "alert = true")],
        _ => Vec::new(),
    };
    let llm_task = match domain {
        Domain::Email => "score_priority",
        Domain::Github => "score_priority",
        Domain::Health => "analyze_patterns",
        Domain::Finance => "analyze_spending",
        Domain::Multi => "process",
    };
    Logic {
        rules,
        llm_task: Some(llm_task.to_string()),
    }
}

fn default_actions(domain: Domain, gap_kind: &str) -> Vec<AgentAction> {
    let action = |if_: Option<&str>, do_: &str, kind: ActionEffectType, requires_approval: bool, schedule: Option<&str>| AgentAction {
        if_: if_.map(String::from),
        do_: do_.to_string(),
        kind,
        requires_approval,
        schedule: schedule.map(String::from),
    };

    match (domain, gap_kind) {
        (Domain::Email, "visibility") => vec![
            action(Some("importance == high"), "gmail.apply_label('Important')", ActionEffectType::Write, true, None),
            action(None, "notification.send_dm(daily_summary)", ActionEffectType::Notification, false, Some("daily_09:00")),
        ],
        (Domain::Github, "review_delay") => vec![action(
            Some("pr.review_status == 'pending' and pr.age_hours > 48"),
            "slack.send_dm(pr_review_needed)",
            ActionEffectType::Notification,
            false,
            None,
        )],
        (Domain::Health, "sleep_deficit") => vec![action(
            Some("sleep.duration_hours < 7"),
            "notification.send_push(sleep_deficit_alert)",
            ActionEffectType::Notification,
            false,
            None,
        )],
        (Domain::Finance, "overspending") => vec![action(
            Some("weekly_spending > limit"),
            "notification.send_dm(overspending_alert)",
            ActionEffectType::Notification,
            false,
            None,
        )],
        (domain, _) => vec![action(None, &format!("process_{}()", domain.as_str()), ActionEffectType::Read, false, None)],
    }
}

fn default_safety_policy(risk_level: RiskLevel, world_model: &WorldModel) -> SafetyPolicy {
    let policy = &world_model.safety.policy;
    let default_write_block = policy.get("default_write_block").and_then(|v| v.as_bool()).unwrap_or(true);
    let allow_list = policy
        .get("action_allowlist")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let forbid_list = policy
        .get("forbidden_actions")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();

    SafetyPolicy {
        risk_level,
        default_write_block,
        allow_list,
        forbid_list,
        approval_policy: WriteApprovalPolicy::for_risk(risk_level),
    }
}

/// Synthesizes an AgentConfig for `solution`, resolving domain in spec.md
/// §4.11's order and building trigger/inputs/tools/logic/actions/safety
/// from the domain (and, where one exists, the driving gap's `kind`).
pub fn compose_agent(
    solution: &Solution,
    problem: Option<&Problem>,
    world_model: &WorldModel,
    created_on: &str,
) -> Result<AgentConfig> {
    let domain = resolve_domain(problem, world_model)?;
    // Problems don't carry the originating gap's `kind` directly, only its
    // id; the driving gap's semantic kind is recovered from the problem's
    // name template. Agents composed without a problem (manual composition)
    // get no gap-specific rule/action.
    let gap_kind_hint = gap_kind_from_problem(problem);

    let tools: Vec<ToolDescriptor> = solution.required_tools.iter().map(|t| resolve_tool(t, domain)).collect();

    Ok(AgentConfig {
        id: format!("agent_{}_{created_on}", solution.id),
        solution_name: solution.name.clone(),
        domain,
        risk_level: solution.risk_level,
        trigger: default_trigger(domain, &solution.name),
        inputs: default_inputs(domain),
        tools,
        logic: default_logic(domain, gap_kind_hint),
        actions: default_actions(domain, gap_kind_hint),
        safety: default_safety_policy(solution.risk_level, world_model),
    })
}

fn gap_kind_from_problem(problem: Option<&Problem>) -> &'static str {
    let Some(problem) = problem else { return "" };
    match problem.name.as_str() {
        "important mail visibility problem" => "visibility",
        "important mail response delay problem" => "response_time",
        "PR review delay problem" => "review_delay",
        "sleep deficit problem" => "sleep_deficit",
        "excess spending problem" => "overspending",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use crate::types::Complexity;
    use crate::world_model::ConnectedSource;

    fn problem(domain: Domain, name: &str) -> Problem {
        Problem::new_candidate(
            "problem_1".into(),
            "gap_1".into(),
            domain,
            name.into(),
            "desc".into(),
            "cause".into(),
            "impact".into(),
            Severity::High,
            vec![],
            0.7,
        )
    }

    fn solution(risk: RiskLevel, required_tools: Vec<&str>) -> Solution {
        Solution {
            id: "sol_1".into(),
            name: "automatic classification system".into(),
            description: "desc".into(),
            pros: vec![],
            cons: vec![],
            complexity: Complexity::Medium,
            risk_level: risk,
            required_tools: required_tools.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn domain_resolves_from_problem() {
        let wm = WorldModel::default();
        let cfg = compose_agent(&solution(RiskLevel::Low, vec![]), Some(&problem(Domain::Email, "x")), &wm, "20260101").unwrap();
        assert_eq!(cfg.domain, Domain::Email);
    }

    #[test]
    fn missing_domain_without_problem_or_connected_source_is_fatal() {
        let wm = WorldModel::default();
        let err = compose_agent(&solution(RiskLevel::Low, vec![]), None, &wm, "20260101").unwrap_err();
        assert!(matches!(err, SiaError::MissingDomain));
    }

    #[test]
    fn domain_resolves_from_connected_source_when_no_problem() {
        let mut wm = WorldModel::default();
        wm.connected_sources.insert(
            "github".into(),
            ConnectedSource { read: vec![], write: vec![], status: "active".into() },
        );
        let cfg = compose_agent(&solution(RiskLevel::Low, vec![]), None, &wm, "20260101").unwrap();
        assert_eq!(cfg.domain, Domain::Github);
    }

    #[test]
    fn high_risk_blocks_writes_in_safety_policy() {
        let wm = WorldModel::default();
        let cfg = compose_agent(&solution(RiskLevel::High, vec![]), Some(&problem(Domain::Email, "x")), &wm, "20260101").unwrap();
        assert_eq!(cfg.safety.approval_policy, WriteApprovalPolicy::Blocked);
    }

    #[test]
    fn unknown_tool_name_yields_unknown_descriptor() {
        let wm = WorldModel::default();
        let cfg = compose_agent(
            &solution(RiskLevel::Low, vec!["mystery_tool"]),
            Some(&problem(Domain::Email, "x")),
            &wm,
            "20260101",
        )
        .unwrap();
        assert!(matches!(cfg.tools[0], ToolDescriptor::Unknown { .. }));
    }

    #[test]
    fn known_tool_resolves_to_mcp_descriptor() {
        let wm = WorldModel::default();
        let cfg = compose_agent(
            &solution(RiskLevel::Low, vec!["email_reader"]),
            Some(&problem(Domain::Email, "x")),
            &wm,
            "20260101",
        )
        .unwrap();
        assert!(matches!(cfg.tools[0], ToolDescriptor::Mcp { .. }));
    }
}
