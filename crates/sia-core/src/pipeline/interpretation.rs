//! Interpretation (spec.md §4.8).
//!
//! Grounded verbatim on `examples/original_source/layers/interpretation.py`'s
//! domain/gap-type problem template table; the LLM path is preferred when
//! available, the template table is the fallback.

use crate::domain::Domain;
use crate::ports::LlmPort;
use crate::problem::Problem;
use crate::types::Gap;

struct Template {
    name: String,
    description: String,
    cause: String,
    impact: String,
}

fn template_for(domain: Domain, gap_kind: &str) -> Template {
    let t = |name: &str, description: &str, cause: &str, impact: &str| Template {
        name: name.to_string(),
        description: description.to_string(),
        cause: cause.to_string(),
        impact: impact.to_string(),
    };
    match (domain, gap_kind) {
        (Domain::Email, "visibility") => t(
            "important mail visibility problem",
            "important work email is not visible at the top of the inbox, risking being missed",
            "the inbox is pinned to chronological order and does not reflect priority",
            "delayed response to important mail, which can stall a project",
        ),
        (Domain::Email, "response_time") => t(
            "important mail response delay problem",
            "important mail is going unconfirmed, delaying a response",
            "too much mail has accumulated to find the important message quickly",
            "delayed communication with a manager or teammate erodes trust",
        ),
        (Domain::Github, "review_delay") => t(
            "PR review delay problem",
            "a pending review has been waiting more than 48 hours",
            "the review process is not structured and reviews are piling up",
            "delayed merges push back the deployment schedule and slow the team",
        ),
        (Domain::Health, "sleep_deficit") => t(
            "sleep deficit problem",
            "average sleep is below the recommended 7 hours",
            "work stress or an irregular schedule is cutting into sleep",
            "reduced focus lowers work efficiency and can damage health over time",
        ),
        (Domain::Finance, "overspending") => t(
            "excess spending problem",
            "delivery-app spending has exceeded the configured limit",
            "convenience-driven spending is accumulating without notice",
            "budget overruns throw off financial plans and savings goals",
        ),
        (domain, _) => Template {
            name: format!("{domain} domain problem"),
            description: String::new(),
            cause: "cause analysis needed".to_string(),
            impact: "impact analysis needed".to_string(),
        },
    }
}

/// Turns one scored Gap into a Candidate Problem. LLM path preferred for a
/// richer description; domain/gap-type template fallback otherwise.
pub async fn interpret_gap(gap: &Gap, llm: Option<&dyn LlmPort>) -> Problem {
    let template = template_for(gap.domain, &gap.kind);
    let mut name = template.name;
    let mut description = if template.description.is_empty() {
        gap.description.clone()
    } else {
        template.description
    };
    let mut cause = template.cause;
    let mut impact = template.impact;

    if let Some(llm) = llm {
        let prompt = format!(
            "A `{}` gap was detected in the `{}` domain: {}. \
             In one short sentence each, give a name, cause, and impact.",
            gap.kind, gap.domain, gap.description
        );
        if let Ok(generated) = llm.generate(&prompt, 256).await {
            if let Some((llm_name, llm_cause, llm_impact)) = parse_llm_triple(&generated) {
                name = llm_name;
                cause = llm_cause;
                impact = llm_impact;
                description = gap.description.clone();
            }
        }
    }

    Problem::new_candidate(
        format!("problem_{}", gap.id),
        gap.id.clone(),
        gap.domain,
        name,
        description,
        cause,
        impact,
        gap.severity,
        gap.affected_items.clone(),
        gap.problem_score.unwrap_or(0.5),
    )
}

pub async fn interpret_gaps(gaps: &[Gap], llm: Option<&dyn LlmPort>) -> Vec<Problem> {
    let mut problems = Vec::with_capacity(gaps.len());
    for gap in gaps {
        problems.push(interpret_gap(gap, llm).await);
    }
    problems
}

/// Expects three `name: / cause: / impact:` lines; any other shape is
/// treated as an unusable LLM response and the template fallback stands.
fn parse_llm_triple(text: &str) -> Option<(String, String, String)> {
    let mut name = None;
    let mut cause = None;
    let mut impact = None;
    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some(rest) = lower.strip_prefix("name:") {
            name = Some(line[line.len() - rest.len()..].trim().to_string());
        } else if let Some(rest) = lower.strip_prefix("cause:") {
            cause = Some(line[line.len() - rest.len()..].trim().to_string());
        } else if let Some(rest) = lower.strip_prefix("impact:") {
            impact = Some(line[line.len() - rest.len()..].trim().to_string());
        }
    }
    match (name, cause, impact) {
        (Some(n), Some(c), Some(i)) if !n.is_empty() && !c.is_empty() && !i.is_empty() => Some((n, c, i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use crate::state_machine::ProblemStatus;
    use crate::types::Evidence;
    use serde_json::json;

    fn gap(kind: &str, domain: Domain) -> Gap {
        Gap {
            id: "gap_1".into(),
            kind: kind.into(),
            domain,
            description: "desc".into(),
            severity: Severity::High,
            current: "current".into(),
            expected: "expected".into(),
            affected_items: vec!["e1".into()],
            evidence: Evidence {
                current_value: json!(1),
                expected_value: json!(0),
                trend: None,
                recurrence_count: 1,
            },
            problem_score: Some(0.73),
        }
    }

    #[tokio::test]
    async fn known_gap_type_uses_its_template() {
        let problem = interpret_gap(&gap("visibility", Domain::Email), None).await;
        assert_eq!(problem.name, "important mail visibility problem");
        assert_eq!(problem.status, ProblemStatus::Candidate);
        assert_eq!(problem.problem_score, 0.73);
        assert_eq!(problem.gap_id, "gap_1");
        assert_eq!(problem.id, "problem_gap_1");
    }

    #[tokio::test]
    async fn unknown_gap_type_falls_back_to_generic_template() {
        let problem = interpret_gap(&gap("mystery", Domain::Email), None).await;
        assert_eq!(problem.name, "email domain problem");
        assert_eq!(problem.description, "desc");
    }
}
