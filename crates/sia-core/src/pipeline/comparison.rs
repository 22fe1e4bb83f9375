//! Comparison — Tiered Inference (spec.md §4.7).
//!
//! Grounded verbatim on `examples/original_source/layers/comparison.py`'s
//! per-domain `_detect_*_gaps` rules: cheap detection always runs and is
//! authoritative; an optional LLM pass may enrich a gap's description but
//! never replaces or discards what the rules found.

use serde_json::json;

use crate::baseline::{calculate_baseline, Baseline};
use crate::domain::{Domain, Severity};
use crate::ports::LlmPort;
use crate::scoring::filter_gaps_by_score;
use crate::types::{CurrentState, Evidence, Gap};
use crate::world_model::WorldModel;

/// Runs cheap per-domain detection against `state`, scores the resulting
/// gaps with the given baseline window, and returns the threshold-filtered,
/// score-sorted list (spec.md §4.7). `state.domain` must be a concrete
/// domain — callers iterate `Domain::concrete()` against a `multi` state.
pub async fn compare(
    state: &CurrentState,
    world_model: &WorldModel,
    threshold: f64,
    baseline_window_weeks: u32,
    llm: Option<&dyn LlmPort>,
) -> Vec<Gap> {
    let domain = state.domain;
    let baseline = calculate_baseline(domain, world_model, baseline_window_weeks);

    let mut gaps = match domain {
        Domain::Email => detect_email_gaps(state),
        Domain::Github => detect_github_gaps(state),
        Domain::Health => detect_health_gaps(state),
        Domain::Finance => detect_finance_gaps(state),
        Domain::Multi => Vec::new(),
    };

    if let Some(llm) = llm {
        enrich_with_llm(&mut gaps, llm).await;
    }

    filter_gaps_by_score(gaps, world_model, threshold, baseline.as_ref())
}

async fn enrich_with_llm(gaps: &mut [Gap], llm: &dyn LlmPort) {
    for gap in gaps.iter_mut() {
        let prompt = format!(
            "Explain in one sentence why this is a problem: {} (current: {}, expected: {})",
            gap.description, gap.current, gap.expected
        );
        if let Ok(explanation) = llm.generate(&prompt, 96).await {
            if !explanation.trim().is_empty() {
                gap.description = explanation.trim().to_string();
            }
        }
    }
}

fn detect_email_gaps(state: &CurrentState) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let emails = state.data.get("emails").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    let important: Vec<&serde_json::Value> = emails
        .iter()
        .filter(|e| e.get("hidden_priority").and_then(|v| v.as_str()) == Some("high"))
        .collect();

    if !important.is_empty() {
        let top_5 = &emails[..emails.len().min(5)];
        let important_in_top = top_5
            .iter()
            .any(|e| e.get("hidden_priority").and_then(|v| v.as_str()) == Some("high"));

        if !important_in_top {
            let in_top_count = top_5
                .iter()
                .filter(|e| e.get("hidden_priority").and_then(|v| v.as_str()) == Some("high"))
                .count();
            gaps.push(Gap {
                id: "gap_1".into(),
                kind: "visibility".into(),
                domain: Domain::Email,
                description: "important mail is not visible at the top of the inbox".into(),
                severity: Severity::High,
                current: format!("{in_top_count} of {} important emails are in the top 5", important.len()),
                expected: "important mail should be at the top".into(),
                affected_items: important.iter().take(3).filter_map(|e| id_of(e)).collect(),
                evidence: Evidence {
                    current_value: json!(in_top_count),
                    expected_value: json!(important.len()),
                    trend: Some("stable".into()),
                    recurrence_count: 1,
                },
                problem_score: None,
            });
        }
    }

    let unread_important: Vec<&&serde_json::Value> = important
        .iter()
        .filter(|e| !e.get("read").and_then(|v| v.as_bool()).unwrap_or(false))
        .collect();

    if !unread_important.is_empty() {
        gaps.push(Gap {
            id: "gap_2".into(),
            kind: "response_time".into(),
            domain: Domain::Email,
            description: "unread important mail".into(),
            severity: Severity::High,
            current: format!("{} unread important emails", unread_important.len()),
            expected: "important mail confirmed within 30 minutes".into(),
            affected_items: unread_important.iter().take(3).filter_map(|e| id_of(e)).collect(),
            evidence: Evidence {
                current_value: json!(unread_important.len()),
                expected_value: json!(0),
                trend: Some("increasing".into()),
                recurrence_count: 2,
            },
            problem_score: None,
        });
    }

    gaps
}

fn detect_github_gaps(state: &CurrentState) -> Vec<Gap> {
    let prs = state.data.get("prs").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    let old_prs: Vec<&serde_json::Value> = prs
        .iter()
        .filter(|pr| {
            pr.get("review_status").and_then(|v| v.as_str()) == Some("pending")
                && pr.get("age_hours").and_then(|v| v.as_f64()).unwrap_or(0.0) > 48.0
        })
        .collect();

    if old_prs.is_empty() {
        return Vec::new();
    }

    vec![Gap {
        id: "gap_github_1".into(),
        kind: "review_delay".into(),
        domain: Domain::Github,
        description: "a pending review has been waiting more than 48 hours".into(),
        severity: Severity::High,
        current: format!("{} delayed PRs", old_prs.len()),
        expected: "PRs should be reviewed within 24 h".into(),
        affected_items: old_prs.iter().take(3).filter_map(|pr| id_of(pr)).collect(),
        evidence: Evidence {
            current_value: json!(old_prs.len()),
            expected_value: json!(0),
            trend: Some("stable".into()),
            recurrence_count: 1,
        },
        problem_score: None,
    }]
}

fn detect_health_gaps(state: &CurrentState) -> Vec<Gap> {
    let records = state.data.get("records").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    let avg_sleep = state.data.get("average_sleep_hours").and_then(|v| v.as_f64()).unwrap_or(0.0);

    if records.is_empty() || avg_sleep >= 7.0 {
        return Vec::new();
    }

    let affected_items = records
        .iter()
        .rev()
        .take(3)
        .filter_map(|r| r.get("date").and_then(|v| v.as_str()).map(String::from))
        .collect();

    vec![Gap {
        id: "gap_health_1".into(),
        kind: "sleep_deficit".into(),
        domain: Domain::Health,
        description: "average sleep is below 7 hours".into(),
        severity: Severity::Medium,
        current: format!("average sleep {avg_sleep:.1} hours"),
        expected: "average sleep at least 7 hours".into(),
        affected_items,
        evidence: Evidence {
            current_value: json!(avg_sleep),
            expected_value: json!(7.0),
            trend: Some("stable".into()),
            recurrence_count: records.len() as u32,
        },
        problem_score: None,
    }]
}

fn detect_finance_gaps(state: &CurrentState) -> Vec<Gap> {
    let transactions = state.data.get("transactions").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    let delivery_spending = state
        .data
        .get("category_spending")
        .and_then(|v| v.get("delivery_app"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    if delivery_spending <= 50_000.0 {
        return Vec::new();
    }

    let matching: Vec<&serde_json::Value> = transactions
        .iter()
        .filter(|t| t.get("category").and_then(|v| v.as_str()) == Some("delivery_app"))
        .collect();

    vec![Gap {
        id: "gap_finance_1".into(),
        kind: "overspending".into(),
        domain: Domain::Finance,
        description: "delivery-app spending exceeds the weekly budget".into(),
        severity: Severity::Medium,
        current: format!("delivery-app spending {delivery_spending}"),
        expected: "weekly delivery-app spending at or under 50000".into(),
        affected_items: matching.iter().take(3).filter_map(|t| id_of(t)).collect(),
        evidence: Evidence {
            current_value: json!(delivery_spending),
            expected_value: json!(50_000),
            trend: Some("increasing".into()),
            recurrence_count: matching.len() as u32,
        },
        problem_score: None,
    }]
}

fn id_of(value: &serde_json::Value) -> Option<String> {
    value.get("id").and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state(domain: Domain, data: serde_json::Value) -> CurrentState {
        CurrentState {
            domain,
            domains: None,
            timestamp: Utc::now(),
            data,
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn email_visibility_gap_is_detected_and_scored() {
        let data = json!({
            "emails": [
                {"id": "e1", "hidden_priority": "low", "read": true},
                {"id": "e2", "hidden_priority": "low", "read": true},
                {"id": "e3", "hidden_priority": "low", "read": true},
                {"id": "e4", "hidden_priority": "low", "read": true},
                {"id": "e5", "hidden_priority": "low", "read": true},
                {"id": "e6", "hidden_priority": "high", "read": false}
            ]
        });
        let wm = WorldModel::default();
        let gaps = compare(&state(Domain::Email, data), &wm, 0.0, 3, None).await;
        assert!(gaps.iter().any(|g| g.kind == "visibility"));
        assert!(gaps.iter().any(|g| g.kind == "response_time"));
        for gap in &gaps {
            assert!(gap.problem_score.is_some());
        }
    }

    #[tokio::test]
    async fn github_review_delay_requires_pending_and_aged_pr() {
        let data = json!({"prs": [{"id": "pr1", "review_status": "pending", "age_hours": 72}]});
        let wm = WorldModel::default();
        let gaps = compare(&state(Domain::Github, data), &wm, 0.0, 3, None).await;
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, "review_delay");
    }

    #[tokio::test]
    async fn health_no_gap_when_sleep_meets_target() {
        let data = json!({"records": [{"date": "2026-01-01"}], "average_sleep_hours": 7.5});
        let wm = WorldModel::default();
        let gaps = compare(&state(Domain::Health, data), &wm, 0.0, 3, None).await;
        assert!(gaps.is_empty());
    }

    #[tokio::test]
    async fn finance_overspending_detected_above_budget() {
        let data = json!({
            "transactions": [{"id": "t1", "category": "delivery_app"}],
            "category_spending": {"delivery_app": 60000}
        });
        let wm = WorldModel::default();
        let gaps = compare(&state(Domain::Finance, data), &wm, 0.0, 3, None).await;
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, "overspending");
    }
}
