//! Problem Scorer (spec.md §4.3).
//!
//! Five weighted signals folded into a single `problem_score ∈ [0, 1]`.
//! Weights and thresholds are taken verbatim from spec.md, which itself
//! distills `examples/original_source/utils/problem_scoring.py`.

use chrono::{Datelike, Timelike, Utc};

use crate::baseline::Baseline;
use crate::domain::Severity;
use crate::types::Gap;
use crate::world_model::WorldModel;

const WEIGHT_PERSISTENCE: f64 = 0.25;
const WEIGHT_SEVERITY: f64 = 0.25;
const WEIGHT_CONTEXT: f64 = 0.20;
const WEIGHT_PREFERENCE_VIOLATION: f64 = 0.15;
const WEIGHT_UNSOLVED_COST: f64 = 0.15;

/// Computes `problem_score` for one Gap against the current World Model
/// and an optional personal baseline.
pub fn calculate_problem_score(gap: &Gap, world_model: &WorldModel, baseline: Option<&Baseline>) -> f64 {
    let score = WEIGHT_PERSISTENCE * persistence(gap)
        + WEIGHT_SEVERITY * severity(gap, baseline)
        + WEIGHT_CONTEXT * context_importance(gap, world_model)
        + WEIGHT_PREFERENCE_VIOLATION * preference_violation(gap, world_model)
        + WEIGHT_UNSOLVED_COST * unsolved_cost(gap);
    score.clamp(0.0, 1.0)
}

fn persistence(gap: &Gap) -> f64 {
    if gap.evidence.recurrence_count >= 3 {
        0.9
    } else if gap.evidence.recurrence_count >= 2 {
        0.6
    } else if matches!(
        gap.evidence.trend.as_deref(),
        Some("increasing") | Some("decreasing") | Some("stable")
    ) {
        0.8
    } else {
        0.2
    }
}

fn severity(gap: &Gap, baseline: Option<&Baseline>) -> f64 {
    let base = match gap.severity {
        Severity::High => 0.9,
        Severity::Medium => 0.6,
        Severity::Low => 0.3,
    };

    let Some(baseline) = baseline else {
        return base;
    };
    if baseline.baseline_value == 0.0 {
        return base;
    }
    let Some(current) = gap.evidence.current_value.as_f64() else {
        return base;
    };

    let relative_deviation = (current - baseline.baseline_value).abs() / baseline.baseline_value.abs();
    let shift = if relative_deviation >= 0.5 {
        0.2
    } else if relative_deviation >= 0.2 {
        0.0
    } else {
        -0.2
    };
    (base + shift).clamp(0.3, 1.0)
}

fn context_importance(gap: &Gap, world_model: &WorldModel) -> f64 {
    let now = Utc::now();
    let time_of_day_factor = if (9..18).contains(&now.hour()) { 0.7 } else { 0.4 };
    let weekday_factor = if now.weekday().number_from_monday() <= 5 {
        0.8
    } else {
        0.5
    };
    let same_domain_factor = if world_model.has_confirmed_problem_in_domain(gap.domain) {
        0.8
    } else {
        0.5
    };
    (time_of_day_factor + weekday_factor + same_domain_factor) / 3.0
}

fn indicates_notification_overload(gap: &Gap) -> bool {
    gap.kind == "visibility"
}

fn indicates_automation_need(gap: &Gap) -> bool {
    matches!(gap.kind.as_str(), "response_time" | "review_delay" | "overspending")
}

fn preference_violation(gap: &Gap, world_model: &WorldModel) -> f64 {
    let prefs = &world_model.preferences;
    if indicates_notification_overload(gap) && prefs.notification_frequency == "minimal" {
        0.9
    } else if indicates_automation_need(gap) && prefs.automation_acceptance == "low" {
        0.7
    } else {
        0.1
    }
}

fn unsolved_cost(gap: &Gap) -> f64 {
    let severity_cost = match gap.severity {
        Severity::High => 0.8,
        Severity::Medium => 0.5,
        Severity::Low => 0.2,
    };
    let type_cost = match gap.kind.as_str() {
        "missed_deadline" => 0.9,
        "response_time" => 0.7,
        "visibility" => 0.6,
        "pattern_deviation" => 0.4,
        _ => 0.5,
    };
    (severity_cost + type_cost) / 2.0
}

/// Scores every gap, keeps those at or above `threshold`, and returns them
/// sorted by descending score (spec.md §4.3).
pub fn filter_gaps_by_score(
    mut gaps: Vec<Gap>,
    world_model: &WorldModel,
    threshold: f64,
    baseline: Option<&Baseline>,
) -> Vec<Gap> {
    for gap in gaps.iter_mut() {
        gap.problem_score = Some(calculate_problem_score(gap, world_model, baseline));
    }
    gaps.retain(|g| g.problem_score.unwrap_or(0.0) >= threshold);
    gaps.sort_by(|a, b| {
        b.problem_score
            .unwrap_or(0.0)
            .partial_cmp(&a.problem_score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::types::Evidence;

    fn gap(kind: &str, severity: Severity, recurrence_count: u32, current_value: f64) -> Gap {
        Gap {
            id: "gap_1".into(),
            kind: kind.into(),
            domain: Domain::Email,
            description: "desc".into(),
            severity,
            current: "current".into(),
            expected: "expected".into(),
            affected_items: vec![],
            evidence: Evidence {
                current_value: serde_json::json!(current_value),
                expected_value: serde_json::json!(0),
                trend: None,
                recurrence_count,
            },
            problem_score: None,
        }
    }

    #[test]
    fn score_is_always_in_unit_interval() {
        let wm = WorldModel::default();
        let g = gap("visibility", Severity::High, 5, 100.0);
        let score = calculate_problem_score(&g, &wm, None);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn high_recurrence_dominates_persistence_signal() {
        let wm = WorldModel::default();
        let low = gap("visibility", Severity::Low, 0, 1.0);
        let high = gap("visibility", Severity::Low, 5, 1.0);
        assert!(calculate_problem_score(&high, &wm, None) > calculate_problem_score(&low, &wm, None));
    }

    #[test]
    fn filter_sorts_descending_and_drops_below_threshold() {
        let wm = WorldModel::default();
        let gaps = vec![
            gap("visibility", Severity::Low, 0, 1.0),
            gap("missed_deadline", Severity::High, 5, 1.0),
        ];
        let filtered = filter_gaps_by_score(gaps, &wm, 0.5, None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].kind, "missed_deadline");
    }
}
