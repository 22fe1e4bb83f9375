//! Learning (spec.md §4.13).
//!
//! Grounded verbatim on `examples/original_source/layers/learning.py`'s
//! `analyze_results`/`update_world_model`: a success-rate/satisfaction
//! threshold gate that appends a learned Pattern, and an unconditional
//! `updated_at` bump + persist regardless of whether a pattern was learned.

use chrono::Utc;

use crate::domain::Domain;
use crate::ports::ExecutionResult;
use crate::world_model::{Pattern, WorldModel, WorldModelStore};

const SUCCESS_RATE_THRESHOLD: f64 = 0.8;
const SATISFACTION_THRESHOLD: f64 = 0.7;

/// Analysis folded out of an ExecutionResult plus optional user feedback
/// (spec.md §4.13). `user_satisfaction` defaults to 0.5 absent feedback,
/// matching the original's neutral default.
#[derive(Debug, Clone, Copy)]
pub struct ResultAnalysis {
    pub success_rate: f64,
    pub user_satisfaction: f64,
}

pub fn analyze_results(execution_result: &ExecutionResult, user_satisfaction: Option<f64>) -> ResultAnalysis {
    ResultAnalysis {
        success_rate: execution_result.success_rate(),
        user_satisfaction: user_satisfaction.unwrap_or(0.5),
    }
}

fn behavior_description(domain: Domain) -> String {
    match domain {
        Domain::Email => "automatic email classification system in use".to_string(),
        Domain::Github => "automatic PR review notification system in use".to_string(),
        Domain::Health => "health data analysis system in use".to_string(),
        Domain::Finance => "spending pattern analysis system in use".to_string(),
        Domain::Multi => "multi-domain agent in use".to_string(),
    }
}

/// Appends a learned Pattern to `world_model` when both thresholds are met
/// (spec.md §4.13: success_rate > 0.8 and user_satisfaction > 0.7), then
/// always bumps `updated_at`. Returns whether a pattern was learned.
pub fn apply_learning(world_model: &mut WorldModel, domain: Domain, analysis: ResultAnalysis) -> bool {
    let learned = analysis.success_rate > SUCCESS_RATE_THRESHOLD && analysis.user_satisfaction > SATISFACTION_THRESHOLD;
    if learned {
        let pattern = Pattern {
            id: format!("pattern_{}", world_model.patterns.len() + 1),
            kind: "learned".to_string(),
            behavior: behavior_description(domain),
            domain,
            learned_at: Utc::now(),
            success_rate: analysis.success_rate,
            user_satisfaction: analysis.user_satisfaction,
        };
        world_model.patterns.push(pattern);
    }
    world_model.touch();
    learned
}

/// Runs `analyze_results` + `apply_learning` against the live store and
/// persists the result, the end-to-end entry point for this stage
/// (spec.md §4.13).
pub fn learn_from_execution(
    store: &WorldModelStore,
    domain: Domain,
    execution_result: &ExecutionResult,
    user_satisfaction: Option<f64>,
) -> crate::error::Result<bool> {
    let analysis = analyze_results(execution_result, user_satisfaction);
    store.mutate(|wm| apply_learning(wm, domain, analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StepOutcome;

    fn result(successful: usize, failed: usize) -> ExecutionResult {
        let mut outcomes = Vec::new();
        outcomes.extend((0..successful).map(|_| StepOutcome::Successful { retries: 0 }));
        outcomes.extend((0..failed).map(|_| StepOutcome::Failed { reason: "x".into(), retries: 0 }));
        ExecutionResult::from_steps("agent_1", outcomes, serde_json::json!({}))
    }

    #[test]
    fn high_success_and_satisfaction_learns_a_pattern() {
        let mut wm = WorldModel::default();
        let analysis = analyze_results(&result(9, 1), Some(0.9));
        let learned = apply_learning(&mut wm, Domain::Email, analysis);
        assert!(learned);
        assert_eq!(wm.patterns.len(), 1);
        assert_eq!(wm.patterns[0].domain, Domain::Email);
    }

    #[test]
    fn low_satisfaction_does_not_learn_but_still_touches() {
        let mut wm = WorldModel::default();
        let before = wm.updated_at;
        let analysis = analyze_results(&result(9, 1), Some(0.3));
        let learned = apply_learning(&mut wm, Domain::Email, analysis);
        assert!(!learned);
        assert!(wm.patterns.is_empty());
        assert!(wm.updated_at >= before);
    }

    #[test]
    fn missing_feedback_defaults_to_neutral_satisfaction() {
        let analysis = analyze_results(&result(10, 0), None);
        assert!((analysis.user_satisfaction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn learn_from_execution_persists_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldModelStore::open(dir.path().join("world_model.json")).unwrap();
        let learned = learn_from_execution(&store, Domain::Github, &result(10, 0), Some(0.8)).unwrap();
        assert!(learned);
        store.with_snapshot(|wm| assert_eq!(wm.patterns.len(), 1));
    }
}
