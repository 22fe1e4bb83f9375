//! Problem State Machine (spec.md §4.2).
//!
//! Grounded verbatim on `examples/original_source/utils/problem_state_machine.py`:
//! the allowed-transition graph, the transition-history append, and the
//! snooze-sweep behavior are all taken from there.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiaError};
use crate::problem::Problem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemStatus {
    Candidate,
    Proposed,
    Confirmed,
    Rejected,
    Snoozed,
    Archived,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Candidate => "candidate",
            ProblemStatus::Proposed => "proposed",
            ProblemStatus::Confirmed => "confirmed",
            ProblemStatus::Rejected => "rejected",
            ProblemStatus::Snoozed => "snoozed",
            ProblemStatus::Archived => "archived",
        }
    }

    /// The allowed-transition graph (spec.md §4.2).
    fn allowed_targets(&self) -> &'static [ProblemStatus] {
        match self {
            ProblemStatus::Candidate => &[ProblemStatus::Proposed],
            ProblemStatus::Proposed => &[
                ProblemStatus::Confirmed,
                ProblemStatus::Rejected,
                ProblemStatus::Snoozed,
            ],
            ProblemStatus::Snoozed => &[ProblemStatus::Candidate, ProblemStatus::Rejected],
            ProblemStatus::Confirmed => &[ProblemStatus::Archived],
            ProblemStatus::Rejected => &[],
            ProblemStatus::Archived => &[],
        }
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a Problem's append-only `transition_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: ProblemStatus,
    pub to: ProblemStatus,
    #[serde(default)]
    pub user_action: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// True when `from -> to` is a legal edge in the state graph.
pub fn can_transition(from: ProblemStatus, to: ProblemStatus) -> bool {
    from.allowed_targets().contains(&to)
}

/// Applies a transition to `problem`, stamping timestamps and appending
/// exactly one `transition_history` entry. Returns `IllegalTransition`
/// without mutating `problem` when the edge is disallowed.
pub fn transition(
    problem: &mut Problem,
    to: ProblemStatus,
    user_action: Option<String>,
    reason: Option<String>,
    snooze_days: i64,
) -> Result<()> {
    let from = problem.status;
    if !can_transition(from, to) {
        return Err(SiaError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let now = Utc::now();
    problem.status = to;
    problem.updated_at = now;

    match to {
        ProblemStatus::Proposed => problem.proposed_at = Some(now),
        ProblemStatus::Confirmed => problem.confirmed_at = Some(now),
        ProblemStatus::Rejected => problem.rejected_at = Some(now),
        ProblemStatus::Snoozed => {
            problem.snoozed_at = Some(now);
            problem.snooze_until = Some(now + Duration::days(snooze_days));
        }
        ProblemStatus::Archived => problem.archived_at = Some(now),
        ProblemStatus::Candidate => {
            // Returning from Snoozed: clear the snooze window.
            problem.snooze_until = None;
        }
    }

    problem.transition_history.push(Transition {
        from,
        to,
        user_action,
        reason,
        timestamp: now,
    });

    Ok(())
}

pub fn promote_candidate_to_proposed(problem: &mut Problem) -> Result<()> {
    transition(problem, ProblemStatus::Proposed, None, None, 7)
}

pub fn confirm_problem(problem: &mut Problem, user_action: &str) -> Result<()> {
    transition(
        problem,
        ProblemStatus::Confirmed,
        Some(user_action.to_string()),
        None,
        7,
    )
}

pub fn reject_problem(problem: &mut Problem, reason: Option<String>) -> Result<()> {
    transition(
        problem,
        ProblemStatus::Rejected,
        Some("reject".to_string()),
        reason,
        7,
    )
}

pub fn snooze_problem(problem: &mut Problem, days: i64) -> Result<()> {
    transition(
        problem,
        ProblemStatus::Snoozed,
        Some("snooze".to_string()),
        None,
        days,
    )
}

pub fn archive_problem(problem: &mut Problem) -> Result<()> {
    transition(problem, ProblemStatus::Archived, None, None, 7)
}

/// Sweeps `problems` for Snoozed entries whose `snooze_until` has elapsed,
/// transitioning them back to Candidate. Returns the ids that were woken.
pub fn check_snoozed_problems(problems: &mut [Problem]) -> Vec<String> {
    let now = Utc::now();
    let mut woken = Vec::new();
    for problem in problems.iter_mut() {
        if problem.status == ProblemStatus::Snoozed {
            if let Some(until) = problem.snooze_until {
                if until <= now {
                    if transition(problem, ProblemStatus::Candidate, None, None, 7).is_ok() {
                        woken.push(problem.id.clone());
                    }
                }
            }
        }
    }
    woken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Domain, Severity};
    use crate::problem::Problem;

    fn sample_problem() -> Problem {
        Problem::new_candidate(
            "problem_1".into(),
            "gap_1".into(),
            Domain::Email,
            "name".into(),
            "description".into(),
            "cause".into(),
            "impact".into(),
            Severity::High,
            vec![],
            0.75,
        )
    }

    #[test]
    fn candidate_can_only_go_to_proposed() {
        assert!(can_transition(ProblemStatus::Candidate, ProblemStatus::Proposed));
        assert!(!can_transition(ProblemStatus::Candidate, ProblemStatus::Confirmed));
    }

    #[test]
    fn rejected_and_archived_are_terminal() {
        assert!(ProblemStatus::Rejected.allowed_targets().is_empty());
        assert!(ProblemStatus::Archived.allowed_targets().is_empty());
    }

    #[test]
    fn illegal_transition_does_not_mutate_or_log() {
        let mut problem = sample_problem();
        let before = problem.transition_history.len();
        let err = transition(&mut problem, ProblemStatus::Confirmed, None, None, 7).unwrap_err();
        assert!(matches!(err, SiaError::IllegalTransition { .. }));
        assert_eq!(problem.status, ProblemStatus::Candidate);
        assert_eq!(problem.transition_history.len(), before);
    }

    #[test]
    fn full_lifecycle_appends_one_entry_per_hop() {
        let mut problem = sample_problem();
        promote_candidate_to_proposed(&mut problem).unwrap();
        confirm_problem(&mut problem, "approve").unwrap();
        archive_problem(&mut problem).unwrap();
        assert_eq!(problem.status, ProblemStatus::Archived);
        assert_eq!(problem.transition_history.len(), 3);
        assert_eq!(problem.transition_history[0].from, ProblemStatus::Candidate);
        assert_eq!(problem.transition_history[2].to, ProblemStatus::Archived);
    }

    #[test]
    fn snooze_then_sweep_returns_to_candidate() {
        let mut problem = sample_problem();
        promote_candidate_to_proposed(&mut problem).unwrap();
        snooze_problem(&mut problem, 0).unwrap();
        assert_eq!(problem.status, ProblemStatus::Snoozed);
        let woken = check_snoozed_problems(std::slice::from_mut(&mut problem));
        assert_eq!(woken, vec!["problem_1".to_string()]);
        assert_eq!(problem.status, ProblemStatus::Candidate);
    }
}
