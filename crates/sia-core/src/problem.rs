//! The Problem entity — a Gap promoted through Interpretation, carrying
//! state (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Domain, Severity};
use crate::state_machine::{ProblemStatus, Transition};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub gap_id: String,
    pub domain: Domain,
    pub name: String,
    pub description: String,
    pub cause: String,
    pub impact: String,
    pub severity: Severity,
    pub affected_items: Vec<String>,
    pub status: ProblemStatus,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub proposed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snoozed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snooze_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transition_history: Vec<Transition>,
    pub problem_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    /// Builds a freshly interpreted Problem in the `Candidate` state
    /// (Interpretation's output, spec.md §4.8).
    #[allow(clippy::too_many_arguments)]
    pub fn new_candidate(
        id: String,
        gap_id: String,
        domain: Domain,
        name: String,
        description: String,
        cause: String,
        impact: String,
        severity: Severity,
        affected_items: Vec<String>,
        problem_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            gap_id,
            domain,
            name,
            description,
            cause,
            impact,
            severity,
            affected_items,
            status: ProblemStatus::Candidate,
            detected_at: now,
            proposed_at: None,
            confirmed_at: None,
            rejected_at: None,
            snoozed_at: None,
            snooze_until: None,
            archived_at: None,
            transition_history: Vec::new(),
            problem_score,
            updated_at: now,
        }
    }
}
