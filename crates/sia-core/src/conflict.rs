//! Conflict Manager (spec.md §4.15).
//!
//! Grounded verbatim on
//! `examples/original_source/utils/agent_conflict_manager.py`: an in-process
//! lock table keyed by resource, priority-based preemption, and
//! incumbent-wins on a tie.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ResourceLock,
    LabelConflict,
    ActionConflict,
}

#[derive(Debug, Clone)]
struct LockEntry {
    agent_id: String,
    action: String,
    priority: u8,
    label: Option<String>,
    acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired,
    Preempted { evicted_agent: String },
    Denied { holder: String },
}

/// Per-resource lock table shared by every concurrently executing agent.
#[derive(Default)]
pub struct ConflictManager {
    active_locks: DashMap<String, LockEntry>,
}

impl ConflictManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports a conflict without mutating any lock state.
    pub fn check_conflict(
        &self,
        resource_id: &str,
        agent_id: &str,
        label: Option<&str>,
    ) -> Option<ConflictKind> {
        let entry = self.active_locks.get(resource_id)?;
        if entry.agent_id == agent_id {
            return None;
        }
        match (entry.label.as_deref(), label) {
            (Some(held), Some(requested)) if held != requested => Some(ConflictKind::LabelConflict),
            _ => Some(ConflictKind::ResourceLock),
        }
    }

    /// Attempts to acquire `resource_id` for `agent_id`. Succeeds outright if
    /// free or already held by the caller; preempts a lower-priority
    /// incumbent; otherwise denied. Ties favor the incumbent.
    pub fn acquire_lock(
        &self,
        resource_id: &str,
        agent_id: &str,
        action: &str,
        priority: u8,
        label: Option<String>,
    ) -> LockOutcome {
        match self.active_locks.entry(resource_id.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry {
                    agent_id: agent_id.to_string(),
                    action: action.to_string(),
                    priority,
                    label,
                    acquired_at: Utc::now(),
                });
                LockOutcome::Acquired
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().agent_id == agent_id {
                    return LockOutcome::Acquired;
                }
                if priority > occupied.get().priority {
                    let evicted_agent = occupied.get().agent_id.clone();
                    occupied.insert(LockEntry {
                        agent_id: agent_id.to_string(),
                        action: action.to_string(),
                        priority,
                        label,
                        acquired_at: Utc::now(),
                    });
                    LockOutcome::Preempted { evicted_agent }
                } else {
                    LockOutcome::Denied {
                        holder: occupied.get().agent_id.clone(),
                    }
                }
            }
        }
    }

    /// Releases `resource_id` if, and only if, `agent_id` is the current
    /// holder. Every execution path must call this on exit.
    pub fn release_lock(&self, resource_id: &str, agent_id: &str) -> bool {
        if let Entry::Occupied(occupied) = self.active_locks.entry(resource_id.to_string()) {
            if occupied.get().agent_id == agent_id {
                occupied.remove();
                return true;
            }
        }
        false
    }

    pub fn current_holder(&self, resource_id: &str) -> Option<String> {
        self.active_locks.get(resource_id).map(|e| e.agent_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_resource_is_acquired_outright() {
        let mgr = ConflictManager::new();
        let outcome = mgr.acquire_lock("email_42", "agent_a", "label", 5, None);
        assert_eq!(outcome, LockOutcome::Acquired);
        assert_eq!(mgr.current_holder("email_42").as_deref(), Some("agent_a"));
    }

    #[test]
    fn higher_priority_preempts_incumbent() {
        let mgr = ConflictManager::new();
        mgr.acquire_lock("email_42", "agent_a", "label", 5, Some("work".into()));
        let outcome = mgr.acquire_lock("email_42", "agent_b", "label", 9, Some("urgent".into()));
        assert_eq!(
            outcome,
            LockOutcome::Preempted {
                evicted_agent: "agent_a".into()
            }
        );
        assert_eq!(mgr.current_holder("email_42").as_deref(), Some("agent_b"));
    }

    #[test]
    fn equal_priority_incumbent_wins() {
        let mgr = ConflictManager::new();
        mgr.acquire_lock("email_42", "agent_a", "label", 7, None);
        let outcome = mgr.acquire_lock("email_42", "agent_b", "label", 7, None);
        assert_eq!(outcome, LockOutcome::Denied { holder: "agent_a".into() });
    }

    #[test]
    fn release_only_succeeds_for_the_holder() {
        let mgr = ConflictManager::new();
        mgr.acquire_lock("email_42", "agent_a", "label", 5, None);
        assert!(!mgr.release_lock("email_42", "agent_b"));
        assert!(mgr.release_lock("email_42", "agent_a"));
        assert!(mgr.current_holder("email_42").is_none());
    }

    #[test]
    fn different_labels_on_same_resource_are_a_label_conflict() {
        let mgr = ConflictManager::new();
        mgr.acquire_lock("email_42", "agent_a", "label", 5, Some("work".into()));
        let conflict = mgr.check_conflict("email_42", "agent_b", Some("urgent"));
        assert_eq!(conflict, Some(ConflictKind::LabelConflict));
    }
}
