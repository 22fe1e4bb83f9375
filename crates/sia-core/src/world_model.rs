//! World Model Store (spec.md §4.1).
//!
//! A single persistent JSON document keyed by named sections, grounded on
//! the onboarding shape in `examples/original_source/layers/onboarding.py`.
//! Persistence is whole-document write-through; `WorldModelStore` serializes
//! writers behind a `Mutex`, following the teacher's shared-state idiom in
//! `crates/pagi-core/src/memory.rs` (adapted from a sled KV store to one
//! JSON document, since spec.md §6 calls for a single `world_model.json`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::{Result, SiaError};
use crate::problem::Problem;
use crate::types::{AgentConfig, IdealState, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
}

fn default_priority() -> Priority {
    Priority::Medium
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// "minimal" | "normal" | "frequent".
    #[serde(default = "default_notification_frequency")]
    pub notification_frequency: String,
    /// "low" | "medium" | "high".
    #[serde(default = "default_automation_acceptance")]
    pub automation_acceptance: String,
}

fn default_notification_frequency() -> String {
    "normal".to_string()
}

fn default_automation_acceptance() -> String {
    "medium".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notification_frequency: default_notification_frequency(),
            automation_acceptance: default_automation_acceptance(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectedSource {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub behavior: String,
    pub domain: Domain,
    pub learned_at: DateTime<Utc>,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub user_satisfaction: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Safety {
    #[serde(default)]
    pub policy: serde_json::Value,
    #[serde(default)]
    pub data_governance: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldModel {
    #[serde(default)]
    pub user: serde_json::Value,
    #[serde(default)]
    pub abstract_goals: Vec<Goal>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub connected_sources: HashMap<String, ConnectedSource>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub ideal_states: Vec<IdealState>,
    #[serde(default)]
    pub problem_candidates: Vec<Problem>,
    #[serde(default)]
    pub confirmed_problems: Vec<Problem>,
    #[serde(default)]
    pub active_agents: Vec<AgentConfig>,
    #[serde(default)]
    pub safety: Safety,
    /// Per-domain rolling records consumed by the Baseline Calculator.
    #[serde(default)]
    pub history: HashMap<String, Vec<serde_json::Value>>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Any top-level key not named above round-trips through `mutate`
    /// untouched instead of being silently dropped, so a document written
    /// by a newer version of this document shape survives an older
    /// binary's load/persist cycle.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorldModel {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether any confirmed problem in `domain` currently exists —
    /// feeds the Problem Scorer's context-importance signal.
    pub fn has_confirmed_problem_in_domain(&self, domain: Domain) -> bool {
        self.confirmed_problems.iter().any(|p| p.domain == domain)
    }
}

/// Loads and persists a single `world_model.json` document. Readers may run
/// concurrently; `persist` is whole-document write-through under a mutex so
/// only one writer is active at a time (spec.md §4.1, §5).
pub struct WorldModelStore {
    path: PathBuf,
    state: Mutex<WorldModel>,
}

impl WorldModelStore {
    /// Loads from `path`. A missing file is not an error here — callers that
    /// want strict `StoreUnavailable` semantics should use `load_strict`;
    /// most callers (onboarding, tests) want a default-initialized document.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| SiaError::StoreUnavailable(format!("malformed world model: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WorldModel::default(),
            Err(e) => return Err(SiaError::StoreUnavailable(e.to_string())),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Loads from `path`, failing with `StoreUnavailable` if the file is
    /// missing or malformed (spec.md §4.1's strict variant).
    pub fn load_strict(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| SiaError::StoreUnavailable(e.to_string()))?;
        let state: WorldModel = serde_json::from_str(&contents)
            .map_err(|e| SiaError::StoreUnavailable(format!("malformed world model: {e}")))?;
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Runs `f` against a snapshot clone of the current document.
    pub fn with_snapshot<T>(&self, f: impl FnOnce(&WorldModel) -> T) -> T {
        let guard = self.state.lock().expect("world model lock poisoned");
        f(&guard)
    }

    /// Runs `f` against the live document, then persists it whole.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut WorldModel) -> T) -> Result<T> {
        let mut guard = self.state.lock().expect("world model lock poisoned");
        let result = f(&mut guard);
        guard.touch();
        self.write_through(&guard)?;
        Ok(result)
    }

    fn write_through(&self, model: &WorldModel) -> Result<()> {
        let pretty = serde_json::to_string_pretty(model)
            .map_err(|e| SiaError::StoreUnavailable(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiaError::StoreUnavailable(e.to_string()))?;
        }
        std::fs::write(&self.path, pretty).map_err(|e| SiaError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_default_initializes() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorldModelStore::open(dir.path().join("world_model.json")).unwrap();
        store.with_snapshot(|wm| {
            assert!(wm.abstract_goals.is_empty());
            assert_eq!(wm.preferences.notification_frequency, "normal");
        });
    }

    #[test]
    fn missing_file_is_store_unavailable_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorldModelStore::load_strict(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SiaError::StoreUnavailable(_)));
    }

    #[test]
    fn mutate_persists_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_model.json");
        let store = WorldModelStore::open(&path).unwrap();
        store
            .mutate(|wm| {
                wm.abstract_goals.push(Goal {
                    description: "inbox zero".into(),
                    priority: Priority::High,
                });
            })
            .unwrap();

        let reopened = WorldModelStore::open(&path).unwrap();
        reopened.with_snapshot(|wm| {
            assert_eq!(wm.abstract_goals.len(), 1);
            assert_eq!(wm.abstract_goals[0].description, "inbox zero");
        });
    }

    #[test]
    fn unknown_top_level_key_survives_a_mutate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world_model.json");
        std::fs::write(&path, serde_json::json!({"future_section": {"foo": "bar"}}).to_string()).unwrap();

        let store = WorldModelStore::open(&path).unwrap();
        store.with_snapshot(|wm| assert_eq!(wm.extra.get("future_section").unwrap(), &serde_json::json!({"foo": "bar"})));

        store.mutate(|wm| wm.abstract_goals.push(Goal { description: "noop".into(), priority: Priority::Low })).unwrap();

        let reopened = WorldModelStore::open(&path).unwrap();
        reopened.with_snapshot(|wm| {
            assert_eq!(wm.extra.get("future_section").unwrap(), &serde_json::json!({"foo": "bar"}));
        });
    }
}
