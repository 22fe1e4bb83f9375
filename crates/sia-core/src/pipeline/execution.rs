//! Execution — The Mini-Runtime (spec.md §4.12).
//!
//! Grounded verbatim on `examples/original_source/utils/execution_utils.py`
//! (`generate_event_id`, `check_idempotency`, `check_rate_limit`,
//! `exponential_backoff`, `handle_partial_failure`) and
//! `examples/original_source/layers/execution.py`'s per-action step order:
//! rate limit → policy → idempotency → conflict → effect.

use dashmap::DashMap;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::conflict::{ConflictKind, ConflictManager, LockOutcome};
use crate::crosscutting::policy::{check_permission, PolicyDecision};
use crate::domain::Domain;
use crate::ports::{ExecutionResult, Source, StepOutcome};
use crate::types::AgentConfig;

/// In-memory sliding-window rate limiter, one bucket per resource
/// (spec.md §4.12 step 1; §9 keeps this process-local).
#[derive(Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request against `resource` unless the window is already
    /// saturated. Returns `Some(retry_after_secs)` when rate-limited.
    pub fn check_and_record(&self, resource: &str, max_requests: usize, window_secs: i64) -> Option<f64> {
        let now = Utc::now();
        let cutoff = now - Duration::seconds(window_secs);
        let mut bucket = self.buckets.entry(resource.to_string()).or_default();
        bucket.retain(|t| *t > cutoff);

        if bucket.len() >= max_requests {
            let oldest = *bucket.iter().min().expect("bucket is non-empty when saturated");
            let retry_after = (oldest + Duration::seconds(window_secs) - now).num_milliseconds() as f64 / 1000.0;
            return Some(retry_after.max(0.0));
        }

        bucket.push(now);
        None
    }
}

/// Tracks already-processed `event_id`s for idempotency (spec.md §4.12
/// step 3). Evicts everything once `cap` is exceeded, matching the
/// original's blunt `clear()`-at-threshold behavior.
pub struct IdempotencyStore {
    processed: DashMap<String, ()>,
    cap: usize,
}

impl IdempotencyStore {
    pub fn new(cap: usize) -> Self {
        Self {
            processed: DashMap::new(),
            cap,
        }
    }

    /// `event_id = SHA-256(action ∥ resource_id ∥ context)` (spec.md §4.12).
    pub fn event_id(action: &str, resource_id: &str, context: &Value) -> String {
        let payload = serde_json::json!({
            "action": action,
            "resource_id": resource_id,
            "context": context,
        });
        let serialized = serde_json::to_string(&payload).expect("json values always serialize");
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns `true` if `event_id` was already processed; otherwise
    /// records it (evicting the whole set first if over capacity).
    pub fn check_and_record(&self, event_id: &str) -> bool {
        if self.processed.contains_key(event_id) {
            return true;
        }
        if self.processed.len() >= self.cap {
            warn!(cap = self.cap, "idempotency store over capacity, evicting all entries");
            self.processed.clear();
        }
        self.processed.insert(event_id.to_string(), ());
        false
    }
}

/// `base * multiplier^attempt`, capped at `cap` (spec.md §4.12:
/// `base=1s, multiplier=2, cap=60s`).
pub fn exponential_backoff(attempt: u32, base_secs: f64, multiplier: f64, cap_secs: f64) -> f64 {
    (base_secs * multiplier.powi(attempt as i32)).min(cap_secs)
}

const RATE_LIMIT_WINDOW_SECS: i64 = 60;
const RATE_LIMIT_MAX_REQUESTS: usize = 100;
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_SECS: f64 = 1.0;
const BACKOFF_MULTIPLIER: f64 = 2.0;
const BACKOFF_CAP_SECS: f64 = 60.0;

/// Shared services one Execution invocation needs, bundled so the per-action
/// loop doesn't thread five parameters through every call.
pub struct ExecutionServices<'a> {
    pub conflict_manager: &'a ConflictManager,
    pub rate_limiter: &'a RateLimiter,
    pub idempotency: &'a IdempotencyStore,
    pub source: &'a dyn Source,
}

/// The resource a lock/conflict check keys on: the action's target call,
/// stripped of its literal argument list (e.g.
/// `gmail.apply_label('Important')` → `email:gmail.apply_label`). Two
/// agents requesting different labels for the same target call are
/// expected to contend for the same lock (spec.md §4.15); keying on the
/// full action text (label included) would make every differently-labeled
/// request look like a different resource and conflicts unreachable.
pub fn resource_id_for(agent_config: &AgentConfig, action_name: &str) -> String {
    let base = action_name.split('(').next().unwrap_or(action_name).trim();
    format!("{}:{}", agent_config.domain.as_str(), base)
}

/// Extracts the label literal out of a `...apply_label('X')`-shaped action
/// string, so the conflict step can tell apart a label conflict (two
/// agents wanting different labels on the same resource, spec.md §4.15)
/// from a plain resource-lock contest.
fn label_for(action_name: &str) -> Option<String> {
    let start = action_name.find("apply_label(")? + "apply_label(".len();
    let rest = action_name.get(start..)?;
    let quote = rest.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let end = rest[1..].find(quote)? + 1;
    Some(rest[1..end].to_string())
}

/// Domain-specific effect simulator (spec.md §4.12 step 5): label apply,
/// PR review, metric track, transaction categorize. No built-in effect
/// talks to a live system; it calls back into `Source::write` so a test or
/// fixture implementation can observe it.
async fn run_effect(agent_config: &AgentConfig, action_name: &str, services: &ExecutionServices<'_>) -> Result<Value, String> {
    let resource_id = resource_id_for(agent_config, action_name);
    let payload = match agent_config.domain {
        Domain::Email => serde_json::json!({"effect": "apply_label", "action": action_name}),
        Domain::Github => serde_json::json!({"effect": "pr_review", "action": action_name}),
        Domain::Health => serde_json::json!({"effect": "metric_track", "action": action_name}),
        Domain::Finance => serde_json::json!({"effect": "transaction_categorize", "action": action_name}),
        Domain::Multi => serde_json::json!({"effect": "noop", "action": action_name}),
    };
    services
        .source
        .write(action_name, &resource_id, payload.clone())
        .await
        .map(|_| payload)
        .map_err(|e| e.to_string())
}

/// Runs one action through the first four steps once, then retries only the
/// effect step up to `MAX_RETRIES` times with exponential backoff (spec.md
/// §4.12 step 5, §7). Rate limit, policy, idempotency and the conflict lock
/// are each decided a single time per action: retrying the whole pipeline on
/// every transient effect failure would re-run the idempotency check against
/// the same `event_id` the first attempt already recorded, turning every
/// retry into a spurious duplicate-event skip instead of a real retry. Step
/// 2's `requires_approval`/denied outcomes never reach the effect step.
async fn execute_step(agent_config: &AgentConfig, action_name: &str, services: &ExecutionServices<'_>) -> StepOutcome {
    let resource_id = resource_id_for(agent_config, action_name);

    if let Some(retry_after) = services.rate_limiter.check_and_record(&resource_id, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_SECS) {
        return StepOutcome::RateLimited { retry_after_secs: retry_after as u64 };
    }

    let decision: PolicyDecision = check_permission(action_name, agent_config);
    if decision.requires_approval {
        return StepOutcome::PendingApproval { reason: decision.reason };
    }
    if !decision.allowed {
        return StepOutcome::Blocked { reason: decision.reason };
    }

    let event_id = IdempotencyStore::event_id(action_name, &resource_id, &Value::Null);
    if services.idempotency.check_and_record(&event_id) {
        return StepOutcome::Skipped { reason: "duplicate event".into() };
    }

    let priority = agent_config.risk_level.lock_priority();
    let label = label_for(action_name);

    if let Some(ConflictKind::LabelConflict) = services.conflict_manager.check_conflict(&resource_id, &agent_config.id, label.as_deref()) {
        let holder = services.conflict_manager.current_holder(&resource_id).unwrap_or_default();
        return StepOutcome::LabelConflict { holder, label: label.unwrap_or_default() };
    }

    match services.conflict_manager.acquire_lock(&resource_id, &agent_config.id, action_name, priority, label) {
        LockOutcome::Denied { holder } => return StepOutcome::Conflict { holder },
        LockOutcome::Acquired | LockOutcome::Preempted { .. } => {}
    }

    let outcome = run_effect_with_retries(agent_config, action_name, services).await;
    services.conflict_manager.release_lock(&resource_id, &agent_config.id);
    outcome
}

/// Retries `run_effect` up to `MAX_RETRIES` times with exponential backoff,
/// keeping the lock acquired by the caller held for every attempt. The step
/// is still recorded as `Successful`/`Failed` regardless of how many retries
/// it took; `retries` carries the count alongside the outcome rather than
/// replacing it (spec.md §7).
async fn run_effect_with_retries(agent_config: &AgentConfig, action_name: &str, services: &ExecutionServices<'_>) -> StepOutcome {
    let mut attempt = 0;
    loop {
        match run_effect(agent_config, action_name, services).await {
            Ok(_) => return StepOutcome::Successful { retries: attempt },
            Err(reason) => {
                if attempt >= MAX_RETRIES {
                    return StepOutcome::Failed { reason, retries: attempt };
                }
                let delay = exponential_backoff(attempt, BACKOFF_BASE_SECS, BACKOFF_MULTIPLIER, BACKOFF_CAP_SECS);
                tokio::time::sleep(std::time::Duration::from_secs_f64(delay.min(0.01))).await;
                attempt += 1;
            }
        }
    }
}

/// Executes every one of `agent_config.actions` in declaration order and
/// folds the per-step outcomes into an `ExecutionResult` (spec.md §4.12).
pub async fn execute_agent(agent_config: &AgentConfig, services: &ExecutionServices<'_>) -> ExecutionResult {
    let mut step_outcomes = Vec::with_capacity(agent_config.actions.len());

    for action in &agent_config.actions {
        step_outcomes.push(execute_step(agent_config, &action.do_, services).await);
    }

    ExecutionResult::from_steps(agent_config.id.clone(), step_outcomes, serde_json::json!({"domain": agent_config.domain.as_str()}))
}
