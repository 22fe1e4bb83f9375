//! `Runtime` — the dependency-injected façade bundling every shared
//! service the pipeline stages need (spec.md §9's Design Note: replace the
//! original's module-level Python globals with owned, injectable state).
//!
//! Grounded on `crates/pagi-core/src/orchestrator/mod.rs`'s
//! `Arc<RwLock<_>>`-based shared-service idiom, adapted to this crate's
//! mix of `Mutex`-guarded (`WorldModelStore`) and lock-free (`DashMap`-backed)
//! shared state.

use crate::config::SiaConfig;
use crate::conflict::ConflictManager;
use crate::crosscutting::observability::AuditLogger;
use crate::domain::Domain;
use crate::error::Result;
use crate::pipeline::execution::{ExecutionServices, IdempotencyStore, RateLimiter};
use crate::pipeline::{comparison, composition, execution, expectation, exploration, interpretation, learning, proposal, sensor};
use crate::ports::{ExecutionResult, LlmPort, Source};
use crate::types::{AgentConfig, Proposal};
use crate::world_model::WorldModelStore;

/// Everything one running agent needs, constructed once at startup and
/// shared across every pipeline invocation.
pub struct Runtime {
    pub config: SiaConfig,
    pub world_model: WorldModelStore,
    pub conflict_manager: ConflictManager,
    pub rate_limiter: RateLimiter,
    pub idempotency: IdempotencyStore,
    pub audit_log: AuditLogger,
}

impl Runtime {
    pub fn new(config: SiaConfig) -> Result<Self> {
        let world_model = WorldModelStore::open(&config.world_model_path)?;
        let audit_log = AuditLogger::new(&config.log_dir)?;
        let idempotency = IdempotencyStore::new(config.processed_event_cap);
        Ok(Self {
            conflict_manager: ConflictManager::new(),
            rate_limiter: RateLimiter::new(),
            idempotency,
            world_model,
            audit_log,
            config,
        })
    }

    /// Runs Sensor through Proposal for one domain, returning a Proposal
    /// per surviving Gap (spec.md §4.5-§4.10). Stops short of Composition:
    /// a Proposal always awaits a user decision first. A snapshot clone of
    /// the World Model is taken once up front and threaded through every
    /// stage, rather than holding the store's mutex across `.await` points.
    pub async fn run_detection_cycle(&self, domain: Domain, source: &dyn Source, llm: Option<&dyn LlmPort>) -> Result<Vec<Proposal>> {
        let state = sensor::sense(&[domain], source, None).await?;
        let world_model = self.world_model.with_snapshot(|wm| wm.clone());

        let _expectation = expectation::derive_expectation(domain, &world_model, llm).await;
        let gaps = comparison::compare(&state, &world_model, self.config.problem_score_threshold, self.config.baseline_window_weeks, llm).await;
        let problems = interpretation::interpret_gaps(&gaps, llm).await;

        let mut proposals = Vec::with_capacity(problems.len());
        for problem in problems {
            let solutions = exploration::explore_solutions(&problem, llm).await;
            match proposal::create_proposal(problem, solutions) {
                Ok(p) => {
                    let alternatives = p.alternative_solutions.iter().map(|s| s.name.clone()).collect();
                    self.audit_log.log_proposal(
                        &p.problem.id,
                        serde_json::json!({"gap_id": p.problem.gap_id, "severity": p.problem.severity}),
                        &p.recommended_solution.name,
                        alternatives,
                        "pending",
                    )?;
                    proposals.push(p);
                }
                Err(e) => {
                    self.audit_log.log_error("proposal", &e.to_string(), serde_json::json!({}))?;
                }
            }
        }
        Ok(proposals)
    }

    /// Applies the user's decision to an approved Proposal and, on approval,
    /// composes an `AgentConfig` ready for execution (spec.md §4.10-§4.11).
    pub fn approve_and_compose(&self, mut proposal: Proposal, created_on: &str) -> Result<AgentConfig> {
        proposal::apply_user_decision(&mut proposal, "approve", None, self.config.snooze_days)?;
        let agent_config = self
            .world_model
            .with_snapshot(|wm| composition::compose_agent(&proposal.recommended_solution, Some(&proposal.problem), wm, created_on))?;
        self.world_model.mutate(|wm| wm.active_agents.push(agent_config.clone()))?;
        self.audit_log.log_decision("approve", serde_json::json!({"problem_id": proposal.problem.id}), None)?;
        Ok(agent_config)
    }

    /// Runs Execution then Learning for a composed agent, logging both
    /// along the way (spec.md §4.12-§4.13, §4.17).
    pub async fn run_agent(&self, agent_config: &AgentConfig, source: &dyn Source, user_satisfaction: Option<f64>) -> Result<ExecutionResult> {
        let services = ExecutionServices {
            conflict_manager: &self.conflict_manager,
            rate_limiter: &self.rate_limiter,
            idempotency: &self.idempotency,
            source,
        };
        let result = execution::execute_agent(agent_config, &services).await;
        let outcome_metrics = serde_json::json!({
            "successful": result.successful_count,
            "failed": result.failed_count,
            "retried": result.retried_count,
            "skipped": result.skipped_count,
        });
        self.audit_log.log_execution(&agent_config.id, None, vec![], vec![], outcome_metrics)?;
        learning::learn_from_execution(&self.world_model, agent_config.domain, &result, user_satisfaction)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiaError;
    use crate::ports::SourceQueryResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EmptySource;

    #[async_trait]
    impl Source for EmptySource {
        async fn query(&self, _scope: &str, _filters: Option<Value>) -> Result<SourceQueryResult> {
            Ok(SourceQueryResult {
                domain: Domain::Email,
                data: serde_json::json!({"emails": []}),
            })
        }

        async fn write(&self, _action: &str, _resource_id: &str, _data: Value) -> Result<()> {
            Err(SiaError::TransientToolFailure { tool: "fixture".into(), reason: "no-op source".into() })
        }
    }

    fn test_config(dir: &std::path::Path) -> SiaConfig {
        let mut config = SiaConfig::default();
        config.world_model_path = dir.join("world_model.json").to_string_lossy().to_string();
        config.log_dir = dir.join("logs").to_string_lossy().to_string();
        config.problem_score_threshold = 0.0;
        config
    }

    #[tokio::test]
    async fn detection_cycle_with_no_gaps_yields_no_proposals() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Runtime::new(test_config(dir.path())).unwrap();
        let source = EmptySource;
        let proposals = runtime.run_detection_cycle(Domain::Email, &source, None).await.unwrap();
        assert!(proposals.is_empty());
    }
}
