//! sia-core: the Self-Initiating Agent engine — World Model, the ten-stage
//! Problem pipeline, and the Policy/Security/Observability cross-cutting
//! concerns (spec.md §9).
//!
//! Flat module tree re-exported from this thin root, following
//! `crates/pagi-core/src/lib.rs`'s layout.

pub mod baseline;
pub mod config;
pub mod conflict;
pub mod crosscutting;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod problem;
pub mod runtime;
pub mod scoring;
pub mod state_machine;
pub mod types;
pub mod world_model;

pub use baseline::{calculate_baseline, Baseline};
pub use config::SiaConfig;
pub use conflict::{ConflictKind, ConflictManager, LockOutcome};
pub use domain::{Domain, RiskLevel, Severity};
pub use error::{Result, SiaError};
pub use pipeline::execution::{ExecutionServices, IdempotencyStore, RateLimiter};
pub use ports::{ExecutionResult, LlmPort, NoLlm, Presenter, Source, SourceQueryResult, StepOutcome, TracingPresenter};
pub use problem::Problem;
pub use runtime::Runtime;
pub use scoring::calculate_problem_score;
pub use state_machine::ProblemStatus;
pub use types::{AgentConfig, Expectation, Gap, Proposal, Solution};
pub use world_model::{WorldModel, WorldModelStore};
