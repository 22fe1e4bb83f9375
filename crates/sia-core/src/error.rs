//! Engine-wide error type. One enum, each stage signs its own subset.

use thiserror::Error;

/// Error surface for every `sia-core` operation (spec §7).
#[derive(Debug, Error)]
pub enum SiaError {
    #[error("world model store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("llm capability unavailable: {0}")]
    LlmUnavailable(String),

    #[error("failed to parse llm output: {0}")]
    ParseError(String),

    #[error("policy denied action `{action}`: {reason}")]
    PolicyDenied { action: String, reason: String },

    #[error("action `{action}` requires approval: {reason}")]
    RequiresApproval { action: String, reason: String },

    #[error("rate limited on resource `{resource}`, retry after {retry_after_secs}s")]
    RateLimited {
        resource: String,
        retry_after_secs: u64,
    },

    #[error("conflict on resource `{resource}`, held by `{holder}`")]
    Conflict { resource: String, holder: String },

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("domain could not be resolved")]
    MissingDomain,

    #[error("transient tool failure for `{tool}`: {reason}")]
    TransientToolFailure { tool: String, reason: String },

    #[error("action already processed, skipped: {0}")]
    IdempotencySkip(String),
}

pub type Result<T> = std::result::Result<T, SiaError>;
