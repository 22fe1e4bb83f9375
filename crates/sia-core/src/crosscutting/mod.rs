//! Cross-cutting concerns (spec.md §4.14-§4.17): Policy & Consent, Security,
//! and Observability & Audit. Injected into pipeline stages rather than used
//! as global singletons (spec.md §9 design note).

pub mod observability;
pub mod policy;
pub mod security;
