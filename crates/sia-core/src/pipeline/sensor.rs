//! Sensor (spec.md §4.5).
//!
//! Grounded on `examples/original_source/layers/sensor.py`'s per-domain
//! loaders, generalized from file-backed sample loaders to the `Source`
//! port (spec.md §1 explicitly drops file-backed sample loading).

use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::Domain;
use crate::error::Result;
use crate::ports::Source;
use crate::types::CurrentState;

/// Collects one `CurrentState` for `domains`. A single domain is returned
/// as-is; more than one is merged under `domain = "multi"` with a `domains`
/// list and `data` keyed per domain. `preloaded`, when given, is used
/// verbatim instead of calling `source` (keyed by domain for multi-domain
/// calls, bare otherwise) — this is how tests and fixtures drive the
/// pipeline without a live Source.
pub async fn sense(domains: &[Domain], source: &dyn Source, preloaded: Option<Value>) -> Result<CurrentState> {
    if domains.len() == 1 {
        let domain = domains[0];
        let data = match &preloaded {
            Some(v) => v.clone(),
            None => source.query(scope_for(domain), None).await?.data,
        };
        return Ok(CurrentState {
            domain,
            domains: None,
            timestamp: Utc::now(),
            data,
            metadata: json!({}),
        });
    }

    let mut merged = serde_json::Map::new();
    for &domain in domains {
        let data = match preloaded.as_ref().and_then(|v| v.get(domain.as_str())) {
            Some(v) => v.clone(),
            None => source.query(scope_for(domain), None).await?.data,
        };
        merged.insert(domain.as_str().to_string(), data);
    }

    Ok(CurrentState {
        domain: Domain::Multi,
        domains: Some(domains.to_vec()),
        timestamp: Utc::now(),
        data: Value::Object(merged),
        metadata: json!({}),
    })
}

fn scope_for(domain: Domain) -> &'static str {
    match domain {
        Domain::Email => "metadata_and_subject",
        Domain::Github => "pr_metadata",
        Domain::Health => "sleep_metrics",
        Domain::Finance => "transaction_metadata",
        Domain::Multi => "metadata_and_subject",
    }
}
