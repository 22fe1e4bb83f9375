//! In-memory fixture `Source`, standing in for a live Gmail/GitHub/
//! HealthKit/finance API (spec.md §6: "no built-in implementation talks to
//! a real external system"). Exists so this binary has something to tick
//! against without any credentials.

use async_trait::async_trait;
use serde_json::Value;
use sia_core::{Domain, Result, Source, SourceQueryResult};

pub struct FixtureSource;

impl FixtureSource {
    pub fn new() -> Self {
        Self
    }

    fn data_for(scope: &str) -> Value {
        match scope {
            "metadata_and_subject" => serde_json::json!({"emails": []}),
            "pr_metadata" => serde_json::json!({"prs": []}),
            "sleep_metrics" => serde_json::json!({"records": [], "average_sleep_hours": 7.5}),
            "transaction_metadata" => serde_json::json!({"transactions": [], "category_spending": {}}),
            _ => serde_json::json!({}),
        }
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for FixtureSource {
    async fn query(&self, scope: &str, _filters: Option<Value>) -> Result<SourceQueryResult> {
        Ok(SourceQueryResult {
            domain: Domain::Multi,
            data: Self::data_for(scope),
        })
    }

    async fn write(&self, action: &str, resource_id: &str, data: Value) -> Result<()> {
        tracing::info!(action, resource_id, %data, "fixture source write (no-op)");
        Ok(())
    }
}
