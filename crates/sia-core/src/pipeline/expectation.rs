//! Expectation (spec.md §4.6).
//!
//! Grounded on `examples/original_source/layers/expectation.py`'s
//! per-domain default table; an LLM path enriches the description but the
//! default table is what actually drives Comparison, so it is built first
//! and never discarded.

use chrono::{Datelike, Timelike, Utc};
use serde_json::json;

use crate::domain::Domain;
use crate::ports::LlmPort;
use crate::types::{Expectation, ExpectationContext, ExpectationItem, IdealState, Priority};
use crate::world_model::WorldModel;

struct DefaultIdeal {
    condition: &'static str,
    criterion: &'static str,
    target_value: serde_json::Value,
    description: &'static str,
}

fn default_ideal(domain: Domain) -> DefaultIdeal {
    match domain {
        Domain::Email => DefaultIdeal {
            condition: "important_mail_response_time",
            criterion: "response_time_minutes",
            target_value: json!(30),
            description: "important mail confirmed within 30 minutes",
        },
        Domain::Github => DefaultIdeal {
            condition: "pr_review_time",
            criterion: "review_time_hours",
            target_value: json!(24),
            description: "PR reviewed within 24 h",
        },
        Domain::Health => DefaultIdeal {
            condition: "nightly_sleep",
            criterion: "sleep_hours",
            target_value: json!(7),
            description: "at least 7 h sleep",
        },
        Domain::Finance => DefaultIdeal {
            condition: "weekly_delivery_spend",
            criterion: "weekly_spend",
            target_value: json!(50_000),
            description: "weekly delivery-app spend at or under 50000",
        },
        Domain::Multi => DefaultIdeal {
            condition: "no_single_ideal",
            criterion: "n/a",
            target_value: json!(null),
            description: "multi-domain calls derive per concrete domain",
        },
    }
}

/// Derives one domain's IdealState/Expectation. Tries `llm` for a richer
/// description; any failure (or no `llm`) falls back to the default table.
/// Output is never persisted.
pub async fn derive_expectation(domain: Domain, world_model: &WorldModel, llm: Option<&dyn LlmPort>) -> Expectation {
    let now = Utc::now();
    let context = ExpectationContext {
        day: now.weekday().to_string(),
        time: format!("{:02}:{:02}", now.hour(), now.minute()),
        timestamp: now,
    };

    let defaults = default_ideal(domain);
    let mut description = defaults.description.to_string();

    if let Some(llm) = llm {
        let prompt = format!(
            "Given the user's goals {:?} and preferences {:?}, state the single ideal \
             expectation for the `{domain}` domain in one sentence.",
            world_model.abstract_goals, world_model.preferences
        );
        if let Ok(generated) = llm.generate(&prompt, 128).await {
            if !generated.trim().is_empty() {
                description = generated.trim().to_string();
            }
        }
    }

    let ideal = IdealState {
        id: format!("ideal_{}", domain.as_str()),
        domain,
        condition: defaults.condition.to_string(),
        criterion: defaults.criterion.to_string(),
        target_value: defaults.target_value.clone(),
        description,
        priority: Priority::Medium,
    };

    let item = ExpectationItem {
        id: format!("expectation_{}", domain.as_str()),
        description: ideal.description.clone(),
        criterion: ideal.criterion.clone(),
        target_value: ideal.target_value.clone(),
        priority: ideal.priority,
    };

    Expectation {
        domain,
        context,
        ideal_states: vec![ideal],
        expectations: vec![item],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_default_table_without_an_llm() {
        let wm = WorldModel::default();
        let expectation = derive_expectation(Domain::Health, &wm, None).await;
        assert_eq!(expectation.ideal_states[0].target_value, json!(7));
        assert!(expectation.ideal_states[0].description.contains("7 h sleep"));
    }

    #[tokio::test]
    async fn every_domain_has_a_default() {
        let wm = WorldModel::default();
        for domain in Domain::concrete() {
            let expectation = derive_expectation(domain, &wm, None).await;
            assert_eq!(expectation.domain, domain);
            assert!(!expectation.ideal_states.is_empty());
        }
    }
}
