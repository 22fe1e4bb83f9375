//! Baseline Calculator (spec.md §4.4).
//!
//! Grounded on `examples/original_source/utils/baseline_calculator.py`'s
//! per-domain dispatch and default 3-week window; degrades to `None` when
//! history is empty rather than failing the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::world_model::WorldModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub baseline_value: f64,
    pub baseline_period: String,
    pub calculated_at: DateTime<Utc>,
    pub metrics: serde_json::Value,
}

/// Computes a domain-specific rolling baseline over `weeks` (clamped 2-4)
/// of `world_model.history[domain]`. `None` when there is no history.
pub fn calculate_baseline(domain: Domain, world_model: &WorldModel, weeks: u32) -> Option<Baseline> {
    let weeks = weeks.clamp(2, 4);
    let records = world_model.history.get(domain.as_str())?;
    if records.is_empty() {
        return None;
    }

    let cutoff = Utc::now() - Duration::weeks(weeks as i64);
    let windowed: Vec<&serde_json::Value> = records
        .iter()
        .filter(|record| within_window(record, cutoff))
        .collect();
    if windowed.is_empty() {
        return None;
    }

    let field = match domain {
        Domain::Email => "response_time_hours",
        Domain::Github => "review_time_hours",
        Domain::Health => "sleep_hours",
        Domain::Finance => "weekly_spend",
        Domain::Multi => return None,
    };

    let avg = average_field(&windowed, field)?;
    Some(Baseline {
        baseline_value: avg,
        baseline_period: format!("{weeks} weeks"),
        calculated_at: Utc::now(),
        metrics: serde_json::json!({
            "field": field,
            "sample_count": windowed.len(),
        }),
    })
}

fn within_window(record: &serde_json::Value, cutoff: DateTime<Utc>) -> bool {
    match record.get("recorded_at").and_then(|v| v.as_str()) {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc) >= cutoff)
            .unwrap_or(true),
        None => true,
    }
}

fn average_field(records: &[&serde_json::Value], field: &str) -> Option<f64> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.get(field).and_then(|v| v.as_f64()))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_model::WorldModel;

    fn record(hours: f64) -> serde_json::Value {
        serde_json::json!({ "response_time_hours": hours, "recorded_at": Utc::now().to_rfc3339() })
    }

    #[test]
    fn empty_history_yields_none() {
        let wm = WorldModel::default();
        assert!(calculate_baseline(Domain::Email, &wm, 3).is_none());
    }

    #[test]
    fn averages_the_configured_field() {
        let mut wm = WorldModel::default();
        wm.history
            .insert("email".to_string(), vec![record(10.0), record(20.0), record(30.0)]);
        let baseline = calculate_baseline(Domain::Email, &wm, 3).unwrap();
        assert!((baseline.baseline_value - 20.0).abs() < 1e-9);
        assert_eq!(baseline.baseline_period, "3 weeks");
    }

    #[test]
    fn window_is_clamped_to_two_to_four_weeks() {
        let mut wm = WorldModel::default();
        wm.history.insert("email".to_string(), vec![record(5.0)]);
        let baseline = calculate_baseline(Domain::Email, &wm, 10).unwrap();
        assert_eq!(baseline.baseline_period, "4 weeks");
        let baseline = calculate_baseline(Domain::Email, &wm, 1).unwrap();
        assert_eq!(baseline.baseline_period, "2 weeks");
    }

    #[test]
    fn idempotent_for_unchanged_history() {
        let mut wm = WorldModel::default();
        wm.history
            .insert("health".to_string(), vec![record_field("sleep_hours", 6.5)]);
        let first = calculate_baseline(Domain::Health, &wm, 3).unwrap();
        let second = calculate_baseline(Domain::Health, &wm, 3).unwrap();
        assert_eq!(first.baseline_value, second.baseline_value);
    }

    fn record_field(field: &str, value: f64) -> serde_json::Value {
        serde_json::json!({ field: value, "recorded_at": Utc::now().to_rfc3339() })
    }
}
