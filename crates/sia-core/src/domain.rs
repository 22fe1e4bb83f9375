//! Closed set of supported domains, carried as an enum plus a small
//! registry rather than free-form strings (spec.md §9 REDESIGN FLAGS).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Email,
    Github,
    Health,
    Finance,
    Multi,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Email => "email",
            Domain::Github => "github",
            Domain::Health => "health",
            Domain::Finance => "finance",
            Domain::Multi => "multi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Domain::Email),
            "github" => Some(Domain::Github),
            "health" => Some(Domain::Health),
            "finance" => Some(Domain::Finance),
            "multi" => Some(Domain::Multi),
            _ => None,
        }
    }

    /// All concrete (non-`multi`) domains, for iterating a merged sensor payload.
    pub fn concrete() -> [Domain; 4] {
        [Domain::Email, Domain::Github, Domain::Health, Domain::Finance]
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Lock-acquisition priority for this risk tier (spec.md §4.12).
    pub fn lock_priority(&self) -> u8 {
        match self {
            RiskLevel::Low => 5,
            RiskLevel::Medium => 7,
            RiskLevel::High => 9,
        }
    }
}
