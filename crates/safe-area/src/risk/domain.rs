use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Number of periods in every synthesized or remote trend series.
pub const TREND_PERIODS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Lenient parse of level strings reported by the scoring service.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let word = lowered.split_whitespace().next()?;
        match word {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Threshold rule every assessment obeys: High above 70, Medium above 30.
pub const fn level_for_score(score: u8) -> RiskLevel {
    if score > 70 {
        RiskLevel::High
    } else if score > 30 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Whether a figure came from the scoring service or was synthesized locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Remote,
    Fallback,
}

impl AssessmentSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Remote => "remote service",
            Self::Fallback => "local estimate",
        }
    }
}

/// Complete risk judgment for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub coordinate: Coordinate,
    pub score: u8,
    pub level: RiskLevel,
    pub description: String,
    pub peak_hours: Vec<String>,
    pub trend: [u8; TREND_PERIODS],
    pub incident_type: String,
    pub source: AssessmentSource,
    pub assessed_at: DateTime<Utc>,
}

impl Assessment {
    pub fn is_fallback(&self) -> bool {
        self.source == AssessmentSource::Fallback
    }
}

pub(crate) const fn default_description(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "Elevated historical incidents nearby.",
        RiskLevel::Medium => "Moderate incident density detected.",
        RiskLevel::Low => "No major crimes nearby.",
    }
}

pub(crate) const fn default_incident_type(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "Assault",
        RiskLevel::Medium => "Theft",
        RiskLevel::Low => "Normal",
    }
}
