use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    default_description, default_incident_type, level_for_score, Assessment, AssessmentSource,
    RiskLevel, TREND_PERIODS,
};
use super::scorer::{deterministic_score, placeholder_peak_hours, synthesize_trend};
use crate::config::RiskServiceConfig;
use crate::geo::Coordinate;
use crate::transport::{self, FetchError};

/// Parameters sent to the scoring endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskQuery {
    pub coordinate: Coordinate,
    /// Local hour of day (0-23) when the caller wants time-aware scoring.
    pub hour: Option<u32>,
}

/// Raw scoring payload. Every field is optional and several have two accepted spellings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPayload {
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub peak_hours: Option<Vec<String>>,
    #[serde(default, rename = "peakHours")]
    pub peak_hours_camel: Option<Vec<String>>,
    #[serde(default)]
    pub trend: Option<Vec<f64>>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub incident_type: Option<String>,
}

impl RiskPayload {
    /// Maps the payload onto a remote-sourced assessment, backfilling omitted fields.
    ///
    /// A score that is not a finite number in `[0, 100]` makes the whole payload
    /// unusable; everything else degrades to a local default.
    pub fn into_assessment(self, coordinate: Coordinate) -> Result<Assessment, FetchError> {
        let score = match self.risk_score.or(self.score) {
            Some(raw) if raw.is_finite() && (0.0..=100.0).contains(&raw) => raw.round() as u8,
            Some(raw) => return Err(FetchError::Parse(format!("score {raw} outside [0, 100]"))),
            None => {
                debug!(%coordinate, "scoring payload omitted score; using deterministic score");
                deterministic_score(coordinate)
            }
        };

        let level = level_for_score(score);
        let reported = non_blank(self.risk_level).or_else(|| non_blank(self.level));
        if let Some(reported) = reported {
            if RiskLevel::parse(&reported) != Some(level) {
                debug!(%reported, derived = %level, score, "reported level overridden by score threshold");
            }
        }

        let trend = self
            .trend
            .and_then(|values| normalize_trend(&values))
            .unwrap_or_else(|| synthesize_trend(score));

        let peak_hours = self
            .peak_hours
            .or(self.peak_hours_camel)
            .map(|hours| {
                hours
                    .into_iter()
                    .map(|window| window.trim().to_string())
                    .filter(|window| !window.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|hours| !hours.is_empty())
            .unwrap_or_else(|| placeholder_peak_hours(score));

        let description = non_blank(self.description)
            .unwrap_or_else(|| default_description(level).to_string());
        let incident_type = non_blank(self.kind)
            .or_else(|| non_blank(self.incident_type))
            .unwrap_or_else(|| default_incident_type(level).to_string());

        Ok(Assessment {
            coordinate,
            score,
            level,
            description,
            peak_hours,
            trend,
            incident_type,
            source: AssessmentSource::Remote,
            assessed_at: Utc::now(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn normalize_trend(values: &[f64]) -> Option<[u8; TREND_PERIODS]> {
    if values.len() != TREND_PERIODS || values.iter().any(|value| !value.is_finite()) {
        return None;
    }

    let mut trend = [0u8; TREND_PERIODS];
    for (slot, value) in trend.iter_mut().zip(values) {
        *slot = value.round().clamp(3.0, 100.0) as u8;
    }
    Some(trend)
}

/// Remote scoring capability; implementations report failures instead of panicking.
#[async_trait]
pub trait RiskService: Send + Sync {
    async fn analyze(&self, query: &RiskQuery) -> Result<RiskPayload, FetchError>;
}

/// reqwest-backed client for the `/analyze` endpoint.
#[derive(Debug, Clone)]
pub struct HttpRiskService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRiskService {
    pub fn new(config: &RiskServiceConfig) -> Result<Self, reqwest::Error> {
        let client = transport::build_client(config.timeout)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let endpoint = format!("{}/analyze", base_url.trim_end_matches('/'));
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RiskService for HttpRiskService {
    async fn analyze(&self, query: &RiskQuery) -> Result<RiskPayload, FetchError> {
        let mut params = vec![
            ("lat", query.coordinate.latitude().to_string()),
            ("lon", query.coordinate.longitude().to_string()),
        ];
        if let Some(hour) = query.hour {
            params.push(("hour", hour.to_string()));
        }

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        transport::read_json(response).await
    }
}
