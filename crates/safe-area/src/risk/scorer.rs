//! Offline, reproducible scoring used whenever the remote service is unusable.

use chrono::Utc;

use super::domain::{
    default_description, default_incident_type, level_for_score, Assessment, AssessmentSource,
    RiskLevel, TREND_PERIODS,
};
use crate::geo::Coordinate;

const HASH_LAT_FACTOR: f64 = 12.9898;
const HASH_LON_FACTOR: f64 = 78.233;
const HASH_SCALE: f64 = 43_758.5453;

const TREND_FLOOR: f64 = 3.0;
const TREND_CEILING: f64 = 100.0;
const TREND_AMPLITUDE: f64 = 0.15;
const TREND_FREQUENCY: f64 = 0.6;

/// Stable pseudo-random score in `[0, 100)` for any valid coordinate.
pub fn deterministic_score(coordinate: Coordinate) -> u8 {
    let seed = coordinate.latitude() * HASH_LAT_FACTOR + coordinate.longitude() * HASH_LON_FACTOR;
    let hashed = (seed.sin() * HASH_SCALE).abs();
    let fraction = hashed - hashed.floor();
    let score = (fraction * 100.0).floor();

    // fraction * 100 may round up to exactly 100.0 for fractions just below 1.
    score.clamp(0.0, 99.0) as u8
}

/// Smooth 6-period series derived from `base` by a bounded sine modulation.
pub fn synthesize_trend(base: u8) -> [u8; TREND_PERIODS] {
    let base = base.min(100);
    let magnitude = f64::from(base) / 100.0 * 80.0 + 20.0;

    let mut trend = [0u8; TREND_PERIODS];
    for (period, slot) in trend.iter_mut().enumerate() {
        let phase = (f64::from(base) + period as f64) * TREND_FREQUENCY;
        let value = magnitude * (1.0 + phase.sin() * TREND_AMPLITUDE);
        *slot = value.clamp(TREND_FLOOR, TREND_CEILING).round() as u8;
    }
    trend
}

/// Typical high-incidence windows for the level implied by `score`.
pub fn placeholder_peak_hours(score: u8) -> Vec<String> {
    let windows: &[&str] = match level_for_score(score) {
        RiskLevel::High => &["18:00-20:00", "22:00-02:00"],
        RiskLevel::Medium => &["19:00-21:00", "23:00-01:00"],
        RiskLevel::Low => &["20:00-22:00"],
    };
    windows.iter().map(|window| window.to_string()).collect()
}

/// Assessment built purely from local, deterministic inputs.
pub(crate) fn fallback_assessment(coordinate: Coordinate) -> Assessment {
    let score = deterministic_score(coordinate);
    let level = level_for_score(score);

    Assessment {
        coordinate,
        score,
        level,
        description: default_description(level).to_string(),
        peak_hours: placeholder_peak_hours(score),
        trend: synthesize_trend(score),
        incident_type: default_incident_type(level).to_string(),
        source: AssessmentSource::Fallback,
        assessed_at: Utc::now(),
    }
}
