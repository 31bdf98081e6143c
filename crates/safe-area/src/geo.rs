use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a coordinate from optional parts, as found in third-party payloads.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).ok(),
            _ => None,
        }
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

/// Caller-input error raised before any network call is attempted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate components must be finite numbers")]
    NonFinite,
    #[error("latitude and longitude must be supplied together")]
    Incomplete,
}

/// Great-circle distance in meters; `None` when the second point is unknown.
pub fn distance_meters(from: Coordinate, to: Option<Coordinate>) -> Option<f64> {
    let to = to?;

    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Some(EARTH_RADIUS_METERS * c)
}

/// Distance to a point given as loose components; missing or invalid parts yield `None`.
pub fn distance_to_parts(
    from: Coordinate,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Option<f64> {
    distance_meters(from, Coordinate::from_parts(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.01),
            Err(CoordinateError::LongitudeOutOfRange(-180.01))
        );
        assert_eq!(
            Coordinate::new(f64::NAN, 0.0),
            Err(CoordinateError::NonFinite)
        );
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn distance_to_self_is_zero() {
        let chennai = coord(13.0827, 80.2707);
        let distance = distance_meters(chennai, Some(chennai)).expect("known distance");
        assert!(distance.abs() < 1e-6);
    }

    #[test]
    fn distance_matches_haversine_reference() {
        let central = coord(13.0827, 80.2707);
        let egmore = coord(13.0674, 80.2376);
        let reference = 3968.3;

        let distance = distance_meters(central, Some(egmore)).expect("known distance");
        assert!(
            ((distance - reference) / reference).abs() < 0.005,
            "distance {distance} too far from {reference}"
        );

        let reverse = distance_meters(egmore, Some(central)).expect("known distance");
        assert!((distance - reverse).abs() < 1e-9);
    }

    #[test]
    fn unknown_target_yields_none() {
        let origin = coord(37.7749, -122.4194);
        assert_eq!(distance_meters(origin, None), None);
        assert_eq!(distance_to_parts(origin, Some(37.0), None), None);
        assert_eq!(distance_to_parts(origin, Some(137.0), Some(10.0)), None);
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let distance = distance_meters(coord(0.0, 0.0), Some(coord(0.0, 180.0)))
            .expect("known distance");
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((distance - half_circumference).abs() < 1.0);
    }

    #[test]
    fn deserialization_validates_ranges() {
        let parsed: Coordinate =
            serde_json::from_str(r#"{"latitude": 12.5, "longitude": 77.6}"#).expect("valid");
        assert_eq!(parsed, coord(12.5, 77.6));

        let invalid = serde_json::from_str::<Coordinate>(r#"{"latitude": 95, "longitude": 0}"#);
        assert!(invalid.is_err());
    }
}
