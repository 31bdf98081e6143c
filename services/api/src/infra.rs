use metrics_exporter_prometheus::PrometheusHandle;
use safe_area::config::AppConfig;
use safe_area::dispatch::{DispatchClient, HttpDispatchClient};
use safe_area::error::AppError;
use safe_area::facilities::{FacilityResolver, OverpassClient};
use safe_area::geo::{Coordinate, CoordinateError};
use safe_area::location::{
    resolve_seed, FileLocationCache, LocationCache, LocationProvider, SeedLocation,
    StaticLocationProvider,
};
use safe_area::pipeline::SafetyPipeline;
use safe_area::risk::{HttpRiskService, RiskAssessor};
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything a request handler needs from the core crate.
#[derive(Clone)]
pub(crate) struct SafetyServices {
    pub(crate) pipeline: Arc<SafetyPipeline>,
    pub(crate) provider: Arc<dyn LocationProvider>,
    pub(crate) locations: Arc<dyn LocationCache>,
    pub(crate) dispatch: Arc<dyn DispatchClient>,
    pub(crate) default_coordinate: Coordinate,
    pub(crate) fix_timeout: Duration,
}

impl SafetyServices {
    pub(crate) async fn seed(&self) -> SeedLocation {
        resolve_seed(
            self.provider.as_ref(),
            self.locations.as_ref(),
            self.default_coordinate,
            self.fix_timeout,
        )
        .await
    }
}

pub(crate) fn build_pipeline(config: &AppConfig, offline: bool) -> Result<SafetyPipeline, AppError> {
    let assessor = if offline {
        RiskAssessor::offline()
    } else {
        let service = Arc::new(HttpRiskService::new(&config.risk)?);
        RiskAssessor::from_config(service, &config.risk)
    };

    let source = Arc::new(OverpassClient::new(&config.facilities)?);
    let resolver = FacilityResolver::from_config(source, &config.facilities);

    Ok(SafetyPipeline::new(
        assessor,
        resolver,
        config.facilities.radius_meters,
    ))
}

/// Wires the live collaborators. `fix` stands in for the device position, if known.
pub(crate) fn build_services(
    config: &AppConfig,
    offline: bool,
    fix: Option<Coordinate>,
) -> Result<SafetyServices, AppError> {
    Ok(SafetyServices {
        pipeline: Arc::new(build_pipeline(config, offline)?),
        provider: Arc::new(StaticLocationProvider(fix)),
        locations: Arc::new(FileLocationCache::new(&config.location.cache_path)),
        dispatch: Arc::new(HttpDispatchClient::new(&config.dispatch)?),
        default_coordinate: config.location.default_coordinate,
        fix_timeout: config.location.fix_timeout,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoordinateQuery {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    #[serde(default)]
    pub(crate) radius: Option<u32>,
}

impl CoordinateQuery {
    pub(crate) fn coordinate(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Builds a coordinate from optional parts supplied by a caller; both or neither.
pub(crate) fn optional_coordinate(
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<Option<Coordinate>, CoordinateError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Coordinate::new(lat, lon).map(Some),
        (None, None) => Ok(None),
        _ => Err(CoordinateError::Incomplete),
    }
}
