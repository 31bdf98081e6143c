use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::domain::{Facility, FacilityKind, NearbyFacilities};
use super::overpass::{PoiElement, PoiQuery, PoiSource};
use crate::config::FacilityConfig;
use crate::geo::{self, Coordinate};
use crate::transport::FetchError;

const DEFAULT_LIMIT_PER_KIND: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Best-effort lookup of the closest hospitals and police stations.
#[derive(Clone)]
pub struct FacilityResolver {
    source: Arc<dyn PoiSource>,
    timeout: Duration,
    limit_per_kind: usize,
    result_limit: u32,
    max_radius_meters: u32,
}

impl FacilityResolver {
    pub fn new(source: Arc<dyn PoiSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_TIMEOUT,
            limit_per_kind: DEFAULT_LIMIT_PER_KIND,
            result_limit: 20,
            max_radius_meters: 5_000,
        }
    }

    pub fn from_config(source: Arc<dyn PoiSource>, config: &FacilityConfig) -> Self {
        Self {
            source,
            timeout: config.timeout,
            limit_per_kind: config.limit_per_kind,
            result_limit: config.result_limit,
            max_radius_meters: config.max_radius_meters,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limit_per_kind(mut self, limit: usize) -> Self {
        self.limit_per_kind = limit;
        self
    }

    /// Never fails: any source error yields empty lists.
    pub async fn resolve(&self, coordinate: Coordinate, radius_meters: u32) -> NearbyFacilities {
        let query = PoiQuery {
            result_limit: self.result_limit,
            timeout_secs: self.timeout.as_secs().max(1),
            ..PoiQuery::emergency_services(
                coordinate,
                radius_meters.clamp(1, self.max_radius_meters.max(1)),
            )
        };

        let outcome = match tokio::time::timeout(self.timeout, self.source.amenities_near(&query))
            .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(FetchError::from(elapsed)),
        };

        match outcome {
            Ok(elements) => {
                let nearby = rank(coordinate, elements, self.limit_per_kind);
                debug!(
                    %coordinate,
                    hospitals = nearby.hospitals.len(),
                    police = nearby.police.len(),
                    "facilities resolved"
                );
                nearby
            }
            Err(failure) => {
                warn!(
                    %coordinate,
                    kind = failure.kind().label(),
                    error = %failure,
                    "facility lookup failed; returning no facilities"
                );
                NearbyFacilities::default()
            }
        }
    }
}

impl std::fmt::Debug for FacilityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilityResolver")
            .field("timeout", &self.timeout)
            .field("limit_per_kind", &self.limit_per_kind)
            .field("result_limit", &self.result_limit)
            .field("max_radius_meters", &self.max_radius_meters)
            .finish()
    }
}

fn normalize(origin: Coordinate, element: &PoiElement) -> Option<Facility> {
    let kind = element.kind()?;
    let coordinate = element.coordinate();
    let name = element
        .label()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", kind.amenity(), element.id));

    Some(Facility {
        id: format!("{}/{}", element.element_type, element.id),
        kind,
        name,
        coordinate,
        distance_meters: geo::distance_meters(origin, coordinate).map(f64::round),
    })
}

fn rank(origin: Coordinate, elements: Vec<PoiElement>, limit_per_kind: usize) -> NearbyFacilities {
    let mut nearby = NearbyFacilities::default();
    for facility in elements.iter().filter_map(|element| normalize(origin, element)) {
        match facility.kind {
            FacilityKind::Hospital => nearby.hospitals.push(facility),
            FacilityKind::Police => nearby.police.push(facility),
        }
    }

    for list in [&mut nearby.hospitals, &mut nearby.police] {
        list.sort_by(|a, b| match (a.distance_meters, b.distance_meters) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        list.truncate(limit_per_kind);
    }
    nearby
}
