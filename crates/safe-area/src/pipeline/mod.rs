//! Request orchestration: runs assessment and facility lookup side by side and
//! keeps only the results of the most recently submitted request.

mod sequence;

pub use sequence::{LatestSlot, RequestSequencer, RequestToken};

use serde::Serialize;
use tracing::debug;

use crate::facilities::{FacilityResolver, NearbyFacilities};
use crate::geo::Coordinate;
use crate::risk::{Assessment, RiskAssessor};

/// A component result tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracked<T> {
    pub token: RequestToken,
    pub value: T,
    /// Whether the result became the current one.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub token: RequestToken,
    pub assessment: Tracked<Assessment>,
    pub facilities: Tracked<NearbyFacilities>,
}

#[derive(Debug)]
pub struct SafetyPipeline {
    assessor: RiskAssessor,
    resolver: FacilityResolver,
    sequencer: RequestSequencer,
    assessment: LatestSlot<Assessment>,
    facilities: LatestSlot<NearbyFacilities>,
    default_radius_meters: u32,
}

impl SafetyPipeline {
    pub fn new(assessor: RiskAssessor, resolver: FacilityResolver, default_radius_meters: u32) -> Self {
        Self {
            assessor,
            resolver,
            sequencer: RequestSequencer::new(),
            assessment: LatestSlot::new(),
            facilities: LatestSlot::new(),
            default_radius_meters,
        }
    }

    pub fn default_radius_meters(&self) -> u32 {
        self.default_radius_meters
    }

    /// Registers a new submission; any result from an earlier token becomes stale.
    pub fn begin(&self) -> RequestToken {
        self.sequencer.issue()
    }

    pub async fn assess(&self, token: RequestToken, coordinate: Coordinate) -> Tracked<Assessment> {
        let assessment = self.assessor.assess(coordinate).await;
        let applied = self.apply(&self.assessment, token, assessment.clone(), "assessment");
        Tracked {
            token,
            value: assessment,
            applied,
        }
    }

    pub async fn facilities(
        &self,
        token: RequestToken,
        coordinate: Coordinate,
        radius_meters: Option<u32>,
    ) -> Tracked<NearbyFacilities> {
        let radius = radius_meters.unwrap_or(self.default_radius_meters);
        let nearby = self.resolver.resolve(coordinate, radius).await;
        let applied = self.apply(&self.facilities, token, nearby.clone(), "facilities");
        Tracked {
            token,
            value: nearby,
            applied,
        }
    }

    /// Submits one request and runs both lookups concurrently.
    pub async fn inspect(&self, coordinate: Coordinate, radius_meters: Option<u32>) -> Inspection {
        let token = self.begin();
        let (assessment, facilities) = tokio::join!(
            self.assess(token, coordinate),
            self.facilities(token, coordinate, radius_meters)
        );
        Inspection {
            token,
            assessment,
            facilities,
        }
    }

    pub fn latest_assessment(&self) -> Option<Tracked<Assessment>> {
        self.assessment.get().map(|(token, value)| Tracked {
            token,
            value,
            applied: true,
        })
    }

    pub fn latest_facilities(&self) -> Option<Tracked<NearbyFacilities>> {
        self.facilities.get().map(|(token, value)| Tracked {
            token,
            value,
            applied: true,
        })
    }

    fn apply<T: Clone>(&self, slot: &LatestSlot<T>, token: RequestToken, value: T, what: &str) -> bool {
        if !self.sequencer.is_latest(token) {
            debug!(%token, latest = ?self.sequencer.latest(), what, "discarding stale result");
            return false;
        }
        slot.offer(token, value)
    }
}
