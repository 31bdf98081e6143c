use chrono::{Local, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::domain::Assessment;
use super::remote::{RiskQuery, RiskService};
use super::scorer::fallback_assessment;
use crate::config::RiskServiceConfig;
use crate::geo::Coordinate;
use crate::transport::FetchError;

/// Assessment together with the remote failure that forced a fallback, if any.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub assessment: Assessment,
    pub failure: Option<FetchError>,
}

/// Fallback orchestrator: asks the scoring service, substitutes the
/// deterministic path on any failure, and never returns an error.
#[derive(Clone)]
pub struct RiskAssessor {
    service: Option<Arc<dyn RiskService>>,
    timeout: Duration,
    send_hour: bool,
}

impl RiskAssessor {
    pub fn new(service: Arc<dyn RiskService>, timeout: Duration) -> Self {
        Self {
            service: Some(service),
            timeout,
            send_hour: false,
        }
    }

    pub fn from_config(service: Arc<dyn RiskService>, config: &RiskServiceConfig) -> Self {
        Self::new(service, config.timeout).with_hour_of_day(config.send_hour)
    }

    /// Assessor that never contacts a scoring service.
    pub fn offline() -> Self {
        Self {
            service: None,
            timeout: Duration::ZERO,
            send_hour: false,
        }
    }

    pub fn with_hour_of_day(mut self, send_hour: bool) -> Self {
        self.send_hour = send_hour;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn assess(&self, coordinate: Coordinate) -> Assessment {
        self.evaluate(coordinate).await.assessment
    }

    pub async fn evaluate(&self, coordinate: Coordinate) -> Evaluation {
        let Some(service) = &self.service else {
            return Evaluation {
                assessment: fallback_assessment(coordinate),
                failure: None,
            };
        };

        let query = RiskQuery {
            coordinate,
            hour: self.send_hour.then(|| Local::now().hour()),
        };

        let outcome = match tokio::time::timeout(self.timeout, service.analyze(&query)).await {
            Ok(result) => result,
            Err(elapsed) => Err(FetchError::from(elapsed)),
        };

        match outcome.and_then(|payload| payload.into_assessment(coordinate)) {
            Ok(assessment) => {
                debug!(%coordinate, score = assessment.score, "remote assessment resolved");
                Evaluation {
                    assessment,
                    failure: None,
                }
            }
            Err(failure) => {
                warn!(
                    %coordinate,
                    kind = failure.kind().label(),
                    error = %failure,
                    "risk service unusable; using deterministic score"
                );
                Evaluation {
                    assessment: fallback_assessment(coordinate),
                    failure: Some(failure),
                }
            }
        }
    }
}

impl std::fmt::Debug for RiskAssessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskAssessor")
            .field("remote", &self.service.is_some())
            .field("timeout", &self.timeout)
            .field("send_hour", &self.send_hour)
            .finish()
    }
}
