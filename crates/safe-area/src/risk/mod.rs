//! Risk assessment: deterministic scorer, remote scoring client and the fallback
//! orchestrator that composes them.

mod assessor;
pub mod domain;
pub mod remote;
pub mod scorer;

pub use assessor::{Evaluation, RiskAssessor};
pub use domain::{level_for_score, Assessment, AssessmentSource, RiskLevel, TREND_PERIODS};
pub use remote::{HttpRiskService, RiskPayload, RiskQuery, RiskService};
pub use scorer::{deterministic_score, placeholder_peak_hours, synthesize_trend};
