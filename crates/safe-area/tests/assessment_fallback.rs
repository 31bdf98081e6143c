use async_trait::async_trait;
use safe_area::config::RiskServiceConfig;
use safe_area::geo::Coordinate;
use safe_area::risk::{
    deterministic_score, level_for_score, synthesize_trend, Assessment, AssessmentSource,
    RiskAssessor, RiskLevel, RiskPayload, RiskQuery, RiskService,
};
use safe_area::transport::{FailureKind, FetchError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Behaviour {
    Hang,
    Fail(FetchError),
    Body(&'static str),
}

struct ScriptedService {
    behaviour: Behaviour,
    calls: AtomicUsize,
    last_query: Mutex<Option<RiskQuery>>,
}

impl ScriptedService {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        })
    }
}

#[async_trait]
impl RiskService for ScriptedService {
    async fn analyze(&self, query: &RiskQuery) -> Result<RiskPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().expect("query lock") = Some(*query);
        match &self.behaviour {
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RiskPayload::default())
            }
            Behaviour::Fail(err) => Err(err.clone()),
            Behaviour::Body(body) => Ok(serde_json::from_str(body)?),
        }
    }
}

fn san_francisco() -> Coordinate {
    Coordinate::new(37.7749, -122.4194).expect("valid coordinate")
}

fn assessor(service: Arc<ScriptedService>) -> RiskAssessor {
    RiskAssessor::new(service, Duration::from_secs(3))
}

fn assert_well_formed(assessment: &Assessment) {
    assert!(assessment.score <= 100);
    assert_eq!(assessment.level, level_for_score(assessment.score));
    assert!(!assessment.description.is_empty());
    assert!(!assessment.peak_hours.is_empty());
    assert!(!assessment.incident_type.is_empty());
    assert!(assessment.trend.iter().all(|value| (3..=100).contains(value)));
}

#[tokio::test(start_paused = true)]
async fn timeout_falls_back_to_deterministic_score() {
    let service = ScriptedService::new(Behaviour::Hang);
    let evaluation = assessor(service.clone()).evaluate(san_francisco()).await;

    assert_eq!(evaluation.assessment.source, AssessmentSource::Fallback);
    assert_eq!(evaluation.assessment.score, deterministic_score(san_francisco()));
    assert_eq!(evaluation.assessment.score, 85);
    assert_eq!(evaluation.assessment.level, RiskLevel::High);
    assert_eq!(evaluation.assessment.trend, synthesize_trend(85));
    assert_eq!(
        evaluation.failure.map(|failure| failure.kind()),
        Some(FailureKind::Timeout)
    );
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn assess_is_total_under_every_remote_outcome() {
    let scenarios = vec![
        ScriptedService::new(Behaviour::Fail(FetchError::Status(503))),
        ScriptedService::new(Behaviour::Fail(FetchError::Network("connection refused".into()))),
        ScriptedService::new(Behaviour::Body("{\"risk_score\": ")),
        ScriptedService::new(Behaviour::Body("{\"risk_score\": \"high\"}")),
        ScriptedService::new(Behaviour::Body("{\"risk_score\": 250}")),
        ScriptedService::new(Behaviour::Body("{}")),
        ScriptedService::new(Behaviour::Body("{\"level\": \"High\"}")),
        ScriptedService::new(Behaviour::Body(
            r#"{"risk_score": 62, "risk_level": "Medium", "description": "Busy junction",
                "peak_hours": ["18:00-20:00"], "trend": [40, 45, 50, 55, 60, 62],
                "type": "Theft"}"#,
        )),
    ];

    for service in scenarios {
        let assessment = assessor(service).assess(san_francisco()).await;
        assert_well_formed(&assessment);
    }
}

#[tokio::test]
async fn failures_are_classified() {
    let malformed = assessor(ScriptedService::new(Behaviour::Body("[1, 2")))
        .evaluate(san_francisco())
        .await;
    assert_eq!(malformed.assessment.source, AssessmentSource::Fallback);
    assert_eq!(
        malformed.failure.map(|failure| failure.kind()),
        Some(FailureKind::Parse)
    );

    let unavailable = assessor(ScriptedService::new(Behaviour::Fail(FetchError::Status(500))))
        .evaluate(san_francisco())
        .await;
    assert_eq!(unavailable.failure, Some(FetchError::Status(500)));
}

#[tokio::test]
async fn partial_payload_is_backfilled_and_remote() {
    let service = ScriptedService::new(Behaviour::Body(
        r#"{"risk_score": 45, "risk_level": "Medium", "peak_hours": ["19:00-21:00"]}"#,
    ));
    let evaluation = assessor(service).evaluate(san_francisco()).await;

    assert!(evaluation.failure.is_none());
    let assessment = evaluation.assessment;
    assert_eq!(assessment.score, 45);
    assert_eq!(assessment.level, RiskLevel::Medium);
    assert_eq!(assessment.peak_hours, vec!["19:00-21:00".to_string()]);
    assert_eq!(assessment.source, AssessmentSource::Remote);
    assert_eq!(assessment.trend, synthesize_trend(45));
}

#[tokio::test]
async fn hour_of_day_is_sent_only_when_enabled() {
    let service = ScriptedService::new(Behaviour::Body("{}"));
    assessor(service.clone()).assess(san_francisco()).await;
    let query = service.last_query.lock().expect("query lock").expect("called");
    assert_eq!(query.hour, None);
    assert_eq!(query.coordinate, san_francisco());

    let service = ScriptedService::new(Behaviour::Body("{}"));
    assessor(service.clone())
        .with_hour_of_day(true)
        .assess(san_francisco())
        .await;
    let hour = service
        .last_query
        .lock()
        .expect("query lock")
        .and_then(|query| query.hour)
        .expect("hour sent");
    assert!(hour < 24);
}

#[tokio::test]
async fn offline_assessor_never_reports_a_failure() {
    let evaluation = RiskAssessor::offline().evaluate(san_francisco()).await;
    assert!(evaluation.assessment.is_fallback());
    assert!(evaluation.failure.is_none());
    assert_well_formed(&evaluation.assessment);
}

#[test]
fn timeout_comes_from_config() {
    let config = RiskServiceConfig {
        base_url: "http://localhost:8000".to_string(),
        timeout: Duration::from_millis(750),
        send_hour: false,
    };
    let service = ScriptedService::new(Behaviour::Body("{}"));
    assert_eq!(
        RiskAssessor::from_config(service, &config).timeout(),
        Duration::from_millis(750)
    );
    assert_eq!(RiskAssessor::offline().timeout(), Duration::ZERO);
}
