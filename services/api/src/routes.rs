use crate::infra::{optional_coordinate, AppState, CoordinateQuery, SafetyServices};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use safe_area::dispatch::{DispatchReceipt, EmergencyAlert};
use safe_area::error::AppError;
use safe_area::facilities::NearbyFacilities;
use safe_area::geo::Coordinate;
use safe_area::location::{record_fix, LastKnownLocation, SeedLocation};
use safe_area::pipeline::{Inspection, Tracked};
use safe_area::risk::Assessment;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct LocationFix {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmergencyRequest {
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmergencyResponse {
    pub(crate) alert: EmergencyAlert,
    pub(crate) message: String,
    pub(crate) receipt: DispatchReceipt,
}

pub(crate) fn with_safety_routes(services: SafetyServices) -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/assessment", get(assessment_endpoint))
        .route("/api/v1/assessment/latest", get(latest_assessment_endpoint))
        .route("/api/v1/facilities", get(facilities_endpoint))
        .route("/api/v1/inspect", get(inspect_endpoint))
        .route("/api/v1/location/seed", get(location_seed_endpoint))
        .route("/api/v1/location", post(record_location_endpoint))
        .route("/api/v1/emergency", post(emergency_endpoint))
        .layer(Extension(services))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn assessment_endpoint(
    Extension(services): Extension<SafetyServices>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<Tracked<Assessment>>, AppError> {
    let coordinate = query.coordinate()?;
    let token = services.pipeline.begin();
    Ok(Json(services.pipeline.assess(token, coordinate).await))
}

pub(crate) async fn latest_assessment_endpoint(
    Extension(services): Extension<SafetyServices>,
) -> Response {
    match services.pipeline.latest_assessment() {
        Some(latest) => Json(latest).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no assessment has been applied yet" })),
        )
            .into_response(),
    }
}

pub(crate) async fn facilities_endpoint(
    Extension(services): Extension<SafetyServices>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<Tracked<NearbyFacilities>>, AppError> {
    let coordinate = query.coordinate()?;
    let token = services.pipeline.begin();
    Ok(Json(
        services
            .pipeline
            .facilities(token, coordinate, query.radius)
            .await,
    ))
}

pub(crate) async fn inspect_endpoint(
    Extension(services): Extension<SafetyServices>,
    Query(query): Query<CoordinateQuery>,
) -> Result<Json<Inspection>, AppError> {
    let coordinate = query.coordinate()?;
    Ok(Json(services.pipeline.inspect(coordinate, query.radius).await))
}

pub(crate) async fn location_seed_endpoint(
    Extension(services): Extension<SafetyServices>,
) -> Json<SeedLocation> {
    Json(services.seed().await)
}

pub(crate) async fn record_location_endpoint(
    Extension(services): Extension<SafetyServices>,
    Json(fix): Json<LocationFix>,
) -> Result<Json<LastKnownLocation>, AppError> {
    let coordinate = Coordinate::new(fix.latitude, fix.longitude)?;
    let stored = record_fix(services.locations.as_ref(), coordinate)?;
    Ok(Json(stored))
}

pub(crate) async fn emergency_endpoint(
    Extension(services): Extension<SafetyServices>,
    Json(request): Json<EmergencyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let coordinate = match optional_coordinate(request.lat, request.lon)? {
        Some(coordinate) => coordinate,
        None => services.seed().await.coordinate,
    };

    let latest = services
        .pipeline
        .latest_assessment()
        .filter(|tracked| tracked.value.coordinate == coordinate);
    let alert = EmergencyAlert::new(
        coordinate,
        request.note.as_deref(),
        latest.as_ref().map(|tracked| &tracked.value),
    );
    let receipt = services.dispatch.send(&alert).await?;

    let status = if receipt.delivered {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    let message = alert.message();
    Ok((
        status,
        Json(EmergencyResponse {
            alert,
            message,
            receipt,
        }),
    ))
}
