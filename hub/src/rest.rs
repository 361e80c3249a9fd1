use std::time::Instant;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::auth::{require_user, OwnerIdentity};
use crate::errors::Error;
use crate::metrics::{
    DB_FAILURES_TOTAL, EVENTS_APPENDED_TOTAL, REPORTS_REJECTED_TOTAL, REPORTS_TOTAL,
    REPORT_LATENCY_SECONDS,
};
use crate::model::{
    ApiResponse, Device, DeviceIdBody, DeviceSeries, EventHit, OnlineBreakdown, ReportRequest,
    SubmitRequest, SubmittedEvent,
};
use crate::validate::{device_filter, require_label};
use crate::{events, ingest, registry, summary};

#[derive(Debug, Clone)]
struct AppState {
    pool: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct EventSearchQuery {
    #[serde(rename = "deviceID")]
    device_id: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    end_date: Option<NaiveDate>,
}

pub fn create_router(pool: PgPool) -> Router {
    let state = AppState { pool };

    Router::new()
        .route("/api/v1/devices", post(register_device).get(list_devices))
        .route("/api/v1/devices/online", get(count_online))
        .route(
            "/api/v1/devices/:device_id",
            get(get_device).put(rename_device),
        )
        .route("/api/v1/report", post(report_telemetry))
        .route("/api/v1/events", post(submit_event).get(search_events))
        .route("/api/v1/summary/temperature", get(temperature_summary))
        .with_state(state)
}

async fn register_device(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    ApiJson(body): ApiJson<DeviceIdBody>,
) -> Result<Json<ApiResponse<Device>>, AppError> {
    require_label(&body.device_id)?;
    require_user(&state.pool, owner).await?;

    let device = registry::register(&state.pool, owner, &body.device_id).await?;
    Ok(Json(ApiResponse::ok(device)))
}

async fn list_devices(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<Json<ApiResponse<Vec<Device>>>, AppError> {
    require_user(&state.pool, owner).await?;

    let devices = registry::list_by_owner(&state.pool, owner).await?;
    Ok(Json(ApiResponse::ok(devices)))
}

async fn count_online(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<Json<ApiResponse<OnlineBreakdown>>, AppError> {
    require_user(&state.pool, owner).await?;

    let counts = registry::online_breakdown(&state.pool, owner).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

async fn get_device(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(device_id): Path<String>,
) -> Result<Json<ApiResponse<Device>>, AppError> {
    require_label(&device_id)?;
    require_user(&state.pool, owner).await?;

    let device = registry::get_by_label(&state.pool, owner, &device_id).await?;
    Ok(Json(ApiResponse::ok(device)))
}

async fn rename_device(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    Path(device_db_id): Path<String>,
    ApiJson(body): ApiJson<DeviceIdBody>,
) -> Result<Json<ApiResponse<Device>>, AppError> {
    require_label(&body.device_id)?;
    let device_db_id = Uuid::parse_str(&device_db_id)
        .map_err(|_| Error::Validation("Invalid Device DB ID!".to_string()))?;
    require_user(&state.pool, owner).await?;

    let device = registry::rename(&state.pool, owner, device_db_id, &body.device_id).await?;
    Ok(Json(ApiResponse::ok(device)))
}

async fn report_telemetry(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> Result<Json<ApiResponse<Device>>, AppError> {
    REPORTS_TOTAL.inc();
    let started = Instant::now();

    if let Err(e) = require_label(&req.device_id) {
        REPORTS_REJECTED_TOTAL.inc();
        return Err(AppError(e));
    }

    let result = ingest::report(&state.pool, &req).await;
    REPORT_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

    match result {
        Ok(device) => Ok(Json(ApiResponse::ok(device))),
        Err(e) => {
            REPORTS_REJECTED_TOTAL.inc();
            Err(AppError(e))
        }
    }
}

async fn submit_event(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SubmitRequest>,
) -> Result<Json<ApiResponse<SubmittedEvent>>, AppError> {
    require_label(&req.device_id)?;

    let saved = events::submit(&state.pool, &req).await?;
    EVENTS_APPENDED_TOTAL.inc();

    Ok(Json(ApiResponse::ok_with_message(
        "Event data successfully saved",
        saved,
    )))
}

async fn search_events(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
    ApiQuery(params): ApiQuery<EventSearchQuery>,
) -> Result<Json<ApiResponse<Vec<EventHit>>>, AppError> {
    let device_id = device_filter(params.device_id.as_deref());

    let hits = events::search(
        &state.pool,
        owner,
        device_id,
        params.start_date,
        params.end_date,
    )
    .await?;
    Ok(Json(ApiResponse::ok(hits)))
}

async fn temperature_summary(
    State(state): State<AppState>,
    OwnerIdentity(owner): OwnerIdentity,
) -> Result<Json<ApiResponse<Vec<DeviceSeries>>>, AppError> {
    let series = summary::hourly_temperature(&state.pool, owner).await?;
    Ok(Json(ApiResponse::ok(series)))
}

/// Error wrapper that renders the failure envelope. Storage errors are
/// logged and collapsed to a generic message so internal detail never
/// reaches a client.
#[derive(Debug)]
pub struct AppError(pub Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self.0 {
            Error::Database(e) => {
                error!("Database error: {}", e);
                DB_FAILURES_TOTAL.inc();
                "Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::<()>::fail(message))).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// [`Json`] with the rejection rendered through the failure envelope, so a
/// malformed or mistyped body gets the same response shape as every other
/// failure instead of axum's plain-text default.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err((
                rejection.status(),
                Json(ApiResponse::<()>::fail(rejection.body_text())),
            )
                .into_response()),
        }
    }
}

/// [`Query`] counterpart of [`ApiJson`] for unparseable query strings.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err((
                rejection.status(),
                Json(ApiResponse::<()>::fail(rejection.body_text())),
            )
                .into_response()),
        }
    }
}
