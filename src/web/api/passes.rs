use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::abort::AbortHandle;
use crate::config::parse_duration;
use crate::predict::{ElementSet, PassRecord, PassRequest, SearchWindow};
use crate::report::{format_passes, to_csv_string, PassReport};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

/// Slack on top of the search deadline before the handler stops waiting.
const JOIN_GRACE: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug, Deserialize, ToSchema)]
pub struct PassesQuery {
    /// Catalog name substring or catalog number
    pub satellite: String,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub step: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadRequest {
    /// Element set text: optional name line plus the two element lines
    pub tle: String,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub step: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PassesResponse {
    pub satellite: String,
    pub timezone: String,
    pub passes: Vec<PassReport>,
}

#[utoipa::path(
    get,
    path = "/api/passes",
    tag = "passes",
    params(
        ("satellite" = String, Query, description = "Catalog name substring or catalog number"),
        ("start" = String, Query, description = "Window start (RFC3339)"),
        ("end" = String, Query, description = "Window end (RFC3339)"),
        ("threshold" = Option<f64>, Query, description = "Elevation threshold (degrees)"),
        ("step" = Option<String>, Query, description = "Coarse step, e.g. 10s")
    ),
    responses(
        (status = 200, description = "Passes in the window", body = PassesResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Satellite not in catalog", body = ErrorResponse),
        (status = 503, description = "No catalog configured", body = ErrorResponse),
        (status = 504, description = "Search exceeded the request timeout", body = ErrorResponse)
    )
)]
pub async fn get_passes(
    State(state): State<AppState>,
    Query(query): Query<PassesQuery>,
) -> ApiResult<Json<PassesResponse>> {
    let element_set = resolve_satellite(&state, &query.satellite)?;
    let request = build_request(
        &state,
        element_set,
        query.start,
        query.end,
        query.threshold,
        query.step.as_deref(),
    )?;
    respond(&state, request).await
}

#[utoipa::path(
    post,
    path = "/api/passes",
    tag = "passes",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Passes in the window", body = PassesResponse),
        (status = 400, description = "Malformed element set or parameters", body = ErrorResponse),
        (status = 504, description = "Search exceeded the request timeout", body = ErrorResponse)
    )
)]
pub async fn post_passes(
    State(state): State<AppState>,
    Json(body): Json<UploadRequest>,
) -> ApiResult<Json<PassesResponse>> {
    let element_set = ElementSet::from_upload("upload", &body.tle)?;
    let request = build_request(
        &state,
        element_set,
        body.start,
        body.end,
        body.threshold,
        body.step.as_deref(),
    )?;
    respond(&state, request).await
}

#[utoipa::path(
    get,
    path = "/api/passes.csv",
    tag = "passes",
    params(
        ("satellite" = String, Query, description = "Catalog name substring or catalog number"),
        ("start" = String, Query, description = "Window start (RFC3339)"),
        ("end" = String, Query, description = "Window end (RFC3339)"),
        ("threshold" = Option<f64>, Query, description = "Elevation threshold (degrees)"),
        ("step" = Option<String>, Query, description = "Coarse step, e.g. 10s")
    ),
    responses(
        (status = 200, description = "Pass table as CSV", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Satellite not in catalog", body = ErrorResponse),
        (status = 504, description = "Search exceeded the request timeout", body = ErrorResponse)
    )
)]
pub async fn get_passes_csv(
    State(state): State<AppState>,
    Query(query): Query<PassesQuery>,
) -> ApiResult<impl IntoResponse> {
    let element_set = resolve_satellite(&state, &query.satellite)?;
    let request = build_request(
        &state,
        element_set,
        query.start,
        query.end,
        query.threshold,
        query.step.as_deref(),
    )?;
    let timezone = request.options.timezone;
    let records = run_request(&state, request).await?;
    let body = to_csv_string(&format_passes(&records, timezone))?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}

fn resolve_satellite(state: &AppState, query: &str) -> ApiResult<ElementSet> {
    let catalog = state
        .catalog
        .as_ref()
        .ok_or(ApiError::NotConfigured("no element set catalog configured"))?;
    Ok(catalog.find(query)?.clone())
}

fn build_request(
    state: &AppState,
    element_set: ElementSet,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    threshold: Option<f64>,
    step: Option<&str>,
) -> ApiResult<PassRequest> {
    let mut options = state.config.search_options();
    if let Some(threshold) = threshold {
        options.threshold_deg = threshold;
    }
    if let Some(step) = step {
        options.step = parse_duration(step).map_err(ApiError::Validation)?;
    }
    options.validate()?;

    Ok(PassRequest {
        observer: state.observer,
        element_set,
        window: SearchWindow::new(start, end)?,
        options,
    })
}

async fn respond(state: &AppState, request: PassRequest) -> ApiResult<Json<PassesResponse>> {
    let satellite = request.element_set.name.clone();
    let timezone = request.options.timezone;
    let records = run_request(state, request).await?;
    Ok(Json(PassesResponse {
        satellite,
        timezone: timezone.to_string(),
        passes: records
            .iter()
            .map(|r| PassReport::new(r, timezone))
            .collect(),
    }))
}

/// Runs the search on the blocking pool with a deadline of
/// `web.request_timeout`.
async fn run_request(state: &AppState, request: PassRequest) -> ApiResult<Vec<PassRecord>> {
    let timeout = state
        .config
        .web
        .request_timeout
        .to_std()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let mut abort = AbortHandle::new();
    if let Some(deadline) = Instant::now().checked_add(timeout) {
        abort = abort.with_deadline(deadline);
    }
    let task_abort = abort.clone();
    let task = tokio::task::spawn_blocking(move || request.run(&task_abort));

    match tokio::time::timeout(timeout.saturating_add(JOIN_GRACE), task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(e)) => Err(ApiError::Internal(e.to_string())),
        Err(_) => {
            abort.abort();
            Err(ApiError::Timeout)
        }
    }
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
