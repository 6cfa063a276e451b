use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::PredictError;
use crate::report::ReportError;

#[derive(Debug)]
pub enum ApiError {
    Predict(PredictError),
    Validation(String),
    NotConfigured(&'static str),
    Report(ReportError),
    Timeout,
    Internal(String),
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        ApiError::Predict(e)
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        ApiError::Report(e)
    }
}

fn predict_status(e: &PredictError) -> (StatusCode, &'static str) {
    match e {
        PredictError::ElementSetNotFound { .. } => (StatusCode::NOT_FOUND, "element_set_not_found"),
        PredictError::MalformedElementSet { .. } => {
            (StatusCode::BAD_REQUEST, "malformed_element_set")
        }
        PredictError::InvalidObserver(_)
        | PredictError::InvalidWindow { .. }
        | PredictError::InvalidOptions(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        PredictError::Cancelled { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        PredictError::NoCrossingFound { .. }
        | PredictError::Propagation { .. }
        | PredictError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "prediction_failed"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Predict(e) => {
                let (status, error) = predict_status(&e);
                if status.is_server_error() {
                    log::error!("Prediction failed: {}", e);
                }
                (
                    status,
                    Json(ErrorResponse::with_message(error, &e.to_string())),
                )
                    .into_response()
            }
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::NotConfigured(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::with_message("not_configured", what)),
            )
                .into_response(),
            ApiError::Report(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_message("report_error", &e.to_string())),
            )
                .into_response(),
            ApiError::Timeout => {
                (StatusCode::GATEWAY_TIMEOUT, Json(ErrorResponse::new("timeout"))).into_response()
            }
            ApiError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("internal_error")),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::Direction;
    use chrono::{Duration, TimeZone, Utc};

    fn status_of(e: PredictError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_predict_error_status_mapping() {
        let at = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        assert_eq!(
            status_of(PredictError::ElementSetNotFound { query: "X".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PredictError::InvalidWindow { start: at, end: at }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PredictError::InvalidOptions("step".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PredictError::Cancelled { at }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(PredictError::NoCrossingFound {
                direction: Direction::Falling,
                from: at,
                horizon: Duration::days(2),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
