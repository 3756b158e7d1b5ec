//! Response envelope of the compliance API
//!
//! ```json
//! { "data": { ... }, "meta": { "standard": "IEEE 519-2022", "api_version": "1", "generated_at": "...", "elapsed_ms": 12 } }
//! { "error": { "code": "MISSING_WORKSHEET", "message": "...", "worksheet": "Trend" }, "meta": { ... } }
//! ```
//!
//! Handlers return `Result<Envelope<T>, ApiError>`. Both sides implement
//! `IntoResponse`, and the HTTP status follows from the [`ErrorCode`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::time::Instant;
use tracing::{error, warn};

use crate::analysis::AnalysisError;

/// API version reported in every response
pub const API_VERSION: &str = "1";
/// Standard every verdict is evaluated against
pub const STANDARD: &str = "IEEE 519-2022";

const INTERNAL_MESSAGE: &str = "Analysis failed due to an internal error";

// ============================================================================
// Metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMeta {
    pub standard: &'static str,
    pub api_version: &'static str,
    pub generated_at: String,
    /// Engine time, present on analysis responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            standard: STANDARD,
            api_version: API_VERSION,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            elapsed_ms: None,
        }
    }

    fn since(started: Instant) -> Self {
        Self {
            elapsed_ms: Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)),
            ..Self::now()
        }
    }
}

// ============================================================================
// Success
// ============================================================================

/// Successful payload plus metadata, always 200
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::now(),
        }
    }

    /// Envelope carrying the time spent since `started`
    pub fn timed(data: T, started: Instant) -> Self {
        Self {
            data,
            meta: ResponseMeta::since(started),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Machine-readable failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required worksheet is absent from the request
    MissingWorksheet,
    /// Query parameters missing or not numeric
    InvalidParameters,
    /// Body is not a valid analyze request
    MalformedBody,
    /// Body exceeds `server.max_body_bytes`
    PayloadTooLarge,
    /// Engine worker failed; details stay in the server log
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::MissingWorksheet | ErrorCode::InvalidParameters | ErrorCode::MalformedBody => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Worksheet named by a `MISSING_WORKSHEET` error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            worksheet: None,
        }
    }

    /// Opaque internal error; `cause` is logged and never sent to the client
    pub fn internal(cause: &dyn Display) -> Self {
        error!(error = %cause, "Analysis worker failed");
        Self::new(ErrorCode::Internal, INTERNAL_MESSAGE)
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let message = err.to_string();
        match err {
            AnalysisError::MissingTable(worksheet) => Self {
                code: ErrorCode::MissingWorksheet,
                message,
                worksheet: Some(worksheet),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "Rejected analyze body");
        let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ErrorCode::PayloadTooLarge
        } else {
            ErrorCode::MalformedBody
        };
        Self::new(code, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(ErrorCode::InvalidParameters, rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ApiError,
    meta: ResponseMeta,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        let body = ErrorBody {
            error: self,
            meta: ResponseMeta::now(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn json_of(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_envelope_carries_standard() {
        let resp = Envelope::new(serde_json::json!({"thdv_percent": 2.1})).into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json_of(resp).await;
        assert_eq!(v["data"]["thdv_percent"], 2.1);
        assert_eq!(v["meta"]["standard"], "IEEE 519-2022");
        assert_eq!(v["meta"]["api_version"], "1");
        assert!(v["meta"].get("elapsed_ms").is_none());
    }

    #[tokio::test]
    async fn test_timed_envelope_reports_elapsed() {
        let v = json_of(Envelope::timed(1, Instant::now()).into_response()).await;
        assert!(v["meta"]["elapsed_ms"].is_u64());
    }

    #[tokio::test]
    async fn test_missing_table_maps_to_missing_worksheet() {
        let err = ApiError::from(AnalysisError::MissingTable("Trend".to_string()));
        assert_eq!(err.code, ErrorCode::MissingWorksheet);
        assert_eq!(err.worksheet.as_deref(), Some("Trend"));

        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = json_of(resp).await;
        assert_eq!(v["error"]["code"], "MISSING_WORKSHEET");
        assert_eq!(v["error"]["message"], "Required worksheet 'Trend' not found");
        assert_eq!(v["error"]["worksheet"], "Trend");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let resp = ApiError::internal(&"thread panicked at evaluator.rs").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v = json_of(resp).await;
        assert_eq!(v["error"]["code"], "INTERNAL");
        assert_eq!(v["error"]["message"], INTERNAL_MESSAGE);
        assert!(v["error"].get("worksheet").is_none());
    }

    #[test]
    fn test_status_per_code() {
        assert_eq!(ErrorCode::InvalidParameters.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MalformedBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
