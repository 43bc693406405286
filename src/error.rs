//! Error taxonomy for feed generation and its HTTP mapping.
//!
//! Only failures that affect a whole response are represented here. Problems
//! local to one record degrade that record instead:
//! - a page with no listing entries yields an empty record list
//! - an unparseable date leaves `pub_date` unset
//! - an unresolvable link drops the record with a logged skip

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// A listing page could not be fetched. The whole invocation fails.
    #[error("fetching page {page} failed{}: {cause}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Fetch {
        page: u32,
        status: Option<u16>,
        cause: String,
    },

    /// Request parameters rejected before any fetch is issued.
    #[error("invalid request: {0}")]
    Config(String),

    #[error("unknown output format: {0}")]
    UnknownFormat(String),

    #[error("no route matches {0}")]
    NoRoute(String),

    #[error("rendering feed failed: {0}")]
    Render(String),
}

impl FeedError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            FeedError::Fetch { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            FeedError::Config(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            FeedError::UnknownFormat(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            FeedError::NoRoute(_) => (StatusCode::NOT_FOUND, "not_found"),
            FeedError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    fn details(&self) -> Value {
        match self {
            FeedError::Fetch { page, status, .. } => json!({ "page": page, "status": status }),
            _ => json!({}),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

impl IntoResponse for FeedError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message: self.to_string(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        FeedError::Render(e.to_string())
    }
}

impl From<std::io::Error> for FeedError {
    fn from(e: std::io::Error) -> Self {
        FeedError::Render(e.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Render(e.to_string())
    }
}
