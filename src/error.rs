use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{Level, log};
use std::fmt;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Endpoint-boundary failure. The message is what the client sees; the
/// cause is only logged.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("{message}")]
    NotFound { message: &'static str, what: String },

    /// The request body or query could not be decoded.
    #[error("{message}")]
    Rejected { message: &'static str, detail: String },
}

impl AppError {
    /// `map_err` adapter tagging a store failure with its client message.
    pub fn store(message: &'static str) -> impl FnOnce(GatewayError) -> AppError {
        move |source| AppError::Store { message, source }
    }

    /// `map_err` adapter for extractor rejections.
    pub fn rejected<E: fmt::Display>(message: &'static str) -> impl FnOnce(E) -> AppError {
        move |rejection| AppError::Rejected {
            message,
            detail: rejection.to_string(),
        }
    }

    /// Store faults are errors; negatives and bad input are warnings.
    pub fn log_level(&self) -> Level {
        match self {
            AppError::Store { .. } => Level::Error,
            AppError::NotFound { .. } | AppError::Rejected { .. } => Level::Warn,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let level = self.log_level();
        match &self {
            AppError::Store { message, source } => log!(level, "{message} {source}"),
            AppError::NotFound { message, what } => log!(level, "{message} Not found: {what}"),
            AppError::Rejected { message, detail } => log!(level, "{message} Bad request: {detail}"),
        }

        api_error(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
    }
}

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}
