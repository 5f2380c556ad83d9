/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nivriti_protocol::ErrorBody;
use tracing::error;

/// HTTP-facing error. Every variant renders as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<nivriti_core::Error> for ApiError {
    fn from(e: nivriti_core::Error) -> Self {
        use nivriti_core::Error as E;
        match e {
            E::NotFound(m) => Self::not_found(m),
            E::Validation(m) => Self::bad_request(m),
            E::Conflict(m) => Self::new(StatusCode::CONFLICT, m),
            E::Unauthorized(_) => Self::unauthenticated(),
            other => {
                error!("request failed: {other}");
                Self::internal()
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("blocking task failed: {e}");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
