//! Error types and error handling for the application
//!
//! `AppError` is the only error that reaches the HTTP boundary. It turns
//! registry and orchestration failures into JSON responses with a user-safe
//! message, a stable `code`, and the upstream detail operators need.

use crate::orchestrator::ChatError;
use crate::registry::RegistryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Shown to citizens when the assistant's answer cannot be read
pub const ANSWER_UNAVAILABLE_MESSAGE: &str = "Omlouvám se, odpověď se nepodařilo získat.";

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The endpoint does not accept the request method
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The request body or parameters are invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials or assistant identity are missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tenant lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A chat turn failed
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Configuration(_) => "configuration_error",
            AppError::Registry(RegistryError::NotFound(_)) => "tenant_not_found",
            AppError::Registry(RegistryError::Unavailable(_)) => "registry_unavailable",
            AppError::Chat(e) => e.code(),
            AppError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Registry(RegistryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Chat(ChatError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Chat(ChatError::AnswerNotFound { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let code = self.code();
        match self {
            AppError::Registry(RegistryError::NotFound(slug)) => json!({
                "ok": false,
                "error": format!("Obec \"{}\" není v registry", slug),
                "code": code,
                "slug": slug,
            }),
            AppError::Chat(ChatError::TimedOut {
                thread_id,
                run_id,
                last_status,
                ..
            }) => json!({
                "ok": false,
                "error": "Assistant did not answer in time",
                "code": code,
                "status": last_status,
                "thread_id": thread_id,
                "run_id": run_id,
            }),
            AppError::Chat(ChatError::RunFailed {
                thread_id,
                run_id,
                status,
                detail,
            }) => json!({
                "ok": false,
                "error": "Assistant run failed",
                "code": code,
                "status": status,
                "details": detail,
                "thread_id": thread_id,
                "run_id": run_id,
            }),
            AppError::Chat(ChatError::AnswerNotFound { raw }) => json!({
                "ok": false,
                "error": ANSWER_UNAVAILABLE_MESSAGE,
                "code": code,
                "details": raw,
            }),
            AppError::Chat(e) => {
                let upstream = e.upstream();
                json!({
                    "ok": false,
                    "error": chat_step_message(e),
                    "code": code,
                    "status": upstream.and_then(|u| u.status),
                    "details": upstream.map(|u| upstream_details(&u.body)),
                })
            }
            AppError::MethodNotAllowed
            | AppError::InvalidRequest(_)
            | AppError::Configuration(_)
            | AppError::Registry(RegistryError::Unavailable(_))
            | AppError::Internal(_) => json!({
                "ok": false,
                "error": self.to_string(),
                "code": code,
            }),
        }
    }
}

fn chat_step_message(error: &ChatError) -> &'static str {
    match error {
        ChatError::CreateThreadFailed(_) => "Failed to start a conversation",
        ChatError::AddMessageFailed(_) => "Failed to send the message",
        ChatError::CreateRunFailed(_) => "Failed to start the assistant",
        ChatError::FetchStatusFailed(_) => "Failed to check the assistant's progress",
        ChatError::FetchMessagesFailed(_) => "Failed to read the assistant's answer",
        ChatError::RunFailed { .. } => "Assistant run failed",
        ChatError::TimedOut { .. } => "Assistant did not answer in time",
        ChatError::AnswerNotFound { .. } => ANSWER_UNAVAILABLE_MESSAGE,
    }
}

/// Upstream bodies are usually JSON; keep them structured when they are
fn upstream_details(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}
