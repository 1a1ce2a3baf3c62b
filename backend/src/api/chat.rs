//! Chat API
//!
//! The widget's chat endpoint. Flow: validate message -> resolve tenant ->
//! get or create thread -> add message, run, poll -> extract answer.

use crate::api::utils::{select_slug, validate_message, SlugQuery};
use crate::conversation::ConversationSession;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Chat request sent by the widget
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The citizen's question
    #[serde(default)]
    pub message: Option<String>,
    /// Thread from a previous turn, if the widget has one
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Municipality slug, widget spelling
    #[serde(default)]
    pub obec: Option<String>,
    /// Municipality slug
    #[serde(default)]
    pub slug: Option<String>,
}

/// Successful chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Always `true`
    pub ok: bool,
    /// The assistant's answer
    pub answer: String,
    /// Thread to send with the next turn
    pub thread_id: String,
    /// Municipality that answered
    pub slug: String,
    /// Assistant that answered
    pub assistant_id: String,
}

/// POST /api/chat - Answer one citizen question
pub async fn chat(
    State(state): State<AppState>,
    query: Result<Query<SlugQuery>, QueryRejection>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let message = validate_message(request.message.as_deref())?;
    let orchestrator = state.orchestrator()?;

    let slug = select_slug(
        [
            request.obec.as_deref(),
            request.slug.as_deref(),
            query.obec.as_deref(),
            query.slug.as_deref(),
        ],
        &state.config.registry.default_slug,
    );
    let tenant = state.resolver.resolve(&slug)?;

    let assistant_id = tenant
        .assistant_id()
        .or(state.config.upstream.default_assistant_id.as_deref())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "No assistant configured for municipality \"{}\"",
                tenant.slug
            ))
        })?;

    info!(
        slug = %tenant.slug,
        has_thread = request.thread_id.is_some(),
        message_len = message.len(),
        "Chat request received"
    );

    let mut session = ConversationSession::resume(&tenant.slug, request.thread_id);
    let outcome = orchestrator.ask(&mut session, &assistant_id, message).await?;

    Ok(Json(ChatResponse {
        ok: true,
        answer: outcome.answer.content,
        thread_id: outcome.thread_id,
        slug: tenant.slug,
        assistant_id,
    }))
}

/// Any other method on the chat endpoint
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
