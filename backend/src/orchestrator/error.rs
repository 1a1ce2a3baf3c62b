//! Orchestration error types
//!
//! Errors that can occur while driving one chat turn through the upstream
//! assistant service.

use crate::assistant::{RunStatus, UpstreamError};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during one chat turn
///
/// Each step of the protocol has its own variant so callers can tell where
/// the turn stopped.
#[derive(Error, Debug)]
pub enum ChatError {
    /// create-thread failed
    #[error("Failed to create thread: {0}")]
    CreateThreadFailed(UpstreamError),

    /// add-message failed
    #[error("Failed to add message: {0}")]
    AddMessageFailed(UpstreamError),

    /// create-run failed
    #[error("Failed to create run: {0}")]
    CreateRunFailed(UpstreamError),

    /// get-run failed while polling
    #[error("Failed to fetch run status: {0}")]
    FetchStatusFailed(UpstreamError),

    /// list-messages failed after the run completed
    #[error("Failed to list messages: {0}")]
    FetchMessagesFailed(UpstreamError),

    /// The upstream reported a terminal failure for the run
    #[error("Assistant run {run_id} ended with status {status}")]
    RunFailed {
        /// Thread the run belongs to
        thread_id: String,
        /// Failed run
        run_id: String,
        /// Terminal status reported by the upstream
        status: RunStatus,
        /// Upstream failure payload
        detail: Option<Value>,
    },

    /// The poll loop gave up before the run completed
    #[error("Assistant run {run_id} did not complete after {attempts} status checks (last status: {last_status})")]
    TimedOut {
        /// Thread the run belongs to
        thread_id: String,
        /// Run that can still be polled out of band
        run_id: String,
        /// Last status observed
        last_status: RunStatus,
        /// Status checks performed
        attempts: u32,
    },

    /// The completed run's messages contain no usable assistant text
    #[error("No assistant answer found in the message list")]
    AnswerNotFound {
        /// The list-messages payload as received
        raw: Value,
    },
}

impl ChatError {
    /// Stable machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::CreateThreadFailed(_) => "create_thread_failed",
            ChatError::AddMessageFailed(_) => "add_message_failed",
            ChatError::CreateRunFailed(_) => "create_run_failed",
            ChatError::FetchStatusFailed(_) => "fetch_status_failed",
            ChatError::FetchMessagesFailed(_) => "fetch_messages_failed",
            ChatError::RunFailed { .. } => "run_failed",
            ChatError::TimedOut { .. } => "timed_out",
            ChatError::AnswerNotFound { .. } => "answer_not_found",
        }
    }

    /// The failed upstream call, for step failures
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            ChatError::CreateThreadFailed(e)
            | ChatError::AddMessageFailed(e)
            | ChatError::CreateRunFailed(e)
            | ChatError::FetchStatusFailed(e)
            | ChatError::FetchMessagesFailed(e) => Some(e),
            ChatError::RunFailed { .. }
            | ChatError::TimedOut { .. }
            | ChatError::AnswerNotFound { .. } => None,
        }
    }
}
