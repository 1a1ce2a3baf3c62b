//! Assistant API wire types
//!
//! Structs that mirror the JSON bodies of the threads / messages / runs
//! endpoints. Message listings are kept as raw JSON and interpreted by the
//! answer extractor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Thread object returned by create-thread
#[derive(Deserialize, Debug, Clone)]
pub struct ThreadObject {
    /// Opaque thread identifier
    pub id: String,
}

/// Body of add-message
#[derive(Serialize, Debug)]
pub struct CreateMessageRequest<'a> {
    /// Always "user" for widget messages
    pub role: &'a str,
    /// Message text
    pub content: &'a str,
}

/// Body of create-run
#[derive(Serialize, Debug)]
pub struct CreateRunRequest<'a> {
    /// Assistant that processes the thread
    pub assistant_id: &'a str,
}

/// Run object returned by create-run and get-run
#[derive(Deserialize, Debug, Clone)]
pub struct RunObject {
    /// Opaque run identifier
    pub id: String,
    /// Current status; absent on some create responses
    #[serde(default)]
    pub status: Option<RunStatus>,
    /// Failure payload reported by the upstream
    #[serde(default)]
    pub last_error: Option<Value>,
}

/// Upstream run status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    /// Waiting to be picked up
    Queued,
    /// Being processed
    InProgress,
    /// Waiting for tool outputs
    RequiresAction,
    /// Cancellation requested
    Cancelling,
    /// Cancelled
    Cancelled,
    /// Failed
    Failed,
    /// Finished successfully
    Completed,
    /// Ended early (e.g. token limit)
    Incomplete,
    /// Expired before finishing
    Expired,
    /// Status not known to this client
    Other(String),
}

impl RunStatus {
    /// Convert the status to its wire representation
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Other(s) => s,
        }
    }

    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }

    /// Terminal and not completed
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != RunStatus::Completed
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "cancelling" => RunStatus::Cancelling,
            "cancelled" => RunStatus::Cancelled,
            "failed" => RunStatus::Failed,
            "completed" => RunStatus::Completed,
            "incomplete" => RunStatus::Incomplete,
            "expired" => RunStatus::Expired,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
