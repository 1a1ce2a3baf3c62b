//! Conversation session
//!
//! Correlates one widget (slug + browser) with an upstream thread. The
//! server keeps no session state; the widget echoes the thread id back on
//! every turn.

use crate::assistant::AssistantApi;
use crate::orchestrator::ChatError;
use tracing::info;

/// Upstream thread identifier, opaque to this service
pub type ThreadId = String;

/// A widget's conversation with one municipality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    slug: String,
    thread_id: Option<ThreadId>,
}

impl ConversationSession {
    /// Start a conversation that has no thread yet
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            thread_id: None,
        }
    }

    /// Resume a conversation from a thread id supplied by the widget
    ///
    /// Blank ids are treated as absent.
    pub fn resume(slug: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            slug: slug.into(),
            thread_id: thread_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }

    /// Slug the session is bound to
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Current thread id, if one exists
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Drop the thread id so the next `ensure_thread` creates a new one
    pub fn reset(&mut self) {
        self.thread_id = None;
    }

    /// Return the session's thread, creating it upstream if needed
    ///
    /// # Errors
    /// * `ChatError::CreateThreadFailed` - create-thread failed; the session
    ///   is left without a thread
    pub async fn ensure_thread(&mut self, api: &dyn AssistantApi) -> Result<ThreadId, ChatError> {
        if let Some(thread_id) = &self.thread_id {
            return Ok(thread_id.clone());
        }

        let thread_id = api
            .create_thread()
            .await
            .map_err(ChatError::CreateThreadFailed)?;

        info!(slug = %self.slug, thread_id = %thread_id, "Created conversation thread");
        self.thread_id = Some(thread_id.clone());
        Ok(thread_id)
    }
}
