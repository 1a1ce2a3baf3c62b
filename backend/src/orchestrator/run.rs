//! Run orchestration
//!
//! Drives one chat turn: add the user's message to the thread, start a run,
//! poll it at a fixed interval until it reaches a terminal state or the
//! attempt ceiling, then extract the answer.
//!
//! Every step's failure is terminal for the turn. Nothing is retried except
//! re-creating a stale thread that the upstream no longer knows (404 on
//! add-message), where the failed call provably added nothing.

use crate::assistant::{AssistantApi, RunObject, RunStatus};
use crate::config::PollingConfig;
use crate::conversation::{ConversationSession, Message, ThreadId};
use crate::orchestrator::extract::extract_answer;
use crate::orchestrator::ChatError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// When and how long to poll a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed sleep before every status check
    pub interval: Duration,
    /// Maximum number of status checks
    pub max_attempts: u32,
    /// Optional wall-clock budget for the loop
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// Policy with a fixed interval and attempt ceiling, no deadline
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            deadline: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
            deadline: config.deadline(),
        }
    }
}

/// One orchestration attempt, alive for a single poll loop
#[derive(Debug, Clone)]
pub struct Run {
    /// Upstream run identifier
    pub id: String,
    /// Thread the run processes
    pub thread_id: ThreadId,
    status: RunStatus,
    last_error: Option<Value>,
}

impl Run {
    /// Build a run from the create-run response; missing status means queued
    pub fn started(thread_id: ThreadId, created: RunObject) -> Self {
        Self {
            id: created.id,
            thread_id,
            status: created.status.unwrap_or(RunStatus::Queued),
            last_error: created.last_error,
        }
    }

    /// Current status
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Failure payload reported by the upstream
    pub fn last_error(&self) -> Option<&Value> {
        self.last_error.as_ref()
    }

    /// Record a freshly fetched run state
    ///
    /// Once terminal, the status is frozen; later observations are ignored.
    /// Returns whether the observation was applied.
    pub fn observe(&mut self, fetched: RunObject) -> bool {
        if self.status.is_terminal() {
            warn!(
                run_id = %self.id,
                status = %self.status,
                "Ignoring run update after terminal status"
            );
            return false;
        }
        if let Some(status) = fetched.status {
            self.status = status;
        }
        if fetched.last_error.is_some() {
            self.last_error = fetched.last_error;
        }
        true
    }
}

/// Result of a completed chat turn
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The assistant's answer
    pub answer: Message,
    /// Thread the turn ran on (new or reused)
    pub thread_id: ThreadId,
    /// Completed run
    pub run_id: String,
    /// Status checks performed
    pub attempts: u32,
}

/// Drives chat turns against the upstream assistant service
#[derive(Clone)]
pub struct RunOrchestrator {
    api: Arc<dyn AssistantApi>,
    policy: PollPolicy,
}

impl RunOrchestrator {
    /// Create an orchestrator
    pub fn new(api: Arc<dyn AssistantApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Polling policy in use
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Run one full chat turn
    ///
    /// # Arguments
    /// * `session` - Conversation; gets a thread if it has none
    /// * `assistant_id` - Assistant that answers
    /// * `message` - The citizen's question
    ///
    /// # Errors
    /// Any step failure, `RunFailed`, `TimedOut` or `AnswerNotFound`.
    pub async fn ask(
        &self,
        session: &mut ConversationSession,
        assistant_id: &str,
        message: &str,
    ) -> Result<ChatOutcome, ChatError> {
        let thread_id = self.submit_message(session, message).await?;
        let run = self.start_run(&thread_id, assistant_id).await?;
        let (run, attempts) = self.poll_until_complete(run).await?;

        let payload = self
            .api
            .list_messages(&thread_id, Some(&run.id))
            .await
            .map_err(ChatError::FetchMessagesFailed)?;
        let answer = extract_answer(&payload)?;

        info!(
            slug = %session.slug(),
            thread_id = %thread_id,
            run_id = %run.id,
            attempts,
            answer_len = answer.content.len(),
            "Chat turn completed"
        );

        Ok(ChatOutcome {
            answer,
            thread_id,
            run_id: run.id,
            attempts,
        })
    }

    /// Add the user's message to the session's thread
    ///
    /// A widget-supplied thread that the upstream answers with 404 is
    /// replaced by a fresh one.
    pub async fn submit_message(
        &self,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<ThreadId, ChatError> {
        let resumed = session.thread_id().is_some();
        let thread_id = session.ensure_thread(self.api.as_ref()).await?;

        match self.api.add_message(&thread_id, message).await {
            Ok(()) => Ok(thread_id),
            Err(e) if resumed && e.status == Some(404) => {
                warn!(
                    slug = %session.slug(),
                    thread_id = %thread_id,
                    "Stale thread, starting a new conversation"
                );
                session.reset();
                let thread_id = session.ensure_thread(self.api.as_ref()).await?;
                self.api
                    .add_message(&thread_id, message)
                    .await
                    .map_err(ChatError::AddMessageFailed)?;
                Ok(thread_id)
            }
            Err(e) => Err(ChatError::AddMessageFailed(e)),
        }
    }

    /// Start a run of the assistant on the thread
    pub async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ChatError> {
        let created = self
            .api
            .create_run(thread_id, assistant_id)
            .await
            .map_err(ChatError::CreateRunFailed)?;
        let run = Run::started(thread_id.to_string(), created);
        debug!(
            thread_id = %thread_id,
            run_id = %run.id,
            status = %run.status(),
            "Run created"
        );
        Ok(run)
    }

    /// Poll the run until it completes
    ///
    /// Returns the completed run and the number of status checks made.
    ///
    /// # Errors
    /// * `FetchStatusFailed` - a status check failed
    /// * `RunFailed` - the upstream reported a terminal failure
    /// * `TimedOut` - attempt ceiling or deadline reached first
    pub async fn poll_until_complete(&self, mut run: Run) -> Result<(Run, u32), ChatError> {
        let started = Instant::now();
        let mut attempts = 0u32;

        while !run.status().is_terminal() && attempts < self.policy.max_attempts {
            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    debug!(run_id = %run.id, "Poll deadline reached");
                    break;
                }
            }

            tokio::time::sleep(self.policy.interval).await;
            attempts += 1;

            let fetched = self
                .api
                .get_run(&run.thread_id, &run.id)
                .await
                .map_err(ChatError::FetchStatusFailed)?;
            run.observe(fetched);

            debug!(
                run_id = %run.id,
                attempt = attempts,
                status = %run.status(),
                "Polled run status"
            );
        }

        let status = run.status().clone();
        match status {
            RunStatus::Completed => Ok((run, attempts)),
            status if status.is_failure() => {
                warn!(
                    thread_id = %run.thread_id,
                    run_id = %run.id,
                    status = %status,
                    "Assistant run failed"
                );
                Err(ChatError::RunFailed {
                    detail: run.last_error,
                    thread_id: run.thread_id,
                    run_id: run.id,
                    status,
                })
            }
            status => {
                warn!(
                    thread_id = %run.thread_id,
                    run_id = %run.id,
                    status = %status,
                    attempts,
                    "Assistant run timed out"
                );
                Err(ChatError::TimedOut {
                    thread_id: run.thread_id,
                    run_id: run.id,
                    last_status: status,
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testing::ScriptedApi;
    use serde_json::json;

    fn orchestrator(api: &Arc<ScriptedApi>, max_attempts: u32) -> RunOrchestrator {
        RunOrchestrator::new(
            api.clone(),
            PollPolicy::new(Duration::from_millis(10), max_attempts),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_three_polls() {
        let api = Arc::new(ScriptedApi::new(vec![
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ]));
        let mut session = ConversationSession::new("radim");

        let outcome = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Kdy je otevřeno?")
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(api.calls("get_run"), 3);
        assert_eq!(outcome.answer.content, "Hello");
        assert_eq!(outcome.thread_id, "thread_1");
        assert_eq!(session.thread_id(), Some("thread_1"));
        assert_eq!(api.last_assistant_id().as_deref(), Some("asst_123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_terminal_times_out() {
        let api = Arc::new(ScriptedApi::new(vec![RunStatus::InProgress]));
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 3)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        match err {
            ChatError::TimedOut {
                thread_id,
                run_id,
                last_status,
                attempts,
            } => {
                assert_eq!(thread_id, "thread_1");
                assert_eq!(run_id, "run_1");
                assert_eq!(last_status, RunStatus::InProgress);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.calls("get_run"), 3);
        assert_eq!(api.calls("list_messages"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_is_bounded_in_time() {
        let api = Arc::new(ScriptedApi::new(vec![RunStatus::Queued]));
        let orchestrator = RunOrchestrator::new(
            api.clone(),
            PollPolicy::new(Duration::from_millis(900), 5),
        );
        let run = orchestrator.start_run("thread_x", "asst_123").await.unwrap();

        let started = Instant::now();
        let result = orchestrator.poll_until_complete(run).await;

        assert!(matches!(result, Err(ChatError::TimedOut { .. })));
        assert!(started.elapsed() <= Duration::from_millis(900 * 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_polling_early() {
        let api = Arc::new(ScriptedApi::new(vec![RunStatus::Queued]));
        let policy = PollPolicy {
            interval: Duration::from_millis(100),
            max_attempts: 100,
            deadline: Some(Duration::from_millis(250)),
        };
        let orchestrator = RunOrchestrator::new(api.clone(), policy);
        let run = orchestrator.start_run("thread_x", "asst_123").await.unwrap();

        let err = orchestrator.poll_until_complete(run).await.unwrap_err();

        match err {
            ChatError::TimedOut { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_carries_detail() {
        let api = Arc::new(
            ScriptedApi::new(vec![RunStatus::Queued, RunStatus::Failed])
                .with_last_error(json!({"code": "server_error", "message": "Boom"})),
        );
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        match err {
            ChatError::RunFailed { status, detail, .. } => {
                assert_eq!(status, RunStatus::Failed);
                assert_eq!(detail.unwrap()["code"], "server_error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.calls("get_run"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_run_is_a_failure_not_a_timeout() {
        let api = Arc::new(ScriptedApi::new(vec![RunStatus::Queued, RunStatus::Expired]));
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        assert_eq!(err.code(), "run_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_status_failure_is_terminal() {
        let api = Arc::new(
            ScriptedApi::new(vec![RunStatus::Queued, RunStatus::InProgress])
                .fail_get_run(503, "unavailable"),
        );
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        assert_eq!(err.code(), "fetch_status_failed");
        assert_eq!(api.calls("get_run"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_run_failure_short_circuits() {
        let api = Arc::new(ScriptedApi::new(vec![]).fail_create_run(400, "bad assistant"));
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_bad", "Dotaz")
            .await
            .unwrap_err();

        assert_eq!(err.code(), "create_run_failed");
        assert_eq!(api.calls("get_run"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_message_failure_is_not_retried() {
        let api = Arc::new(ScriptedApi::new(vec![]).fail_add_message_once(500, "boom"));
        let mut session = ConversationSession::resume("radim", Some("thread_old".to_string()));

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        assert_eq!(err.code(), "add_message_failed");
        assert_eq!(api.calls("add_message"), 1);
        assert_eq!(api.calls("create_run"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_thread_is_replaced() {
        let api = Arc::new(
            ScriptedApi::new(vec![RunStatus::Queued, RunStatus::Completed])
                .fail_add_message_once(404, "No thread found"),
        );
        let mut session = ConversationSession::resume("radim", Some("thread_old".to_string()));

        let outcome = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap();

        assert_eq!(outcome.thread_id, "thread_1");
        assert_eq!(session.thread_id(), Some("thread_1"));
        assert_eq!(api.calls("create_thread"), 1);
        assert_eq!(api.calls("add_message"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumed_thread_is_reused() {
        let api = Arc::new(ScriptedApi::new(vec![RunStatus::Completed]));
        let mut session = ConversationSession::resume("radim", Some("thread_old".to_string()));

        let outcome = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap();

        assert_eq!(outcome.thread_id, "thread_old");
        assert_eq!(outcome.attempts, 0);
        assert_eq!(api.calls("create_thread"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_answer_is_reported() {
        let api = Arc::new(
            ScriptedApi::new(vec![RunStatus::Completed]).with_messages(json!({"data": []})),
        );
        let mut session = ConversationSession::new("radim");

        let err = orchestrator(&api, 25)
            .ask(&mut session, "asst_123", "Dotaz")
            .await
            .unwrap_err();

        match err {
            ChatError::AnswerNotFound { raw } => assert_eq!(raw, json!({"data": []})),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_status_is_monotonic() {
        let mut run = Run::started(
            "thread_1".to_string(),
            RunObject {
                id: "run_1".to_string(),
                status: None,
                last_error: None,
            },
        );
        assert_eq!(run.status(), &RunStatus::Queued);

        assert!(run.observe(RunObject {
            id: "run_1".to_string(),
            status: Some(RunStatus::Completed),
            last_error: None,
        }));
        assert!(!run.observe(RunObject {
            id: "run_1".to_string(),
            status: Some(RunStatus::InProgress),
            last_error: None,
        }));
        assert_eq!(run.status(), &RunStatus::Completed);
    }

    #[test]
    fn test_policy_from_config() {
        let config = PollingConfig {
            interval_ms: 900,
            max_attempts: 60,
            deadline_ms: Some(30_000),
        };
        let policy = PollPolicy::from(&config);
        assert_eq!(policy.interval, Duration::from_millis(900));
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.deadline, Some(Duration::from_secs(30)));
    }
}
