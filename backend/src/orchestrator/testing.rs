//! Scripted in-memory assistant API for unit tests

use crate::assistant::{AssistantApi, RunObject, RunStatus, UpstreamError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Plays back a fixed status sequence
///
/// The first status answers create-run, the following ones answer get-run
/// in order; the last one repeats forever.
pub(crate) struct ScriptedApi {
    statuses: Mutex<VecDeque<RunStatus>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_assistant_id: Mutex<Option<String>>,
    add_message_failures: Mutex<VecDeque<UpstreamError>>,
    create_thread_error: Option<UpstreamError>,
    create_run_error: Option<UpstreamError>,
    get_run_error: Option<UpstreamError>,
    last_error: Option<Value>,
    messages: Value,
}

impl ScriptedApi {
    pub(crate) fn new(statuses: Vec<RunStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            calls: Mutex::new(HashMap::new()),
            last_assistant_id: Mutex::new(None),
            add_message_failures: Mutex::new(VecDeque::new()),
            create_thread_error: None,
            create_run_error: None,
            get_run_error: None,
            last_error: None,
            messages: json!({"object": "list", "data": [
                {"role": "assistant", "content": [{"type": "text", "text": {"value": "Hello"}}]}
            ]}),
        }
    }

    pub(crate) fn fail_create_thread(mut self, status: u16, body: &str) -> Self {
        self.create_thread_error = Some(UpstreamError::http(status, body));
        self
    }

    pub(crate) fn fail_add_message_once(self, status: u16, body: &str) -> Self {
        self.add_message_failures
            .lock()
            .unwrap()
            .push_back(UpstreamError::http(status, body));
        self
    }

    pub(crate) fn fail_create_run(mut self, status: u16, body: &str) -> Self {
        self.create_run_error = Some(UpstreamError::http(status, body));
        self
    }

    pub(crate) fn fail_get_run(mut self, status: u16, body: &str) -> Self {
        self.get_run_error = Some(UpstreamError::http(status, body));
        self
    }

    pub(crate) fn with_last_error(mut self, last_error: Value) -> Self {
        self.last_error = Some(last_error);
        self
    }

    pub(crate) fn with_messages(mut self, messages: Value) -> Self {
        self.messages = messages;
        self
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn last_assistant_id(&self) -> Option<String> {
        self.last_assistant_id.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> usize {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(operation).or_insert(0);
        *count += 1;
        *count
    }

    fn next_status(&self) -> Option<RunStatus> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        }
    }

    fn run_object(&self, status: Option<RunStatus>) -> RunObject {
        let last_error = match &status {
            Some(s) if s.is_failure() => self.last_error.clone(),
            _ => None,
        };
        RunObject {
            id: "run_1".to_string(),
            status,
            last_error,
        }
    }
}

#[async_trait]
impl AssistantApi for ScriptedApi {
    async fn create_thread(&self) -> Result<String, UpstreamError> {
        let count = self.record("create_thread");
        match &self.create_thread_error {
            Some(e) => Err(e.clone()),
            None => Ok(format!("thread_{}", count)),
        }
    }

    async fn add_message(&self, _thread_id: &str, _content: &str) -> Result<(), UpstreamError> {
        self.record("add_message");
        match self.add_message_failures.lock().unwrap().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunObject, UpstreamError> {
        self.record("create_run");
        *self.last_assistant_id.lock().unwrap() = Some(assistant_id.to_string());
        if let Some(e) = &self.create_run_error {
            return Err(e.clone());
        }
        Ok(self.run_object(self.next_status()))
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<RunObject, UpstreamError> {
        self.record("get_run");
        if let Some(e) = &self.get_run_error {
            return Err(e.clone());
        }
        Ok(self.run_object(self.next_status()))
    }

    async fn list_messages(
        &self,
        _thread_id: &str,
        _run_id: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        self.record("list_messages");
        Ok(self.messages.clone())
    }
}
