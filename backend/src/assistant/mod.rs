//! Upstream assistant service
//!
//! Typed client for the hosted assistant API used to answer citizen
//! questions.

pub mod api_client;
pub mod types;

pub use api_client::{AssistantApi, OpenAiClient, UpstreamError};
pub use types::{RunObject, RunStatus};
