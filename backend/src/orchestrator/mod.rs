//! Orchestrator module
//!
//! Drives a chat turn through the upstream assistant service: message
//! submission, run polling and answer extraction.

pub mod error;
pub mod extract;
pub mod run;
#[cfg(test)]
pub(crate) mod testing;

pub use error::ChatError;
pub use extract::{extract_answer, ContentBlock};
pub use run::{ChatOutcome, PollPolicy, Run, RunOrchestrator};
