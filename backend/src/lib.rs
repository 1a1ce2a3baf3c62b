//! Municipal Chat Backend Library
//!
//! Answers citizen questions from a municipality website widget using a
//! hosted assistant, one assistant per municipality.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod assistant;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
/// Tenant registry: slug → municipality configuration
pub mod registry;
pub mod state;
