// State management module
// Shared request-handler state

pub mod app_state;

pub use app_state::AppState;
