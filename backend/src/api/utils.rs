//! API utility functions
//!
//! Request validation and slug selection shared by the handlers.

use crate::error::AppError;
use crate::registry::normalize_slug;
use serde::Deserialize;

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 4_000;

/// Slug query parameters (`?obec=` or `?slug=`)
#[derive(Debug, Default, Deserialize)]
pub struct SlugQuery {
    /// Municipality slug, widget spelling
    #[serde(default)]
    pub obec: Option<String>,
    /// Municipality slug
    #[serde(default)]
    pub slug: Option<String>,
}

/// Validate a chat message and return it trimmed
///
/// # Returns
/// * `Ok(&str)` - Message is valid
/// * `Err(AppError)` - Message is missing, empty or too long
pub fn validate_message(message: Option<&str>) -> Result<&str, AppError> {
    let trimmed = message.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest("Missing message".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(trimmed)
}

/// Pick the first non-empty slug among the channels, in priority order
///
/// Falls back to `default_slug` when no channel supplies one.
pub fn select_slug<'a, I>(channels: I, default_slug: &str) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    channels
        .into_iter()
        .flatten()
        .map(normalize_slug)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| normalize_slug(default_slug))
}
