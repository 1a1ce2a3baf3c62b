//! Answer extraction
//!
//! Locates the assistant's answer in a list-messages payload. Selection is
//! first-match, so the same payload always yields the same answer.

use crate::conversation::Message;
use crate::orchestrator::ChatError;
use serde_json::{Map, Value};

/// A message content block, classified by what it can contribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Block typed as `text` with printable content
    Text(String),
    /// Any other block exposing printable text
    Fragment(String),
    /// Nothing usable (images, files, empty text)
    Opaque,
}

impl ContentBlock {
    /// Classify one raw content block
    pub fn classify(block: &Value) -> Self {
        match block {
            Value::String(s) => Self::printable(s).map_or(Self::Opaque, Self::Fragment),
            Value::Object(map) => Self::classify_object(map),
            _ => Self::Opaque,
        }
    }

    fn classify_object(map: &Map<String, Value>) -> Self {
        let typed_text = map.get("type").and_then(Value::as_str) == Some("text");
        let text = map
            .get("text")
            .and_then(string_or_value)
            .or_else(|| map.get("value").and_then(Value::as_str))
            .and_then(Self::printable);

        match (typed_text, text) {
            (true, Some(text)) => Self::Text(text),
            (false, Some(text)) => Self::Fragment(text),
            (_, None) => Self::Opaque,
        }
    }

    fn printable(s: &str) -> Option<String> {
        if s.chars().all(|c| c.is_whitespace() || c.is_control()) {
            None
        } else {
            Some(s.to_string())
        }
    }
}

/// `"..."` or `{ "value": "..." }`
fn string_or_value(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("value").and_then(Value::as_str),
        _ => None,
    }
}

/// Messages of a list payload: `{ "data": [...] }` or a bare array
fn message_list(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Extract the assistant's answer from a list-messages payload
///
/// Takes the first message with role `assistant`. Within it, the first
/// text-typed block wins; otherwise all other printable blocks are joined
/// line by line.
///
/// # Errors
/// * `ChatError::AnswerNotFound` - no assistant message, or it carries no
///   usable text; the payload is attached for diagnosis
pub fn extract_answer(payload: &Value) -> Result<Message, ChatError> {
    let not_found = || ChatError::AnswerNotFound {
        raw: payload.clone(),
    };

    let message = message_list(payload)
        .iter()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
        .ok_or_else(not_found)?;

    let blocks: Vec<ContentBlock> = match message.get("content") {
        Some(Value::Array(items)) => items.iter().map(ContentBlock::classify).collect(),
        Some(other) => vec![ContentBlock::classify(other)],
        None => Vec::new(),
    };

    let mut fragments = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text(text) => return Ok(Message::assistant(text)),
            ContentBlock::Fragment(text) => fragments.push(text),
            ContentBlock::Opaque => {}
        }
    }

    if fragments.is_empty() {
        return Err(not_found());
    }
    Ok(Message::assistant(fragments.join("\n")))
}
