//! Conversation module
//!
//! Tracks which upstream thread a widget conversation belongs to.

pub mod message;
pub mod session;

pub use message::{Message, MessageRole};
pub use session::{ConversationSession, ThreadId};
