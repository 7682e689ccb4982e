//! Parley Memory - Bounded conversation history
//!
//! Keeps a fixed-size window of the most recent user/assistant messages
//! for one chat session and renders it as the "recent history" section
//! of a model prompt. Purely in-memory: nothing here touches disk or network.

mod format;
mod message;
mod store;

pub use format::{format_for_prompt, format_messages, HISTORY_HEADER};
pub use message::{Message, MessageRecord, Role};
pub use store::{ConversationStore, MemoryStats, DEFAULT_CAPACITY};

/// Errors from memory operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Role must be either 'user' or 'assistant', got '{0}'")]
    InvalidRole(String),

    #[error("Invalid restore input at entry {index}: {reason}")]
    InvalidRestoreInput { index: usize, reason: String },

    #[error("Capacity must be at least 1")]
    InvalidCapacity,
}

pub type Result<T> = std::result::Result<T, MemoryError>;
