//! Parley Core - Chat orchestration
//!
//! Shared logic behind every Parley frontend: configuration, prompt
//! templates, the LLM provider seam, and the per-conversation
//! [`ChatSession`] that keeps turn ordering honest.

pub mod config;
pub mod llm;
pub mod prompts;
pub mod session;

pub use config::ChatConfig;
pub use llm::{EchoProvider, GeminiProvider, LlmError, LlmProvider};
pub use prompts::{DocumentKind, PromptBuilder};
pub use session::{
    extract_document, AttachedDocument, ChatSession, SessionStatus, TurnEvent, TurnReply,
};

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Memory error: {0}")]
    Memory(#[from] parley_memory::MemoryError),

    #[error("Document error: {0}")]
    Document(#[from] parley_document::DocumentError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
