//! Chat session orchestration
//!
//! One [`ChatSession`] per conversation. A turn reads the history *before*
//! calling the model and records the user message and the reply only
//! *after* the call returns, so the prompt never contains the turn that is
//! currently being answered.

use crate::llm::LlmProvider;
use crate::prompts::{DocumentKind, PromptBuilder, SYSTEM_PROMPT};
use crate::{ChatConfig, Result};
use parley_document::{DocumentSource, Extraction, Extractor};
use parley_memory::{format_for_prompt, ConversationStore, Message};
use uuid::Uuid;

/// Characters of document text inspected when guessing its kind
const KIND_PREVIEW_CHARS: usize = 2000;

/// Events emitted during a turn for UI updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Waiting for the model
    Thinking,
    /// Final text response
    Response(String),
    /// Generation failed; carries the text recorded in place of a reply
    Error(String),
}

/// Result of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub failed: bool,
}

/// Document text attached to a session as prompt context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDocument {
    pub name: String,
    /// Extracted text, or the extraction diagnostic
    pub context: String,
    pub kind: DocumentKind,
    pub extracted: bool,
}

impl AttachedDocument {
    pub fn from_extraction(name: impl Into<String>, extraction: &Extraction) -> Self {
        let kind = match extraction.text() {
            Some(text) => {
                let preview: String = text.chars().take(KIND_PREVIEW_CHARS).collect();
                DocumentKind::detect(&preview)
            }
            None => DocumentKind::General,
        };
        Self {
            name: name.into(),
            context: extraction.context_text(),
            kind,
            extracted: extraction.is_text(),
        }
    }
}

/// Status summary for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub id: Uuid,
    pub messages: usize,
    pub capacity: usize,
    pub document: Option<String>,
}

/// A single conversation: memory, model, and optional document context
pub struct ChatSession {
    id: Uuid,
    store: ConversationStore,
    llm: Box<dyn LlmProvider>,
    model: String,
    record_failed_turns: bool,
    document: Option<AttachedDocument>,
}

impl ChatSession {
    /// Create a session with a fresh store sized from `config`
    pub fn new(llm: Box<dyn LlmProvider>, config: &ChatConfig) -> Result<Self> {
        let store = ConversationStore::new(config.memory_capacity)?;
        let mut session = Self::with_store(llm, store, config.model.clone());
        session.record_failed_turns = config.record_failed_turns;
        Ok(session)
    }

    /// Create a session around an existing store
    pub fn with_store(llm: Box<dyn LlmProvider>, store: ConversationStore, model: String) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, provider = llm.name(), model = %model, "Started chat session");
        Self {
            id,
            store,
            llm,
            model,
            record_failed_turns: true,
            document: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.llm.name()
    }

    /// Read access to the conversation memory
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn history(&self) -> Vec<Message> {
        self.store.snapshot()
    }

    pub fn record_failed_turns(&self) -> bool {
        self.record_failed_turns
    }

    pub fn set_record_failed_turns(&mut self, record: bool) {
        self.record_failed_turns = record;
    }

    /// Forget the conversation so far
    pub fn clear(&self) {
        self.store.clear();
        tracing::info!(session = %self.id, "Cleared conversation memory");
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            messages: self.store.size(),
            capacity: self.store.capacity(),
            document: self.document.as_ref().map(|d| d.name.clone()),
        }
    }

    /// Attach a document's text (or its extraction diagnostic) as context
    pub fn attach_document(&mut self, name: impl Into<String>, extraction: &Extraction) {
        let document = AttachedDocument::from_extraction(name, extraction);
        tracing::info!(
            session = %self.id,
            document = %document.name,
            kind = %document.kind,
            extracted = document.extracted,
            "Attached document"
        );
        self.document = Some(document);
    }

    pub fn detach_document(&mut self) -> Option<AttachedDocument> {
        self.document.take()
    }

    pub fn document(&self) -> Option<&AttachedDocument> {
        self.document.as_ref()
    }

    /// Assemble the prompt for `message` from the current history and document
    pub fn build_prompt(&self, message: &str) -> String {
        let history = format_for_prompt(&self.store);
        let mut builder = PromptBuilder::new(SYSTEM_PROMPT).history(&history);
        if let Some(doc) = &self.document {
            builder = builder.context(&doc.context, doc.kind);
        }
        builder.build(message)
    }

    /// Run one turn: prompt the model, then record the exchange.
    ///
    /// A generation failure is turned into a displayable reply rather than
    /// an error, and is recorded as the assistant's turn unless
    /// `record_failed_turns` is off.
    pub async fn ask<F>(&self, message: &str, mut on_event: F) -> TurnReply
    where
        F: FnMut(TurnEvent),
    {
        on_event(TurnEvent::Thinking);

        let prompt = self.build_prompt(message);
        tracing::debug!(
            session = %self.id,
            history = self.store.size(),
            prompt_chars = prompt.len(),
            "Dispatching turn"
        );

        let reply = match self.llm.generate(&prompt, &self.model).await {
            Ok(text) => {
                on_event(TurnEvent::Response(text.clone()));
                TurnReply {
                    text,
                    failed: false,
                }
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Generation failed");
                let text = format!("❌ Error while generating response: {}", e);
                on_event(TurnEvent::Error(text.clone()));
                TurnReply { text, failed: true }
            }
        };

        if !reply.failed || self.record_failed_turns {
            self.store.push_turn(message, &reply.text);
        }

        tracing::info!(
            session = %self.id,
            failed = reply.failed,
            history = self.store.size(),
            "Turn complete"
        );
        reply
    }
}

/// Extract a document off the async runtime
pub async fn extract_document(source: DocumentSource, extractor: Extractor) -> Extraction {
    match tokio::task::spawn_blocking(move || extractor.extract(source)).await {
        Ok(extraction) => extraction,
        Err(e) => Extraction::ReadError(format!("extraction task failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{EchoProvider, LlmError};
    use async_trait::async_trait;
    use parley_memory::Role;
    use std::sync::{Arc, Mutex};

    /// Records every prompt it sees and replies from a script
    struct ScriptedProvider {
        prompts: Arc<Mutex<Vec<String>>>,
        replies: Mutex<Vec<std::result::Result<String, LlmError>>>,
    }

    impl ScriptedProvider {
        fn new(
            replies: Vec<std::result::Result<String, LlmError>>,
        ) -> (Self, Arc<Mutex<Vec<String>>>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            let mut replies = replies;
            replies.reverse();
            (
                Self {
                    prompts: Arc::clone(&prompts),
                    replies: Mutex::new(replies),
                },
                prompts,
            )
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, prompt: &str, _model: &str) -> std::result::Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn session_with(
        replies: Vec<std::result::Result<String, LlmError>>,
        capacity: usize,
    ) -> (ChatSession, Arc<Mutex<Vec<String>>>) {
        let (provider, prompts) = ScriptedProvider::new(replies);
        let config = ChatConfig {
            memory_capacity: capacity,
            ..ChatConfig::default()
        };
        (ChatSession::new(Box::new(provider), &config).unwrap(), prompts)
    }

    #[tokio::test]
    async fn test_prompt_excludes_current_turn() {
        let (session, prompts) =
            session_with(vec![Ok("Hello!".to_string()), Ok("Fine.".to_string())], 10);

        session.ask("hi", |_| {}).await;
        session.ask("how are you", |_| {}).await;

        let prompts = prompts.lock().unwrap();
        assert!(!prompts[0].contains("Previous conversation:"));
        assert!(prompts[0].ends_with("User: hi"));

        assert!(prompts[1].contains("Previous conversation:\nUser: hi\nAssistant: Hello!"));
        assert!(!prompts[1].contains("User: how are you\n"));
        assert!(prompts[1].ends_with("User: how are you"));

        let history: Vec<_> = session
            .history()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(
            history,
            vec![
                (Role::User, "hi".to_string()),
                (Role::Assistant, "Hello!".to_string()),
                (Role::User, "how are you".to_string()),
                (Role::Assistant, "Fine.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_recorded_as_assistant_reply() {
        let (session, _) = session_with(
            vec![Err(LlmError::Request("connection refused".to_string()))],
            10,
        );

        let mut events = Vec::new();
        let reply = session.ask("anyone there?", |e| events.push(e)).await;

        assert!(reply.failed);
        assert_eq!(
            reply.text,
            "❌ Error while generating response: API request failed: connection refused"
        );
        assert_eq!(
            events,
            vec![TurnEvent::Thinking, TurnEvent::Error(reply.text.clone())]
        );

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, reply.text);
    }

    #[tokio::test]
    async fn test_failed_turn_can_be_excluded() {
        let (mut session, _) =
            session_with(vec![Err(LlmError::EmptyResponse), Ok("ok".to_string())], 10);
        session.set_record_failed_turns(false);

        let reply = session.ask("first", |_| {}).await;
        assert!(reply.failed);
        assert_eq!(session.store().size(), 0);

        session.ask("second", |_| {}).await;
        assert_eq!(session.store().size(), 2);
    }

    #[tokio::test]
    async fn test_memory_window_is_bounded() {
        let replies = (0..5).map(|i| Ok(format!("reply {}", i))).collect();
        let (session, prompts) = session_with(replies, 3);

        for i in 0..5 {
            session.ask(&format!("question {}", i), |_| {}).await;
            assert!(session.store().size() <= 3);
        }

        let history: Vec<_> = session.history().into_iter().map(|m| m.content).collect();
        assert_eq!(history, vec!["reply 3", "question 4", "reply 4"]);

        // The last prompt saw the window as it was before turn 4
        let prompts = prompts.lock().unwrap();
        assert!(prompts[4].contains(
            "Previous conversation:\nAssistant: reply 2\nUser: question 3\nAssistant: reply 3\n"
        ));
    }

    #[tokio::test]
    async fn test_document_context_in_prompt() {
        let (mut session, prompts) = session_with(vec![Ok("It says hi.".to_string())], 10);
        let extraction = Extractor::default().render_pages(vec!["Abstract: a research note."]);
        session.attach_document("note.pdf", &extraction);

        let doc = session.document().unwrap();
        assert!(doc.extracted);
        assert_eq!(doc.kind, DocumentKind::ResearchPaper);
        assert_eq!(session.status().document.as_deref(), Some("note.pdf"));

        session.ask("what does it say?", |_| {}).await;
        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains("Context:\n--- Page 1 ---\nAbstract: a research note."));

        // Document text is context only, never stored as a message
        assert!(session
            .history()
            .iter()
            .all(|m| !m.content.contains("research note")));
    }

    #[tokio::test]
    async fn test_extraction_diagnostic_is_plain_context() {
        let (mut session, _) = session_with(vec![], 10);
        session.attach_document("locked.pdf", &Extraction::Encrypted);

        let doc = session.document().unwrap();
        assert!(!doc.extracted);
        assert_eq!(doc.kind, DocumentKind::General);
        assert!(session
            .build_prompt("q")
            .contains("Context:\n🔒 PDF is encrypted and cannot be processed"));

        assert!(session.detach_document().is_some());
        assert!(!session.build_prompt("q").contains("Context:"));
    }

    #[tokio::test]
    async fn test_clear_and_status() {
        let session = ChatSession::with_store(
            Box::new(EchoProvider::new()),
            ConversationStore::new(4).unwrap(),
            "echo-model".to_string(),
        );
        let reply = session.ask("ping", |_| {}).await;
        assert_eq!(reply.text, "[echo:echo-model] ping");

        let status = session.status();
        assert_eq!(status.messages, 2);
        assert_eq!(status.capacity, 4);
        assert_eq!(status.id, session.id());

        session.clear();
        session.clear();
        assert_eq!(session.status().messages, 0);
        assert_eq!(session.status().capacity, 4);
    }

    #[tokio::test]
    async fn test_extract_document_off_runtime() {
        let outcome = extract_document(
            DocumentSource::path("/no/such/file.pdf"),
            Extractor::default(),
        )
        .await;
        assert!(matches!(outcome, Extraction::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_keep_question_and_reply_adjacent() {
        let session = Arc::new(ChatSession::with_store(
            Box::new(EchoProvider::new()),
            ConversationStore::new(32).unwrap(),
            "m".to_string(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    for j in 0..2 {
                        session.ask(&format!("question {}-{}", i, j), |_| {}).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let history = session.history();
        assert_eq!(history.len(), 32);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].content, format!("[echo:m] {}", pair[0].content));
        }
    }

    #[test]
    fn test_zero_capacity_config_rejected() {
        let config = ChatConfig {
            memory_capacity: 0,
            ..ChatConfig::default()
        };
        assert!(ChatSession::new(Box::new(EchoProvider::new()), &config).is_err());
    }
}
