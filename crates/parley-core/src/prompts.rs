//! Prompt templates and assembly

use std::fmt;
use std::str::FromStr;

/// System prompt placed at the top of every chat prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable assistant.

Your capabilities include:
- Answering questions on a wide range of topics
- Analyzing and discussing PDF documents when provided
- Maintaining conversation context and continuity
- Providing clear, accurate, and helpful responses

Guidelines for responses:
1. Be concise yet comprehensive in your answers
2. When document context is provided, prioritize information from the document
3. Clearly indicate when you are referencing the uploaded document
4. If your knowledge and the document disagree, acknowledge both perspectives
5. Ask clarifying questions when the request is ambiguous
6. If a provided document does not contain the answer, say so

You have access to the recent conversation history, so refer back to earlier exchanges when it helps.";

/// Guidance added whenever document context is present
pub const DOCUMENT_ANALYSIS_PROMPT: &str = "When answering from the document:
- Quote specific passages when they support your answer
- Give page references (the context marks pages as `--- Page N ---`)
- Mention it if the document text looks incomplete or corrupted";

const RESEARCH_PAPER_PROMPT: &str = "This appears to be a research paper. Identify the research question, summarize methodology and findings, and note limitations.";

const BUSINESS_DOCUMENT_PROMPT: &str = "This appears to be a business document. Extract key metrics and objectives, strategic recommendations, and action items.";

const LEGAL_DOCUMENT_PROMPT: &str = "This appears to be a legal document. Identify key provisions, parties, dates, and obligations. This is informational, not legal advice.";

const TECHNICAL_MANUAL_PROMPT: &str = "This appears to be a technical manual. Extract procedures, specifications, and safety warnings.";

/// Coarse document category, guessed from keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    ResearchPaper,
    Business,
    Legal,
    TechnicalManual,
    #[default]
    General,
}

impl DocumentKind {
    /// Guess the kind from a preview of the document text.
    ///
    /// Categories are checked in a fixed order and the first with a
    /// matching keyword wins.
    pub fn detect(preview: &str) -> Self {
        const RULES: &[(DocumentKind, &[&str])] = &[
            (
                DocumentKind::ResearchPaper,
                &["abstract", "methodology", "references", "hypothesis", "research"],
            ),
            (
                DocumentKind::Business,
                &["revenue", "profit", "strategy", "market", "business plan"],
            ),
            (
                DocumentKind::Legal,
                &["contract", "agreement", "legal", "clause", "terms"],
            ),
            (
                DocumentKind::TechnicalManual,
                &["procedure", "manual", "installation", "configuration", "technical"],
            ),
        ];

        let lower = preview.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(kind, _)| *kind)
            .unwrap_or(DocumentKind::General)
    }

    /// Extra instructions for this kind, if any
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            DocumentKind::ResearchPaper => Some(RESEARCH_PAPER_PROMPT),
            DocumentKind::Business => Some(BUSINESS_DOCUMENT_PROMPT),
            DocumentKind::Legal => Some(LEGAL_DOCUMENT_PROMPT),
            DocumentKind::TechnicalManual => Some(TECHNICAL_MANUAL_PROMPT),
            DocumentKind::General => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::ResearchPaper => "research paper",
            DocumentKind::Business => "business",
            DocumentKind::Legal => "legal",
            DocumentKind::TechnicalManual => "technical manual",
            DocumentKind::General => "general",
        })
    }
}

/// Focus for [`analysis_prompt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisFocus {
    #[default]
    General,
    Technical,
    Academic,
    Business,
}

impl AnalysisFocus {
    fn instruction(&self) -> &'static str {
        match self {
            AnalysisFocus::General => {
                "Provide a comprehensive analysis covering main themes, arguments, and conclusions."
            }
            AnalysisFocus::Technical => {
                "Focus on technical details, methodologies, and specifications."
            }
            AnalysisFocus::Academic => {
                "Analyze structure, arguments, evidence, and academic rigor."
            }
            AnalysisFocus::Business => {
                "Examine business implications, strategies, and practical applications."
            }
        }
    }
}

impl FromStr for AnalysisFocus {
    type Err = String;

    // Unknown names fall back to the general focus.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "technical" => AnalysisFocus::Technical,
            "academic" => AnalysisFocus::Academic,
            "business" => AnalysisFocus::Business,
            _ => AnalysisFocus::General,
        })
    }
}

pub fn summary_prompt(content: &str) -> String {
    format!(
        "Please provide a clear and concise summary of the following content:\n\n{}\n\n\
         Include:\n\
         - Main topics or themes\n\
         - Key points and important details\n\
         - Overall structure or organization\n\
         - Any notable conclusions or recommendations",
        content
    )
}

pub fn analysis_prompt(content: &str, focus: AnalysisFocus) -> String {
    format!(
        "Please analyze the following content:\n\n{}\n\n\
         Analysis focus: {}\n\n\
         Provide insights on:\n\
         - Key findings or arguments\n\
         - Strengths and potential weaknesses\n\
         - Relevant context or implications\n\
         - Any questions or areas for further exploration",
        content,
        focus.instruction()
    )
}

/// Assembles the full prompt for one chat turn.
///
/// Sections, in order and separated by a blank line: system prompt,
/// history block (omitted when empty), document guidance and `Context:`
/// block (omitted without a document), then `User: <message>`.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder<'a> {
    system: &'a str,
    history: &'a str,
    context: Option<&'a str>,
    kind: DocumentKind,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(system: &'a str) -> Self {
        Self {
            system,
            history: "",
            context: None,
            kind: DocumentKind::General,
        }
    }

    /// History block as produced by `parley_memory::format_for_prompt`
    pub fn history(mut self, history: &'a str) -> Self {
        self.history = history;
        self
    }

    pub fn context(mut self, context: &'a str, kind: DocumentKind) -> Self {
        self.context = Some(context);
        self.kind = kind;
        self
    }

    pub fn build(&self, message: &str) -> String {
        let mut sections: Vec<String> = vec![self.system.trim_end().to_string()];

        if !self.history.is_empty() {
            sections.push(self.history.trim_end().to_string());
        }

        if let Some(context) = self.context {
            sections.push(DOCUMENT_ANALYSIS_PROMPT.to_string());
            if let Some(guidance) = self.kind.guidance() {
                sections.push(guidance.to_string());
            }
            sections.push(format!("Context:\n{}", context.trim_end()));
        }

        sections.push(format!("User: {}", message.trim()));
        sections.join("\n\n")
    }
}

impl Default for PromptBuilder<'_> {
    fn default() -> Self {
        PromptBuilder::new(SYSTEM_PROMPT)
    }
}
