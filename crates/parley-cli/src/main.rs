//! Parley CLI - chat about your documents
//!
//! Usage:
//!   parley chat       - Interactive terminal chat
//!   parley ask        - Ask a single question
//!   parley summarize  - Summarize a PDF
//!   parley analyze    - Analyze a PDF with a chosen focus
//!   parley extract    - Print the text (or chunks) extracted from a PDF

mod tui;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use parley_core::prompts::{analysis_prompt, summary_prompt, AnalysisFocus};
use parley_core::{
    extract_document, ChatConfig, ChatSession, EchoProvider, GeminiProvider, LlmProvider,
};
use parley_document::{
    Chunker, DocumentSource, Extraction, Extractor, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Chat with an LLM about your PDFs, with short-term memory", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Model identifier (overrides PARLEY_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Use the offline echo provider instead of Gemini
    #[arg(long)]
    echo: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// PDF to attach as context
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Number of messages kept in memory
        #[arg(long)]
        capacity: Option<usize>,

        #[command(flatten)]
        llm: ModelArgs,
    },

    /// Ask one question and print the answer
    Ask {
        question: String,

        /// PDF to attach as context
        #[arg(short, long)]
        document: Option<PathBuf>,

        #[command(flatten)]
        llm: ModelArgs,
    },

    /// Summarize a PDF
    Summarize {
        path: PathBuf,

        #[command(flatten)]
        llm: ModelArgs,
    },

    /// Analyze a PDF
    Analyze {
        path: PathBuf,

        /// general, technical, academic, or business
        #[arg(short, long, default_value = "general")]
        focus: AnalysisFocus,

        #[command(flatten)]
        llm: ModelArgs,
    },

    /// Extract text from a PDF
    Extract {
        path: PathBuf,

        /// Print overlapping chunks instead of the full text
        #[arg(long)]
        chunks: bool,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        overlap: usize,

        /// Character budget for extracted text
        #[arg(long)]
        max_chars: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with answers on stdout
    let tui = matches!(cli.command, Commands::Chat { .. });
    let directive = log_directive(cli.verbose, tui, std::env::var("RUST_LOG").ok());
    let filter = tracing_subscriber::EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level(tui)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Chat {
            document,
            capacity,
            llm,
        } => {
            let config = load_config(&llm, capacity)?;
            let provider = build_provider(&config, llm.echo)?;
            let extractor = Extractor::new(config.max_document_chars)?;

            let mut session = ChatSession::new(provider, &config)?;
            if let Some(path) = document {
                attach(&mut session, &path, extractor).await;
            }

            tui::run_tui(session, extractor).await?;
        }

        Commands::Ask {
            question,
            document,
            llm,
        } => {
            let config = load_config(&llm, None)?;
            let provider = build_provider(&config, llm.echo)?;
            let mut session = ChatSession::new(provider, &config)?;
            if let Some(path) = document {
                let extractor = Extractor::new(config.max_document_chars)?;
                attach(&mut session, &path, extractor).await;
            }

            let reply = session.ask(&question, |_| {}).await;
            if reply.failed {
                anyhow::bail!("{}", reply.text);
            }
            println!("{}", reply.text);
        }

        Commands::Summarize { path, llm } => {
            let config = load_config(&llm, None)?;
            let provider = build_provider(&config, llm.echo)?;
            let text = document_text(&path, config.max_document_chars).await?;

            println!("📄 Summarizing {}...", path.display());
            let summary = provider
                .generate(&summary_prompt(&text), &config.model)
                .await?;
            println!();
            println!("{}", summary);
        }

        Commands::Analyze { path, focus, llm } => {
            let config = load_config(&llm, None)?;
            let provider = build_provider(&config, llm.echo)?;
            let text = document_text(&path, config.max_document_chars).await?;

            println!("🔍 Analyzing {}...", path.display());
            let analysis = provider
                .generate(&analysis_prompt(&text, focus), &config.model)
                .await?;
            println!();
            println!("{}", analysis);
        }

        Commands::Extract {
            path,
            chunks,
            chunk_size,
            overlap,
            max_chars,
        } => {
            let config = ChatConfig::from_env()?;
            let extractor = Extractor::new(max_chars.unwrap_or(config.max_document_chars))?;
            let source = DocumentSource::path(&path);
            if !source.has_pdf_extension() {
                eprintln!("⚠️  {} does not have a .pdf extension", path.display());
            }

            let extraction = extract_document(source, extractor).await;
            if !chunks {
                println!("{}", extraction);
                return Ok(());
            }

            let extracted = match extraction {
                Extraction::Text(extracted) => extracted,
                other => anyhow::bail!("{}", other),
            };
            let chunker = Chunker::new(chunk_size, overlap)?;
            let pieces = chunker.chunk(&extracted.text);
            println!("📄 {} chunks", pieces.len());
            for (i, piece) in pieces.iter().enumerate() {
                println!();
                println!("--- Chunk {} ({} chars) ---", i + 1, piece.chars().count());
                println!("{}", piece);
            }
        }
    }

    Ok(())
}

/// The TUI owns the terminal, so it logs nothing unless asked to.
fn default_level(tui: bool) -> &'static str {
    if tui {
        "off"
    } else {
        "info"
    }
}

/// Filter directive: `-v` wins, then `RUST_LOG`, then the per-mode default
fn log_directive(verbose: bool, tui: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_level(tui).to_string())
}

fn load_config(llm: &ModelArgs, capacity: Option<usize>) -> anyhow::Result<ChatConfig> {
    let mut config = ChatConfig::from_env().context("Failed to load configuration")?;
    if let Some(model) = &llm.model {
        config.model = model.clone();
    }
    if let Some(capacity) = capacity {
        config.memory_capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

fn build_provider(config: &ChatConfig, echo: bool) -> anyhow::Result<Box<dyn LlmProvider>> {
    if echo {
        return Ok(Box::new(EchoProvider::new()));
    }
    Ok(Box::new(GeminiProvider::from_config(config)?))
}

/// Extract and attach a document, warning on stderr when no text came out
async fn attach(session: &mut ChatSession, path: &Path, extractor: Extractor) {
    let source = DocumentSource::path(path);
    let name = source.name();
    let extraction = extract_document(source, extractor).await;
    if !extraction.is_text() {
        eprintln!("{}", extraction);
    }
    session.attach_document(name, &extraction);
}

/// Extracted text of a document, or its diagnostic as an error
async fn document_text(path: &Path, max_chars: usize) -> anyhow::Result<String> {
    let extractor = Extractor::new(max_chars)?;
    match extract_document(DocumentSource::path(path), extractor).await {
        Extraction::Text(extracted) => Ok(extracted.text),
        other => anyhow::bail!("{}", other),
    }
}
