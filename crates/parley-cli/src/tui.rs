//! Interactive chat TUI
//!
//! Left pane shows the session state and how full the memory window is;
//! right pane is the transcript. The transcript keeps everything said in
//! this run, while the model only ever sees the bounded memory window.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

use parley_core::{extract_document, ChatSession, TurnEvent};
use parley_document::{DocumentSource, Extractor};

const ICON_IDLE: &str = "\
\n\
╭───────────╮\n\
│           │\n\
│   ·   ·   │\n\
│           │\n\
╰──╮────────╯\n\
   ╰\n\
\n\
LISTENING";

const ICON_THINKING: &str = "\
\n\
╭───────────╮\n\
│           │\n\
│  •  •  •  │\n\
│           │\n\
╰──╮────────╯\n\
   ╰\n\
\n\
THINKING...";

const ICON_ANSWERED: &str = "\
\n\
╭───────────╮\n\
│           │\n\
│     ✓     │\n\
│           │\n\
╰────────╭──╯\n\
         ╯\n\
\n\
ANSWERED";

const ICON_FAILED: &str = "\
\n\
╭───────────╮\n\
│           │\n\
│     ✗     │\n\
│           │\n\
╰────────╭──╯\n\
         ╯\n\
\n\
FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatState {
    Idle,
    Thinking,
    Answered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    You,
    Assistant,
    Notice,
}

impl Speaker {
    fn label(&self) -> &'static str {
        match self {
            Speaker::You => "You",
            Speaker::Assistant => "Assistant",
            Speaker::Notice => "Parley",
        }
    }
}

struct ChatLine {
    speaker: Speaker,
    content: String,
}

/// What the user typed into the input box
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Message(String),
    Clear,
    Attach(PathBuf),
    Detach,
    Quit,
    Unknown(String),
    Empty,
}

impl Input {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Input::Empty;
        }
        if !trimmed.starts_with('/') {
            return Input::Message(trimmed.to_string());
        }

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };
        match command {
            "/clear" => Input::Clear,
            "/drop" => Input::Detach,
            "/quit" | "/exit" => Input::Quit,
            "/doc" if !arg.is_empty() => Input::Attach(PathBuf::from(arg)),
            _ => Input::Unknown(trimmed.to_string()),
        }
    }
}

struct App {
    session: ChatSession,
    extractor: Extractor,
    lines: Vec<ChatLine>,
    input: String,
    scroll: u16,
    state: ChatState,
    should_quit: bool,
}

impl App {
    fn new(session: ChatSession, extractor: Extractor) -> Self {
        let mut app = Self {
            session,
            extractor,
            lines: vec![],
            input: String::new(),
            scroll: 0,
            state: ChatState::Idle,
            should_quit: false,
        };
        let loaded = app
            .session
            .document()
            .map(|doc| format!("📄 Loaded {} ({})", doc.name, doc.kind));
        if let Some(note) = loaded {
            app.notice(note);
        }
        app
    }

    fn notice(&mut self, content: impl Into<String>) {
        self.lines.push(ChatLine {
            speaker: Speaker::Notice,
            content: content.into(),
        });
    }

    /// Handle the current input. Slash commands run immediately; a plain
    /// message is returned so the caller can redraw before the model call.
    async fn submit(&mut self) -> Option<String> {
        let input = Input::parse(&self.input);
        self.input.clear();

        match input {
            Input::Empty => None,
            Input::Message(text) => {
                self.lines.push(ChatLine {
                    speaker: Speaker::You,
                    content: text.clone(),
                });
                self.state = ChatState::Thinking;
                Some(text)
            }
            Input::Clear => {
                self.session.clear();
                self.notice("🧹 Conversation memory cleared");
                None
            }
            Input::Attach(path) => {
                let source = DocumentSource::path(&path);
                let name = source.name();
                let extraction = extract_document(source, self.extractor).await;
                let note = if extraction.is_text() {
                    format!("📄 Loaded {}", name)
                } else {
                    format!("Attached {} without text: {}", name, extraction)
                };
                self.session.attach_document(name, &extraction);
                self.notice(note);
                None
            }
            Input::Detach => {
                match self.session.detach_document() {
                    Some(doc) => self.notice(format!("Dropped {}", doc.name)),
                    None => self.notice("No document attached"),
                }
                None
            }
            Input::Quit => {
                self.should_quit = true;
                None
            }
            Input::Unknown(command) => {
                self.notice(format!(
                    "Unknown command {}. Try /clear, /doc PATH, /drop or /quit",
                    command
                ));
                None
            }
        }
    }

    async fn answer(&mut self, message: &str) {
        let mut state = ChatState::Thinking;
        let reply = self
            .session
            .ask(message, |event| match event {
                TurnEvent::Thinking => state = ChatState::Thinking,
                TurnEvent::Response(_) => state = ChatState::Answered,
                TurnEvent::Error(_) => state = ChatState::Failed,
            })
            .await;

        self.lines.push(ChatLine {
            speaker: Speaker::Assistant,
            content: reply.text,
        });
        self.state = state;
    }
}

pub async fn run_tui(session: ChatSession, extractor: Extractor) -> anyhow::Result<()> {
    let mut app = App::new(session, extractor);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    while !app.should_quit {
        terminal.draw(|f| draw_ui(f, app))?;

        if !event::poll(std::time::Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        if matches!(app.state, ChatState::Answered | ChatState::Failed) {
            app.state = ChatState::Idle;
        }
        match key.code {
            KeyCode::Esc => break,
            KeyCode::Enter => {
                if let Some(message) = app.submit().await {
                    // Show the thinking state while the model works
                    terminal.draw(|f| draw_ui(f, app))?;
                    app.answer(&message).await;
                }
            }
            KeyCode::Char(c) => app.input.push(c),
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Up => app.scroll = app.scroll.saturating_sub(1),
            KeyCode::Down => app.scroll = app.scroll.saturating_add(1),
            _ => {}
        }
    }
    Ok(())
}

fn draw_ui(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(40)])
        .split(f.size());

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(12), Constraint::Length(3)])
        .split(columns[0]);

    draw_state_icon(f, app, side[0]);
    draw_memory_gauge(f, app, side[1]);
    draw_chat(f, app, columns[1]);
}

fn draw_state_icon(f: &mut Frame, app: &App, area: Rect) {
    let (icon, color, title) = match app.state {
        ChatState::Idle => (ICON_IDLE, Color::Cyan, " Ready "),
        ChatState::Thinking => (ICON_THINKING, Color::Yellow, " Thinking "),
        ChatState::Answered => (ICON_ANSWERED, Color::Green, " Answered "),
        ChatState::Failed => (ICON_FAILED, Color::Red, " Failed "),
    };

    let widget = Paragraph::new(icon)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(title, Style::default().fg(color))),
        );
    f.render_widget(widget, area);
}

fn draw_memory_gauge(f: &mut Frame, app: &App, area: Rect) {
    let status = app.session.status();
    let ratio = status.messages as f64 / status.capacity as f64;
    let color = if status.messages >= status.capacity {
        Color::Magenta
    } else {
        Color::Blue
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Memory "),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{}/{}", status.messages, status.capacity));
    f.render_widget(gauge, area);
}

fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(10),   // messages
            Constraint::Length(3), // input
            Constraint::Length(1), // status bar
        ])
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "PARLEY",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ask about anything, or your PDF", Style::default().fg(Color::DarkGray)),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(header, chunks[0]);

    let mut chat_lines: Vec<Line> = vec![];
    for line in &app.lines {
        let (color, prefix, text_color) = match line.speaker {
            Speaker::You => (Color::Green, "► ", Color::White),
            Speaker::Assistant => (Color::Cyan, "◆ ", Color::Gray),
            Speaker::Notice => (Color::Yellow, "· ", Color::DarkGray),
        };
        chat_lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(color)),
            Span::styled(
                line.speaker.label(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]));
        for text in line.content.lines() {
            chat_lines.push(Line::from(Span::styled(
                format!("  {}", text),
                Style::default().fg(text_color),
            )));
        }
        chat_lines.push(Line::from(""));
    }

    let chat = Paragraph::new(chat_lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" Conversation ", Style::default().fg(Color::Cyan))),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(chat, chunks[1]);

    let busy = app.state == ChatState::Thinking;
    let (border, fg, title) = if busy {
        (Color::DarkGray, Color::DarkGray, " Wait... ")
    } else {
        (Color::Cyan, Color::White, " Message ")
    };
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(Span::styled(
                    title,
                    Style::default().fg(if busy { Color::Yellow } else { Color::Cyan }),
                )),
        );
    f.render_widget(input, chunks[2]);

    let document = match app.session.document() {
        Some(doc) => format!(" 📄 {} ", doc.name),
        None => " no document ".to_string(),
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ESC", Style::default().fg(Color::Yellow)),
        Span::styled(" quit ", Style::default().fg(Color::DarkGray)),
        Span::styled("ENTER", Style::default().fg(Color::Yellow)),
        Span::styled(" send ", Style::default().fg(Color::DarkGray)),
        Span::styled("↑↓", Style::default().fg(Color::Yellow)),
        Span::styled(" scroll ", Style::default().fg(Color::DarkGray)),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(document, Style::default().fg(Color::Blue)),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.session.model(), Style::default().fg(Color::Magenta)),
    ]));
    f.render_widget(status, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ChatConfig, EchoProvider};
    use parley_document::Extraction;

    fn app() -> App {
        let session = ChatSession::new(Box::new(EchoProvider::new()), &ChatConfig::default()).unwrap();
        App::new(session, Extractor::default())
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("   "), Input::Empty);
        assert_eq!(Input::parse(" hello "), Input::Message("hello".to_string()));
        assert_eq!(Input::parse("/clear"), Input::Clear);
        assert_eq!(Input::parse("/drop"), Input::Detach);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(
            Input::parse("/doc  my files/report.pdf "),
            Input::Attach(PathBuf::from("my files/report.pdf"))
        );
        assert_eq!(Input::parse("/doc"), Input::Unknown("/doc".to_string()));
        assert_eq!(Input::parse("/nope"), Input::Unknown("/nope".to_string()));
    }

    #[tokio::test]
    async fn test_message_round_trip_updates_state() {
        let mut app = app();
        app.input = "hi there".to_string();

        let message = app.submit().await.unwrap();
        assert_eq!(app.state, ChatState::Thinking);
        assert!(app.input.is_empty());

        app.answer(&message).await;
        assert_eq!(app.state, ChatState::Answered);
        assert_eq!(app.session.status().messages, 2);
        assert_eq!(app.lines.last().unwrap().speaker, Speaker::Assistant);
    }

    #[tokio::test]
    async fn test_commands_do_not_reach_the_model() {
        let mut app = app();
        app.session.attach_document("notes.pdf", &Extraction::NoText);

        app.input = "/drop".to_string();
        assert!(app.submit().await.is_none());
        assert!(app.session.document().is_none());

        app.input = "/clear".to_string();
        assert!(app.submit().await.is_none());
        assert_eq!(app.session.status().messages, 0);

        app.input = "/quit".to_string();
        assert!(app.submit().await.is_none());
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_attach_missing_document_reports_diagnostic() {
        let mut app = app();
        app.input = "/doc /no/such/file.pdf".to_string();
        assert!(app.submit().await.is_none());

        let doc = app.session.document().unwrap();
        assert_eq!(doc.name, "file.pdf");
        assert!(!doc.extracted);
        assert!(app.lines.last().unwrap().content.contains("PDF file not found"));
    }
}
