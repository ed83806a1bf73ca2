// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `serve`: the browser chat, one session per visitor
//   2. `ask`:   one question about one PDF, answer on stdout
//   3. `chat`:  the same chat session, in the terminal
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::{
    fs,
    io::{self, BufRead, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use commands::{AskArgs, ChatArgs, Commands, ServeArgs};

use crate::application::session::{ChatSession, SessionServices, SessionSettings};
use crate::data::loader::PdfLoader;
use crate::domain::message::ChatMessage;
use crate::infra::model_store::SharedModel;
use crate::ml::generator::GenerationSettings;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-chat",
    version,
    about = "Upload a PDF and chat with it, answered by a local T5 model."
)]
pub struct Cli {
    /// The subcommand to run (serve, ask or chat)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => run_serve(args),
            Commands::Ask(args)   => run_ask(args),
            Commands::Chat(args)  => run_chat(args),
        }
    }
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::web::{self, AppState};

    let settings    = SessionSettings::from(&args);
    let session_ttl = args.session_ttl();
    let models = Arc::new(SharedModel::new(args.model.into(), GenerationSettings::default()));
    if args.preload {
        tracing::info!("Preloading model before serving");
        models.initialize()?;
    }
    if !models.is_initialized() {
        tracing::info!("Model will load on the first upload");
    }

    let services = SessionServices {
        loader: Arc::new(PdfLoader::new()),
        models,
        settings,
    };

    let runtime = tokio::runtime::Runtime::new().context("Cannot start async runtime")?;
    runtime.block_on(web::serve(args.addr, AppState::new(services), session_ttl))
}

fn run_ask(args: AskArgs) -> Result<()> {
    use crate::application::ask_use_case::AskUseCase;

    let models = Arc::new(SharedModel::new(args.model.into(), GenerationSettings::default()));
    let use_case = AskUseCase::new(Arc::new(PdfLoader::new()), models);

    let answer = use_case.answer(&args.pdf, &args.question)?;
    println!("\nAnswer: {}", answer);
    Ok(())
}

/// Terminal REPL over a ChatSession. Prints each new message as
///   [03:41 PM] Assistant: ...
fn run_chat(args: ChatArgs) -> Result<()> {
    let services = SessionServices {
        loader:   Arc::new(PdfLoader::new()),
        models:   Arc::new(SharedModel::new(args.model.into(), GenerationSettings::default())),
        settings: SessionSettings {
            latency_floor: Duration::from_millis(args.latency_floor_ms),
            ..SessionSettings::default()
        },
    };
    let mut session = ChatSession::new(services);

    let bytes = fs::read(&args.pdf)
        .with_context(|| format!("Cannot read '{}'", args.pdf.display()))?;
    let name = args
        .pdf
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    println!("Reading your PDF and warming up the model...");
    session.upload(name, &bytes)?;
    let mut shown = print_new(session.messages(), 0);
    println!("(type /quit or press Ctrl-D to leave)");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match parse_line(&line) {
            ReplInput::Quit           => break,
            ReplInput::Question(text) => {
                session.submit(text)?;
                shown = print_new(session.messages(), shown);
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum ReplInput<'a> {
    Quit,
    /// The line as typed, without its line ending
    Question(&'a str),
}

fn parse_line(raw: &str) -> ReplInput<'_> {
    let text = raw.trim_end_matches(['\r', '\n']);
    if text.trim() == "/quit" {
        ReplInput::Quit
    } else {
        ReplInput::Question(text)
    }
}

/// Print messages[from..] and return the new count
fn print_new(messages: &[ChatMessage], from: usize) -> usize {
    for message in &messages[from..] {
        println!(
            "[{}] {}: {}",
            message.clock_label(),
            message.role().label(),
            message.text()
        );
    }
    messages.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::ReuploadPolicy;
    use crate::infra::model_store::ModelSource;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["pdf-chat", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else { panic!("expected serve") };

        assert_eq!(args.addr.to_string(), "127.0.0.1:8501");
        assert!(!args.preload);
        let settings = SessionSettings::from(&args);
        assert_eq!(settings.reupload, ReuploadPolicy::Ignore);
        assert_eq!(settings.latency_floor, Duration::from_millis(1200));
        assert_eq!(args.session_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "pdf-chat", "serve", "--reupload", "replace", "--preload",
            "--model-dir", "/models/t5", "--latency-floor-ms", "0",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else { panic!("expected serve") };

        assert!(args.preload);
        assert_eq!(SessionSettings::from(&args).reupload, ReuploadPolicy::Replace);
        let source = ModelSource::from(args.model);
        assert_eq!(source.local_dir.as_deref(), Some(std::path::Path::new("/models/t5")));
    }

    #[test]
    fn test_ask_requires_pdf_and_question() {
        assert!(Cli::try_parse_from(["pdf-chat", "ask", "--question", "why?"]).is_err());
        let cli = Cli::try_parse_from(["pdf-chat", "ask", "--pdf", "a.pdf", "--question", "why?"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask(_)));
    }

    #[test]
    fn test_repl_keeps_question_as_typed() {
        assert_eq!(parse_line("  what is  this?  \n"), ReplInput::Question("  what is  this?  "));
        assert_eq!(parse_line("hello\r\n"), ReplInput::Question("hello"));
        assert_eq!(parse_line("   \n"), ReplInput::Question("   "));
        assert_eq!(parse_line("/quit\n"), ReplInput::Quit);
        assert_eq!(parse_line(" /quit \n"), ReplInput::Quit);
    }

    #[test]
    fn test_print_new_returns_count() {
        let messages = vec![ChatMessage::assistant("hi"), ChatMessage::user("q")];
        assert_eq!(print_new(&messages, 0), 2);
        assert_eq!(print_new(&messages, 2), 2);
    }
}
