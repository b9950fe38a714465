//! AI MultiModal Hub command-line front end.
//!
//! One-shot subcommands for each endpoint, plus an interactive shell that
//! behaves like the web page: status line, classification panel, sentiment
//! panel and chat transcript.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::map_err_ignore)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::match_same_arms)]

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use multimodal_hub::chat::ChatState;
use multimodal_hub::config::{AppConfig, ConfigArgs, LogFormat, LoggingConfig};
use multimodal_hub::render::{self, TranscriptCursor};
use multimodal_hub::session::SessionId;
use multimodal_hub::types::HistoryContent;
use multimodal_hub::view::{ServerStatus, ViewState};
use multimodal_hub::{ClientController, ControllerOptions, Error, HubApi, HubClient};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the server is reachable
    Health,
    /// Classify a JPEG or PNG image
    Classify {
        /// Image file
        path: PathBuf,
    },
    /// Analyze the sentiment of some text
    Sentiment {
        /// Text to analyze (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Send a single chat message
    Chat {
        /// Message text (may be omitted when --image is given)
        message: Option<String>,
        /// Image to attach
        #[arg(long)]
        image: Option<PathBuf>,
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
    /// Print the server-side history of a session
    History {
        /// Session id
        session: String,
    },
    /// List sessions the server holds history for
    Sessions,
    /// Delete the server-side history of a session
    ClearHistory {
        /// Session id
        session: String,
    },
    /// Interactive shell (default)
    Shell,
}

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let mut controller = match setup(&cli.config) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            std::process::exit(1);
        }
    };

    let outcome = run(&mut controller, cli.command.unwrap_or(Command::Shell)).await;
    print_notifications(&mut controller);
    if let Err(e) = outcome {
        if matches!(e.downcast_ref::<Error>(), Some(Error::ChatDisabled)) {
            eprintln!("{e}");
        }
        std::process::exit(exit_code(&e));
    }
}

/// Load configuration, install logging, and build the controller.
fn setup(args: &ConfigArgs) -> anyhow::Result<Controller> {
    let config = AppConfig::from_args(args).context("failed to load configuration")?;

    init_tracing(&config.logging);

    info!(
        name: "hub.config.loaded",
        base_url = %config.server.base_url,
        chat = config.features.chat,
        "Configuration loaded"
    );

    let api = HubClient::from_config(&config.server)
        .with_context(|| format!("invalid server base URL {:?}", config.server.base_url))?;

    let options = ControllerOptions {
        chat_enabled: config.features.chat,
        limits: config.limits.image_limits(),
    };
    Ok(ClientController::new(api, options))
}

/// Initialize tracing (M-LOG-STRUCTURED). Logs go to stderr; stdout is for output.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter.as_str()));

    let (plain, json) = match logging.format {
        LogFormat::Plain => (
            Some(fmt::layer().with_target(true).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();
}

type Controller = ClientController<HubClient>;

/// Run one command.
///
/// Validation and request failures have already been shown as notifications
/// by the time an error is returned.
async fn run(controller: &mut Controller, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Health => {
            let status = controller.check_health().await;
            println!("{}", render::render_status(status));
            anyhow::ensure!(status == ServerStatus::Online, "server is offline");
        }
        Command::Classify { path } => {
            controller.select_image_file(&path).await?;
            controller.classify_image().await?;
            println!(
                "{}",
                render::render_upload(&controller.state().upload, controller.limits())
            );
        }
        Command::Sentiment { text } => {
            controller.analyze_sentiment(&text.join(" ")).await?;
            if let Some(view) = &controller.state().sentiment {
                println!("{}", render::render_sentiment(view));
            }
        }
        Command::Chat {
            message,
            image,
            session,
        } => {
            let session = session.map(SessionId::from_raw);
            one_shot_chat(controller, message.as_deref().unwrap_or_default(), image, session)
                .await?;
        }
        Command::History { session } => {
            let history = controller
                .api()
                .history(&session)
                .await
                .inspect_err(|e| eprintln!("Failed to fetch history: {e}"))?;
            println!("{} message(s)", history.length);
            for msg in &history.history {
                let parts: Vec<String> = msg
                    .content
                    .iter()
                    .map(|part| match part {
                        HistoryContent::Text { text } => text.clone(),
                        HistoryContent::Image => "[image]".to_string(),
                    })
                    .collect();
                println!("{}: {}", msg.role, parts.join(" "));
            }
        }
        Command::Sessions => {
            let list = controller
                .api()
                .sessions()
                .await
                .inspect_err(|e| eprintln!("Failed to list sessions: {e}"))?;
            println!("{} active session(s)", list.total_sessions);
            for id in &list.active_sessions {
                println!("  {id}");
            }
        }
        Command::ClearHistory { session } => {
            controller.resume_session(SessionId::from_raw(session))?;
            controller.clear_history().await?;
        }
        Command::Shell => shell(controller)
            .await
            .inspect_err(|e| eprintln!("Shell error: {e:#}"))?,
    }
    Ok(())
}

/// Exit status for a failed command: 2 when the input was rejected locally,
/// 1 when the server or the network failed.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_local() => 2,
        _ => 1,
    }
}

async fn one_shot_chat(
    controller: &mut Controller,
    message: &str,
    image: Option<PathBuf>,
    session: Option<SessionId>,
) -> Result<(), Error> {
    match session {
        Some(id) => controller.resume_session(id)?,
        None => {
            controller.init_new_session()?;
        }
    }
    if let Some(path) = image {
        controller.stage_chat_image_file(&path).await?;
    }
    let reply = controller.send_chat_message(message).await?;
    println!("{}", reply.response);
    println!("(session {}, {} messages)", reply.session_id, reply.conversation_length);
    Ok(())
}

fn print_notifications(controller: &mut Controller) {
    for note in controller.take_notifications() {
        eprintln!("{}", render::render_notification(&note));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interactive shell
// ─────────────────────────────────────────────────────────────────────────────

const SHELL_HELP: &str = "\
Commands:
  /select <path>     stage an image for classification
  /classify          classify the staged image
  /reset             clear the upload area
  /sentiment <text>  analyze sentiment
  /image <path>      attach an image to the next chat message
  /unimage           remove the attached image
  /new               start a new chat session
  /clear             delete server history and start a new session
  /health            re-check the server
  /show              redraw everything
  /help              this text
  /quit              exit
Anything else is sent as a chat message.";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Select(&'a str),
    Classify,
    Reset,
    Sentiment(&'a str),
    Image(&'a str),
    Unimage,
    New,
    Clear,
    Health,
    Show,
    Help,
    Quit,
    Chat(&'a str),
    Unknown(&'a str),
}

fn parse_shell_line(line: &str) -> ShellCommand<'_> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ShellCommand::Chat(line);
    };
    let (cmd, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(c, a)| (c, a.trim()));
    match cmd {
        "select" => ShellCommand::Select(arg),
        "classify" => ShellCommand::Classify,
        "reset" => ShellCommand::Reset,
        "sentiment" => ShellCommand::Sentiment(arg),
        "image" => ShellCommand::Image(arg),
        "unimage" => ShellCommand::Unimage,
        "new" => ShellCommand::New,
        "clear" => ShellCommand::Clear,
        "health" => ShellCommand::Health,
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        _ => ShellCommand::Unknown(cmd),
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> std::io::Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    lines.next_line().await
}

/// In-flight indicators visible in a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Indicators {
    thinking: bool,
    loading: bool,
}

impl Indicators {
    fn of(state: &ViewState) -> Self {
        Self {
            thinking: state.chat.as_ref().is_some_and(ChatState::is_thinking),
            loading: state.loading,
        }
    }

    /// Lines for indicators that turn on between `self` and `next`.
    fn newly_on(self, next: Self) -> Vec<&'static str> {
        let mut lines = Vec::new();
        if next.thinking && !self.thinking {
            lines.push("AI is thinking...");
        }
        if next.loading && !self.loading {
            lines.push("Loading...");
        }
        lines
    }
}

async fn shell(controller: &mut Controller) -> anyhow::Result<()> {
    // Thinking and loading indicators go to stderr; the transcript owns stdout.
    let mut updates = controller.subscribe();
    let indicator = tokio::spawn(async move {
        let mut shown = Indicators::default();
        while updates.changed().await.is_ok() {
            let next = Indicators::of(&updates.borrow_and_update());
            for line in shown.newly_on(next) {
                eprintln!("{line}");
            }
            shown = next;
        }
    });

    controller.load().await;
    println!("{}", render::render_status(controller.state().status));
    println!("Type /help for commands.");

    let mut cursor = TranscriptCursor::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_transcript(controller, &mut cursor);

    while let Some(line) = prompt(&mut lines, "> ").await.context("reading stdin")? {
        match parse_shell_line(&line) {
            ShellCommand::Select(path) => {
                if controller.select_image_file(path).await.is_ok() {
                    let upload = &controller.state().upload;
                    println!("{}", render::render_upload(upload, controller.limits()));
                }
            }
            ShellCommand::Classify => {
                if controller.classify_image().await.is_ok() {
                    let upload = &controller.state().upload;
                    println!("{}", render::render_upload(upload, controller.limits()));
                }
            }
            ShellCommand::Reset => {
                let answer = prompt(&mut lines, "Reset image upload? [y/N] ").await?;
                if answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")) {
                    controller.reset_upload();
                    let upload = &controller.state().upload;
                    println!("{}", render::render_upload(upload, controller.limits()));
                }
            }
            ShellCommand::Sentiment(text) => {
                if controller.analyze_sentiment(text).await.is_ok() {
                    if let Some(view) = &controller.state().sentiment {
                        println!("{}", render::render_sentiment(view));
                    }
                }
            }
            ShellCommand::Image(path) => {
                if controller.stage_chat_image_file(path).await.is_ok() {
                    println!("Image attached to the next message.");
                }
            }
            ShellCommand::Unimage => {
                let _ = controller.remove_chat_image();
            }
            ShellCommand::New => {
                let _ = controller.init_new_session();
            }
            ShellCommand::Clear => {
                let _ = controller.clear_history().await;
            }
            ShellCommand::Health => {
                let status = controller.check_health().await;
                println!("{}", render::render_status(status));
            }
            ShellCommand::Show => {
                println!("{}", render::render(controller.state(), controller.limits()));
            }
            ShellCommand::Help => println!("{SHELL_HELP}"),
            ShellCommand::Quit => break,
            ShellCommand::Chat(text) => {
                let _ = controller.send_chat_message(text).await;
            }
            ShellCommand::Unknown(cmd) => println!("Unknown command /{cmd}. Type /help."),
        }
        print_notifications(controller);
        print_transcript(controller, &mut cursor);
    }

    indicator.abort();
    Ok(())
}

fn print_transcript(controller: &Controller, cursor: &mut TranscriptCursor) {
    if let Some(chat) = &controller.state().chat {
        for line in cursor.advance(chat) {
            println!("{line}");
        }
    }
}
