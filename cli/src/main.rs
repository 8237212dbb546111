
mod input;
mod render;

use std::time::Duration;

use clap::Parser;
use clap::builder::BoolishValueParser;
use client::error::ConfigError;
use client::controller::{DEFAULT_SIGNAL_ASSET, DEFAULT_SIGNAL_TIMEFRAME};
use client::{ChatConfig, ChatController, ChatError, ChatState, ChatWidget, FrameClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::input::{HELP, Input};
use crate::render::{Renderer, status_report};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "signal-chat", about = "Live support chat for the trading-signal dashboard")]
struct Cli {
    /// Chat backend base URL (http, https, ws or wss).
    #[arg(long, env = "CHAT_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, env = "CHAT_WS_PATH")]
    ws_path: Option<String>,

    /// Room joined by `/join` when none is given.
    #[arg(long, env = "CHAT_ROOM")]
    room: Option<String>,

    /// Join as this name as soon as the connection is up.
    #[arg(long)]
    name: Option<String>,

    #[arg(long, env = "CHAT_CONNECT_TIMEOUT_MS")]
    connect_timeout_ms: Option<u64>,

    /// First reconnect delay; doubles on each failed attempt.
    #[arg(long, env = "CHAT_RECONNECT_MIN_MS")]
    reconnect_min_ms: Option<u64>,

    #[arg(long, env = "CHAT_RECONNECT_MAX_MS")]
    reconnect_max_ms: Option<u64>,

    /// Rejoin the last room automatically after a reconnect.
    #[arg(
        long,
        env = "CHAT_AUTO_REJOIN",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    auto_rejoin: Option<bool>,
}

impl Cli {
    fn apply(&self, mut config: ChatConfig) -> Result<ChatConfig, ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(ws_path) = &self.ws_path {
            config.ws_path.clone_from(ws_path);
        }
        if let Some(room) = &self.room {
            config.room.clone_from(room);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reconnect_min_ms {
            config.reconnect.min = Duration::from_millis(ms);
        }
        if let Some(ms) = self.reconnect_max_ms {
            config.reconnect.max = Duration::from_millis(ms);
        }
        if let Some(auto_rejoin) = self.auto_rejoin {
            config.auto_rejoin = auto_rejoin;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.apply(ChatConfig::from_env()?)?;
    let default_room = config.room.clone();

    let transport = FrameClient::new(&config);
    let widget = ChatWidget::spawn(ChatController::new(transport, config));
    widget.open()?;

    let result = run(&widget, &default_room, cli.name).await;
    widget.shutdown().await;
    result
}

async fn run(widget: &ChatWidget, default_room: &str, mut auto_join: Option<String>) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = widget.subscribe();
    let mut renderer = Renderer::default();
    print_lines(&renderer.render(&view.borrow_and_update()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(()) };
                match Input::parse(&line) {
                    Input::Quit => return Ok(()),
                    input => handle_input(widget, default_room, input).await?,
                }
            }
            changed = view.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = view.borrow_and_update().clone();
                print_lines(&renderer.render(&snapshot));

                if snapshot.state == ChatState::Connected {
                    if let Some(name) = auto_join.take() {
                        report(widget.join(default_room, &name).await)?;
                    }
                }
            }
        }
    }
}

async fn handle_input(widget: &ChatWidget, default_room: &str, input: Input) -> Result<(), CliError> {
    match input {
        Input::Join { name, room } => {
            report(widget.join(room.as_deref().unwrap_or(default_room), &name).await)
        }
        Input::Signal { asset, timeframe } => report(
            widget
                .request_signal_update(
                    asset.as_deref().unwrap_or(DEFAULT_SIGNAL_ASSET),
                    timeframe.as_deref().unwrap_or(DEFAULT_SIGNAL_TIMEFRAME),
                )
                .await,
        ),
        Input::Message(body) => report(widget.send(&body).await),
        Input::Open => Ok(widget.open()?),
        Input::Close => Ok(widget.close()?),
        Input::Status => {
            println!("{}", status_report(&widget.view()));
            Ok(())
        }
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Invalid(text) => {
            eprintln!("{text}");
            Ok(())
        }
        Input::Empty | Input::Quit => Ok(()),
    }
}

/// Print rejected commands and keep going; only a stopped widget is fatal.
fn report(result: Result<(), ChatError>) -> Result<(), CliError> {
    match result {
        Err(ChatError::Validation(e)) => {
            eprintln!("error: {e}");
            Ok(())
        }
        other => Ok(other?),
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
