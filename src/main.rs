//! learnchat - terminal chat client for a learning-plan assistant

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

mod app;
mod backend;
mod config;
mod conversation;
mod handler;
mod plan;
mod timeago;
mod tui;
mod ui;

use app::App;
use backend::BackendClient;
use config::Config;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "learnchat")]
#[command(about = "Chat with a learning assistant and explore curriculum plans")]
struct Cli {
    /// Config file (default: <config dir>/learnchat/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Chat endpoint, overrides config and LEARNCHAT_BACKEND_URL
    #[arg(short, long)]
    backend_url: Option<String>,
    /// Maximum message length in characters
    #[arg(long)]
    max_length: Option<usize>,
    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,
    /// Write the effective configuration to the config file
    InitConfig,
}

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(|s| s.to_uppercase()).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Log to a file: the terminal belongs to the TUI.
fn setup_logging(level: tracing::Level) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learnchat")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_path = log_dir.join("learnchat.log");
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!(path = %log_path.display(), "Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(max) = cli.max_length {
        config.max_message_length = max;
    }

    let level = parse_level(cli.log_level.as_deref().or(config.log_level.as_deref()));
    setup_logging(level).context("Failed to setup logging")?;
    info!(backend = %config.backend_url, max = config.max_message_length, "learnchat starting");

    match cli.command {
        Some(Commands::Health) => check_health(&config).await,
        Some(Commands::InitConfig) => {
            config.save(cli.config.as_deref()).context("Failed to write configuration")?;
            println!("{} configuration written", "✓".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            run_chat(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn check_health(config: &Config) -> Result<ExitCode> {
    let client = BackendClient::new(&config.backend_url);
    println!("🩺 Checking {}", client.health_url().cyan());

    match client.health().await {
        Ok(status) if status == "ok" => {
            println!("{} backend status: {}", "✓".green().bold(), status.green());
            Ok(ExitCode::SUCCESS)
        }
        Ok(status) => {
            println!("{} backend status: {}", "!".yellow().bold(), status.yellow());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            warn!(error = %e, "health check failed");
            println!("{}: {}", "Backend unreachable".red(), e);
            println!("Is the server running at {}?", config.backend_url.bold());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_chat(config: &Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialize terminal")?;

    let mut app = App::new(config);
    let mut events = EventHandler::new(config.refresh_interval());

    let result = async {
        loop {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };
                    handler::handle_event(&mut app, event)?;
                }
                () = app.await_reply() => {}
            }

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    // Teardown: stop the ticks and drop any reply still in flight
    events.shutdown();
    app.shutdown();
    tui::restore()?;
    info!(entries = app.conversation.len(), "learnchat exiting");

    result
}
