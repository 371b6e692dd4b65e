//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use fbdeck_core::config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "fbdeck")]
#[command(version)]
#[command(about = "Log in with Facebook and read your own posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in, print your most recent posts and exit
    Posts,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Some(Commands::Posts) => {
            let config = config::Config::load().context("load config")?;
            commands::session::posts(&config).await
        }
        // default to the interactive session
        None => {
            let config = config::Config::load().context("load config")?;
            commands::session::interactive(&config).await
        }
    }
}

/// Sends `tracing` output to `$FBDECK_HOME/logs/fbdeck.log`, filtered by
/// `FBDECK_LOG` (default `warn`). Logging is skipped if the directory is
/// unusable.
fn init_logging() -> Option<WorkerGuard> {
    let dir = config::paths::logs_dir();
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::NEVER)
        .filename_prefix("fbdeck.log")
        .build(&dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = tracing_subscriber::EnvFilter::try_from_env("FBDECK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .ok()?;

    Some(guard)
}
