use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use travelbot::{Config, commands};

#[derive(Parser)]
#[command(name = "travelbot")]
#[command(version)]
#[command(about = "Chat with a travel assistant from your terminal", long_about = None)]
struct Cli {
    /// Chat endpoint URL (overrides config and TRAVELBOT_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Bearer credential for the endpoint (overrides config and TRAVELBOT_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat screen (default)
    Chat,
    /// Send one message and print the streamed reply
    Ask { text: String },
    /// List the quick-action shortcuts
    Actions,
    /// Show the resolved configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config, interactive: bool) -> Result<()> {
    let default_filter = if cli.verbose {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // the chat screen owns the terminal, so its logs go to a file
    if interactive {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())
            .with_context(|| format!("Failed to open {}", config.log_path().display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.apply_overrides(cli.endpoint.clone(), cli.api_key.clone());

    let interactive = matches!(cli.command, None | Some(Commands::Chat));
    init_tracing(&cli, &config, interactive)?;

    match cli.command {
        None | Some(Commands::Chat) => commands::chat(config).await?,
        Some(Commands::Ask { text }) => commands::ask(config, &text).await?,
        Some(Commands::Actions) => commands::list_actions(),
        Some(Commands::Config { init }) => commands::show_config(&config, init)?,
    }

    Ok(())
}
