//! my-claude CLI - serve the chat backend.

use clap::{Parser, Subcommand};
use my_claude::api::{create_router_with_state, AppState};
use my_claude::config::{Config, LogVerbosity, APP_DESCRIPTION};
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "my-claude")]
#[command(about = APP_DESCRIPTION)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Exchange log verbosity
        #[arg(short, long, value_enum)]
        log_level: Option<LogLevel>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the file-based configuration (without env overrides) to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Minimal,
    Compact,
    Verbose,
}

impl From<LogLevel> for LogVerbosity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Minimal => LogVerbosity::Minimal,
            LogLevel::Compact => LogVerbosity::Compact,
            LogLevel::Verbose => LogVerbosity::Verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, log_level, config }) => {
            run_server(host, port, log_level, config).await?;
        }
        Some(Commands::Config { path, init }) => {
            show_config(path, init)?;
        }
        None => {
            run_server(None, None, None, None).await?;
        }
    }

    Ok(())
}

async fn run_server(
    host_override: Option<String>,
    port_override: Option<u16>,
    log_level: Option<LogLevel>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_env_overrides();

    if let Some(host) = host_override {
        config.server.host = host;
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(level) = log_level {
        config.logging.verbosity = level.into();
    }

    let default_level = if config.server.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    if config.anthropic.api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY is not set; /chat will answer 503");
    }
    if !config.default_model_in_catalog() {
        tracing::warn!(
            "Default model {} is not in the model catalog",
            config.anthropic.default_model
        );
    }

    let state = AppState::from_config(&config)?;
    let app = create_router_with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    match config.logging.verbosity {
        LogVerbosity::Minimal => {
            println!("my-claude:{}", config.server.port);
        }
        LogVerbosity::Compact => {
            println!("→ my-claude starting on http://{}", addr);
        }
        LogVerbosity::Verbose => {
            println!("────────────────────────────────────────");
            println!("my-claude v{}", env!("CARGO_PKG_VERSION"));
            println!("────────────────────────────────────────");
            println!("Server:     http://{}", addr);
            println!("Health:     http://{}/health", addr);
            println!("Models:     http://{}/models", addr);
            println!("Chat:       http://{}/chat", addr);
            println!("Model:      {}", config.anthropic.default_model);
            println!("────────────────────────────────────────");
        }
    }

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\nServer stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

fn show_config(show_path: bool, init: bool) -> anyhow::Result<()> {
    if show_path {
        println!("{}", Config::default_path().display());
        return Ok(());
    }

    if init {
        let path = Config::default_path();
        Config::load()?.save_to(path.clone())?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let mut config = Config::load()?.with_env_overrides();
    if config.anthropic.api_key.is_some() {
        config.anthropic.api_key = Some("********".to_string());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
