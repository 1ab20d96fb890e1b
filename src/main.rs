//! Google Toolbox MCP Server
//!
//! A Model Context Protocol server exposing Gmail, Google Calendar, Google
//! Drive, and Google Custom Search as tools over stdio.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use google_toolbox_mcp::config::Config;
use google_toolbox_mcp::error::Result;
use google_toolbox_mcp::google::auth::CredentialStore;
use google_toolbox_mcp::google::services::ServiceFactory;
use google_toolbox_mcp::mcp::server::McpServer;
use google_toolbox_mcp::mcp::tools::ToolHandler;

/// Google Toolbox MCP Server
#[derive(Parser)]
#[command(name = "google-toolbox-mcp")]
#[command(
    author,
    version,
    about = "MCP server for Gmail, Google Calendar, Google Drive, and Google Custom Search"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain a refresh token via the browser consent flow (run this first)
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::new()?;
    let _log_guard = init_logging(&config);

    let cli = Cli::parse();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let credentials = Arc::new(CredentialStore::new(&config, http.clone()));

    match cli.command {
        Some(Commands::Auth) => {
            credentials.authenticate_interactive().await?;
            eprintln!("Authentication completed successfully!");
        }
        None => {
            run_server(config, http, credentials).await?;
        }
    }

    Ok(())
}

/// Initialize tracing to stderr, or to a rolling file when LOG_TO_FILE is set.
///
/// The returned guard keeps the file writer flushing for the process lifetime.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    if config.log_to_file {
        match std::fs::create_dir_all(&config.log_dir) {
            Ok(()) => {
                let appender =
                    tracing_appender::rolling::daily(&config.log_dir, "google-toolbox.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
                return Some(guard);
            }
            Err(err) => {
                eprintln!(
                    "Could not create log directory {}: {}; logging to stderr",
                    config.log_dir.display(),
                    err
                );
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    None
}

async fn run_server(
    config: Config,
    http: reqwest::Client,
    credentials: Arc<CredentialStore>,
) -> Result<()> {
    // Startup probe only warns: the server still serves tool calls, which
    // then surface the auth failure in their envelopes.
    match credentials.acquire().await {
        Ok(_) => tracing::info!("initial Google credential check succeeded"),
        Err(err) => {
            tracing::warn!("initial Google credential check failed: {}", err);
            tracing::warn!(
                "set GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN in .env, or run 'google-toolbox-mcp auth'"
            );
        }
    }

    let services = ServiceFactory::new(http, config.api_key.clone(), config.cse_id.clone());
    let handler = ToolHandler::new(credentials, services, config.time_zone.clone());

    tracing::info!("starting MCP server on stdio");
    let mut server = McpServer::new(handler);
    server.run_stdio().await
}
