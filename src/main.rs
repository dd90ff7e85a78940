use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use umami_mcp::config::{Config, CONFIG_PATH_ENV};
use umami_mcp::mcp::{stdio::run_stdio, CapabilityRegistry, McpServer};
use umami_mcp::router::create_app_router;
use umami_mcp::session::SessionManager;
use umami_mcp::umami::UmamiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Line-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// Session-based JSON-RPC over POST /mcp
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "umami-mcp")]
#[command(version, about = "MCP server for Umami web analytics", long_about = None)]
struct Cli {
    /// Transport to serve
    #[arg(short, long, value_enum, env = "TRANSPORT", default_value = "stdio")]
    transport: Transport,

    /// Port to listen on (http transport)
    #[arg(short, long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Address to bind to (http transport)
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Path to TOML configuration file (stdio transport). YAML `config.yaml` files
    /// are not read; rewrite them as `config.toml` with the same keys
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout belongs to the stdio protocol stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umami_mcp=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let registry = Arc::new(CapabilityRegistry::new());

    match cli.transport {
        Transport::Stdio => serve_stdio(cli.config, registry).await,
        Transport::Http => serve_http(&cli.bind, cli.port, registry).await,
    }
}

async fn serve_stdio(config_path: Option<PathBuf>, registry: Arc<CapabilityRegistry>) -> Result<()> {
    let path = config_path.unwrap_or_else(Config::default_path);
    let config = Config::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    let client = UmamiClient::connect(&config)
        .await
        .context("failed to authenticate with Umami")?;
    tracing::info!(host = %client.base_url(), "Umami MCP server starting on stdio");

    let server = McpServer::new(client, registry);
    run_stdio(&server).await?;

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

async fn serve_http(bind: &str, port: u16, registry: Arc<CapabilityRegistry>) -> Result<()> {
    let state = Arc::new(SessionManager::new(registry));
    let app = create_app_router(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Umami MCP server running on http://{}/mcp", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
