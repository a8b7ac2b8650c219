use anyhow::{Context, Result};
use clap::Parser;
use okta_mcp_server::config::{Cli, LogFormat, OktaConfig};
use okta_mcp_server::{HttpOktaClient, OktaAuthManager, OktaMcpServer};
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logs go to stderr; stdout carries the MCP stream.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| "info".into());

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match cli.log_format {
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        LogFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .boxed(),
    });

    let mut guard = None;
    if let Some(path) = &cli.log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let file_name = path
            .file_name()
            .context("log file path has no file name")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let (writer, worker_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    info!(
        "Starting okta-mcp-server {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown")
    );

    let config = OktaConfig::from_cli(&cli).context("invalid Okta configuration")?;
    let org_url = config.org_url.clone();
    let pagination = config.pagination;

    let auth = Arc::new(OktaAuthManager::new(config)?);
    auth.authenticate()
        .await
        .context("authentication with Okta failed")?;

    let api = HttpOktaClient::new(&org_url, auth.clone())?;
    let server = OktaMcpServer::new(Arc::new(api), pagination, &org_url);

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("Error starting MCP server: {:?}", e);
    })?;
    info!("Okta MCP server ready on stdio");
    let reason = service.waiting().await?;
    info!("MCP session ended: {:?}", reason);

    auth.clear_tokens().await;
    Ok(())
}
