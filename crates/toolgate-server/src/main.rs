use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use toolgate_core::GatewayConfig;
use toolgate_mcp::ToolRegistry;
use toolgate_server::app_state::AppState;

const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "toolgate-server", about = "Tool gateway for Slack, GitHub and Google APIs")]
struct Args {
    /// Speak MCP JSON-RPC on stdin/stdout instead of serving HTTP
    #[arg(long)]
    stdio: bool,

    /// Address to bind the HTTP server to
    #[arg(long, env = "TOOLGATE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port for the HTTP server
    #[arg(long, env = "TOOLGATE_PORT", default_value_t = 4000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring malformed .env file"),
    }

    let args = Args::parse();

    let config = GatewayConfig::from_env().context("invalid configuration")?;
    let tools = toolgate_integrations::build_tools(&config)?;
    let registry = ToolRegistry::new(tools)?;
    tracing::info!(tools = registry.len(), "tool registry ready");

    let state = AppState::new(registry).with_integrations(&config);

    if args.stdio {
        tracing::info!("serving MCP over stdio");
        toolgate_server::stdio::serve_stdio(&state.mcp).await?;
        return Ok(());
    }

    toolgate_server::session::spawn_reaper(&state.sessions, SESSION_REAP_INTERVAL);
    let app = toolgate_server::router::create_router(state);

    let addr = std::net::SocketAddr::new(args.host, args.port);
    tracing::info!("toolgate listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
