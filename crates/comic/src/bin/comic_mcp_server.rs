//cargo run --package comic --bin comic_mcp_server -- --config comic.toml
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::eyre;
use comic::{
    ComicConfig, ComicPipeline, GeminiClient, PipelineBuilder,
    config::Transport,
    mcp::ComicMcpServer,
};
use rmcp::{ServiceExt, transport::{sse_server::SseServer, stdio}};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP server that turns photos into comic strips")]
struct Args {
    /// TOML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Overrides the configured transport
    #[arg(long)]
    transport: Option<Transport>,

    /// Overrides the configured SSE bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn build_server(config: &ComicConfig, api_key: &str) -> color_eyre::Result<ComicMcpServer> {
    let client = GeminiClient::from_config(&config.model, api_key)?;
    let pipeline: ComicPipeline = PipelineBuilder::from_config(Arc::new(client), config).build();
    tracing::info!("{}", pipeline.info());
    Ok(ComicMcpServer::new(Arc::new(pipeline), config.defaults.clone()))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Set up logging to stderr (MCP uses stdout for protocol communication)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ComicConfig::from_file(path)?,
        None => ComicConfig::default(),
    };
    if let Some(transport) = args.transport {
        config.server.transport = transport;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let api_key = args
        .gemini_api_key
        .or_else(|| config.model.api_key.clone())
        .ok_or_else(|| eyre!("No API key: pass --gemini-api-key or set GEMINI_API_KEY"))?;

    tracing::info!("Starting Comic Strip MCP server");
    let server = build_server(&config, &api_key)?;

    match config.server.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::Sse => serve_sse(server, config.server.bind).await,
    }
}

async fn serve_stdio(server: ComicMcpServer) -> color_eyre::Result<()> {
    let service = match server.serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {:?}", e);
            return Err(e.into());
        }
    };

    tracing::info!("MCP server started, listening on stdio");

    // Handle graceful shutdown
    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => tracing::info!("MCP server completed successfully"),
                Err(e) => {
                    tracing::error!("MCP server error: {:?}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    tracing::info!("MCP server shut down");
    Ok(())
}

async fn serve_sse(server: ComicMcpServer, bind: SocketAddr) -> color_eyre::Result<()> {
    let ct = SseServer::serve(bind).await?.with_service(move || server.clone());
    tracing::info!("MCP server started, listening for SSE on {}", bind);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down gracefully");
    ct.cancel();

    tracing::info!("MCP server shut down");
    Ok(())
}
