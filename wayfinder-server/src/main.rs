use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wayfinder_core::{GraphData, loading::create_campus_graph};
use wayfinder_server::{AppState, ServerConfig, router};

/// Campus route planning and guidance server
#[derive(Parser, Debug)]
#[command(name = "wayfinder-server", version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "WAYFINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Campus graph JSON, overrides `graph_path` from the configuration
    #[arg(short, long, env = "WAYFINDER_GRAPH")]
    graph: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long, env = "WAYFINDER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WAYFINDER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(graph) = args.graph {
        config.graph_path = Some(graph);
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let graph_path = config
        .graph_path
        .clone()
        .ok_or("no campus graph given, use --graph or set graph_path")?;
    let text = std::fs::read_to_string(&graph_path)
        .map_err(|e| format!("cannot read {}: {e}", graph_path.display()))?;
    let graph = create_campus_graph(&config.graph, GraphData::from_json(&text)?)?;
    tracing::info!(
        path = %graph_path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Campus graph loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = router(Arc::new(AppState::new(graph, config)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
