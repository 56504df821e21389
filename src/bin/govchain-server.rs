#![forbid(unsafe_code)]
//! HTTP server exposing the ledger and governance API

use std::net::SocketAddr;
use std::sync::Arc;
use govchain::api::{run_api_server, ApiContext};
use govchain::cli::{init_tracing, load_node_from_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (config, node) = load_node_from_config()?;
    let api_key = config.require_api_key()?.to_string();
    tracing::info!(
        db = %config.database.path,
        height = node.height().await,
        "Starting govchain server"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let ctx = Arc::new(ApiContext::new(node, api_key));

    run_api_server(ctx, addr).await
}
