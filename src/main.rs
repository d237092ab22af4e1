//! shardkv - A Sharded In-Memory Key-Value Store
//!
//! This is the main entry point for the shardkv server.
//! It sets up the TCP listener, storage engine, and handles incoming connections.

use clap::Parser;
use shardkv::api::ApiHandler;
use shardkv::config::ServerConfig;
use shardkv::connection::{handle_connection, ConnectionStats};
use shardkv::storage::ShardedStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
shardkv v{} - Sharded In-Memory Key-Value Store
──────────────────────────────────────────────────────────────
Server started on {}
Shards: {}  Replicas: {}  Default TTL: {}s

  curl -X POST localhost:{}/set -d '{{"key":"name","value":"Ada"}}'
  curl 'localhost:{}/get?key=name'

Use Ctrl+C to shutdown gracefully.
"#,
        shardkv::VERSION,
        config.bind_address(),
        config.shards,
        config.replicas,
        config.default_ttl,
        config.port,
        config.port,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = ServerConfig::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardkv=info".into()),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    // Create the storage engine (shared across all connections)
    let store = Arc::new(ShardedStore::with_config(config.store_config()));
    info!(
        shards = store.num_shards(),
        replicas = store.replicas(),
        "Storage engine initialized"
    );

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                // Without a signal handler, run until the accept loop ends
                std::future::pending::<()>().await;
            }
        }
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&store), stats, config.default_ttl()) => {}
        _ = shutdown => {}
    }

    let final_stats = store.stats();
    info!(
        keys = final_stats.keys,
        sets = final_stats.set_ops,
        gets = final_stats.get_ops,
        hits = final_stats.hits,
        expired = final_stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    store: Arc<ShardedStore>,
    stats: Arc<ConnectionStats>,
    default_ttl: Duration,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                // Create a request handler for this connection
                let api = ApiHandler::new(Arc::clone(&store), default_ttl);
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, api, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
