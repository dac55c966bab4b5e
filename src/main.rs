//! Supervisor: parses configuration, loads durable state, and runs the
//! listener (C6) and expiration scanner (C4) to completion or shutdown.

use std::sync::Arc;

use clap::Parser;
use dhcpd::config::Config;
use dhcpd::pool::Pool;
use dhcpd::store::Store;
use dhcpd::{listener, logging, scanner};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(config.log_file_path.as_deref())?;

    let initial_pool = Pool::load_from_file(&config.pool_file_path)?;
    info!(count = initial_pool.len(), "loaded pool file");

    let store = Arc::new(Store::new(
        initial_pool,
        config.pool_file_path.clone(),
        config.blocklist_file_path.clone(),
    ));
    let config = Arc::new(config);

    let socket = listener::bind()?;
    info!(server_ip = %config.server_ip, "listening on 0.0.0.0:67");

    let listener_task = tokio::spawn(listener::run(socket, Arc::clone(&store), Arc::clone(&config)));
    let scanner_task = tokio::spawn(scanner::run(Arc::clone(&store)));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
        }
        result = listener_task => {
            if let Err(err) = result {
                tracing::error!(%err, "listener task panicked");
            }
        }
        result = scanner_task => {
            if let Err(err) = result {
                tracing::error!(%err, "scanner task panicked");
            }
        }
    }

    Ok(())
}
