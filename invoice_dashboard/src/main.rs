use log::{info, error};
use std::sync::Arc;

mod config;
mod core;
mod web;

use crate::config::AppConfig;
use crate::core::store::SqliteStore;
use crate::web::server::{start_web_server, AppState};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting Invoice Dashboard...");

    if let Err(e) = run().await {
        error!("Invoice Dashboard stopped with an error: {}", e);
        std::process::exit(1);
    }

    info!("Invoice Dashboard shutdown complete");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    info!("Configuration loaded: {:?}", config);

    // Open the database and make sure the schema exists
    let store = if config.database_path == ":memory:" {
        SqliteStore::open_in_memory()?
    } else {
        SqliteStore::open(&config.database_path)?
    };
    store.init_schema().await?;
    if config.seed_demo_data {
        store.seed_demo_data().await?;
    }
    info!("Database ready at {}", config.database_path);

    let state = AppState::new(Arc::new(store), config.page_cache_capacity);

    // actix-web stops on Ctrl+C by itself
    info!("Invoice Dashboard is now running. Press Ctrl+C to stop.");
    start_web_server(config, state).await?;

    info!("Shutting down Invoice Dashboard...");
    Ok(())
}
