// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! emd: the embermud driver daemon
//!
//! Usage: `emd [config-file]`. Without an argument, `embermud.toml` in the
//! working directory is used when present, defaults otherwise. Runs until
//! ctrl-c, then shuts down gracefully (world and permissions are saved).

use em_driver::{Driver, DriverConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("emd: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let driver = Driver::new(config)?;
    driver.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("ctrl-c received, shutting down");
    driver.stop().await;
    Ok(())
}

fn load_config() -> Result<DriverConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(DriverConfig::load(path)?),
        None => {
            let default = std::path::Path::new("embermud.toml");
            if default.exists() {
                Ok(DriverConfig::load(default)?)
            } else {
                Ok(DriverConfig::default())
            }
        }
    }
}
