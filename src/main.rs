//! API gateway (v1)
//!
//! Single entry point for the platform's HTTP services.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                     API GATEWAY                      │
//!                       │                                                      │
//!   Client Request      │  ┌────────┐   ┌─────────┐   ┌──────────┐             │
//!   ────────────────────┼─▶│  http  │──▶│ routing │──▶│ security │             │
//!                       │  │ server │   │ router  │   │admission │             │
//!                       │  └────────┘   └─────────┘   └────┬─────┘             │
//!                       │                                  │                   │
//!                       │                                  ▼                   │
//!                       │                           ┌─────────────┐  identity  │
//!                       │                           │   proxy     │◀──────────▶│── Identity
//!                       │                           │ dispatcher  │  pre-action│   System
//!                       │                           └──────┬──────┘            │
//!                       │                                  ▼                   │
//!   Client Response     │  ┌────────┐   ┌─────────┐   ┌──────────┐             │
//!   ◀───────────────────┼──│response│◀──│ outcome │◀──│forwarder │◀────────────┼── Downstream
//!                       │  └────────┘   └─────────┘   └──────────┘             │   Service
//!                       │                                                      │
//!                       │  Cross-cutting: config, observability, lifecycle     │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use api_gateway::config::load_config;
use api_gateway::lifecycle::startup;

#[derive(Parser, Debug)]
#[command(name = "api-gateway", version, about = "HTTP API gateway")]
struct Args {
    /// Path to a TOML config file. Defaults and environment apply without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    startup::init_observability(&config)?;

    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
