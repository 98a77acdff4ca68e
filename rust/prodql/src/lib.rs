//! Natural-language analytics over stenter production data: questions in,
//! ClickHouse SQL (and chart plans) out.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod intent;
pub mod mapping;
pub mod models;
pub mod router;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod template;
pub mod time;
pub mod viz;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config)?.run().await
}
