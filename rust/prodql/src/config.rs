use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub store: StoreConfig,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    /// Offset used to decide what "today" is for incoming questions.
    pub utc_offset: FixedOffset,
    /// External catalog; the embedded one is used when unset.
    pub catalog_path: Option<String>,
}

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    prodql_listen_addr: Option<String>,
    #[serde(default)]
    prodql_listen_host: Option<String>,
    #[serde(default)]
    prodql_listen_port: Option<u16>,
    #[serde(default)]
    prodql_store_url: Option<String>,
    #[serde(default)]
    prodql_store_user: Option<String>,
    #[serde(default)]
    prodql_store_password: Option<String>,
    #[serde(default)]
    prodql_store_database: Option<String>,
    #[serde(default)]
    prodql_api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    prodql_request_timeout_secs: u64,
    #[serde(default = "default_utc_offset_minutes")]
    prodql_utc_offset_minutes: i32,
    #[serde(default)]
    prodql_catalog_path: Option<String>,
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Asia/Colombo, where the stenters run.
const fn default_utc_offset_minutes() -> i32 {
    330
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse PRODQL_* environment variables")?;

        let listen_addr = resolve_addr(
            raw.prodql_listen_addr,
            raw.prodql_listen_host,
            raw.prodql_listen_port,
        )?;

        let utc_offset = FixedOffset::east_opt(raw.prodql_utc_offset_minutes * 60)
            .context("PRODQL_UTC_OFFSET_MINUTES must be within +/- 24h")?;

        let request_timeout = Duration::from_secs(raw.prodql_request_timeout_secs.max(1));

        let store = StoreConfig {
            url: non_empty(raw.prodql_store_url)
                .unwrap_or_else(|| "http://localhost:8123".to_string()),
            user: non_empty(raw.prodql_store_user),
            password: raw.prodql_store_password,
            database: non_empty(raw.prodql_store_database),
            timeout: request_timeout,
        };

        Ok(Self {
            listen_addr,
            store,
            api_key: non_empty(raw.prodql_api_key),
            request_timeout,
            utc_offset,
            catalog_path: non_empty(raw.prodql_catalog_path),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid PRODQL_LISTEN_ADDR value")?
            .next()
            .context("PRODQL_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid PRODQL listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
