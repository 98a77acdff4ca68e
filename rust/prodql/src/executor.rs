//! Execution seam. The core only produces SQL; running it belongs to an
//! [`SqlExecutor`] so the HTTP shell can swap stores and tests can stub it.

use crate::{
    config::StoreConfig,
    error::{Result, ServiceError},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// Runs SQL over the ClickHouse HTTP interface.
#[derive(Clone)]
pub struct ClickHouseExecutor {
    client: Client,
    config: Arc<StoreConfig>,
}

#[derive(Deserialize)]
struct CompactResponse {
    meta: Vec<CompactColumn>,
    data: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct CompactColumn {
    name: String,
}

impl ClickHouseExecutor {
    pub fn new(config: StoreConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl SqlExecutor for ClickHouseExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let body = format!("{}\nFORMAT JSONCompact", sql.trim().trim_end_matches(';'));
        let mut request = self.client.post(self.config.url.trim_end_matches('/')).body(body);
        if let Some(database) = &self.config.database {
            request = request.query(&[("database", database.as_str())]);
        }
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|err| ServiceError::Execution(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = %status, "store rejected query");
            return Err(ServiceError::Execution(format!(
                "store returned status {status}: {}",
                detail.trim()
            )));
        }

        let payload: CompactResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::Execution(format!("malformed store response: {err}")))?;

        let columns: Vec<String> = payload.meta.into_iter().map(|col| col.name).collect();
        if let Some(bad) = payload.data.iter().find(|row| row.len() != columns.len()) {
            return Err(ServiceError::Execution(format!(
                "store returned a row of width {} for {} columns",
                bad.len(),
                columns.len()
            )));
        }

        debug!(rows = payload.data.len(), columns = columns.len(), "query executed");
        Ok(QueryResult {
            columns,
            rows: payload.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn compact_payload_deserializes() {
        let raw = r#"{
            "meta": [{"name": "machine", "type": "String"}, {"name": "production_length", "type": "Float64"}],
            "data": [["TJ-Stenter01 Length(ioid2)", 1200.5]],
            "rows": 1,
            "statistics": {"elapsed": 0.01}
        }"#;
        let payload: CompactResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.meta[1].name, "production_length");
        assert_eq!(payload.data.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_store_is_an_execution_error() {
        let executor = ClickHouseExecutor::new(StoreConfig {
            url: "http://127.0.0.1:1".to_string(),
            user: None,
            password: None,
            database: None,
            timeout: Duration::from_millis(500),
        })
        .unwrap();
        let err = executor.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Execution(_)));
    }
}
