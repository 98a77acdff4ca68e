use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use chrono::FixedOffset;
use prodql::{
    catalog::Catalog,
    config::{AppConfig, StoreConfig},
    error::{Result, ServiceError},
    executor::{QueryResult, SqlExecutor},
    server::Server,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key";

/// Executor that records every statement and answers with a canned result.
#[derive(Default)]
pub struct StubExecutor {
    result: QueryResult,
    fail: bool,
    seen: Mutex<Vec<String>>,
}

impl StubExecutor {
    pub fn returning(result: QueryResult) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlExecutor for StubExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.seen.lock().unwrap().push(sql.to_string());
        if self.fail {
            return Err(ServiceError::Execution("connection refused".to_string()));
        }
        Ok(self.result.clone())
    }
}

pub struct ProdqlTestHarness {
    router: Router,
    pub executor: Arc<StubExecutor>,
}

impl ProdqlTestHarness {
    pub fn new(executor: StubExecutor) -> Self {
        let executor = Arc::new(executor);
        let server = Server::with_parts(
            test_config(),
            Arc::new(Catalog::embedded().expect("embedded catalog should load")),
            executor.clone(),
        );
        Self {
            router: server.router(),
            executor,
        }
    }

    pub async fn post<T: Serialize>(&self, path: &str, payload: &T) -> http::Response<Body> {
        self.request("POST", path, Some(payload), true).await
    }

    pub async fn post_without_api_key<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> http::Response<Body> {
        self.request("POST", path, Some(payload), false).await
    }

    pub async fn get(&self, path: &str) -> http::Response<Body> {
        self.request::<()>("GET", path, None, false).await
    }

    async fn request<T: Serialize>(
        &self,
        method: &str,
        path: &str,
        payload: Option<&T>,
        include_api_key: bool,
    ) -> http::Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(http::header::CONTENT_TYPE, "application/json");

        if include_api_key {
            builder = builder.header("x-api-key", API_KEY);
        }

        let body = match payload {
            Some(payload) => {
                Body::from(serde_json::to_vec(payload).expect("request payload should serialize"))
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        listen_addr: "127.0.0.1:0".parse().expect("static address"),
        store: StoreConfig {
            url: "http://127.0.0.1:8123".to_string(),
            user: None,
            password: None,
            database: None,
            timeout: Duration::from_secs(1),
        },
        api_key: Some(API_KEY.to_string()),
        request_timeout: Duration::from_secs(1),
        utc_offset: FixedOffset::east_opt(330 * 60).expect("static offset"),
        catalog_path: None,
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should deserialize");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
