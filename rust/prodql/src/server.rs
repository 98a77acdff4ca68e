use crate::{
    catalog::Catalog,
    config::AppConfig,
    error::{Result, ServiceError},
    executor::{ClickHouseExecutor, QueryResult, SqlExecutor},
    router::{Decision, QueryRouter},
    state::AppState,
    viz::{plan_chart, ChartPlan},
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

const MAX_QUERY_CHARS: usize = 2_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub query: String,
    /// Overrides the plant-local current date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub decision: Decision,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartPlan>,
}

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::load(config.catalog_path.as_deref())?;
        let executor = ClickHouseExecutor::new(config.store.clone())?;
        Ok(Self::with_parts(config, Arc::new(catalog), Arc::new(executor)))
    }

    /// Assembles a server from prebuilt parts, e.g. a stub executor.
    pub fn with_parts(
        config: AppConfig,
        catalog: Arc<Catalog>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        let config = Arc::new(config);
        let router = Arc::new(QueryRouter::new(catalog, config.utc_offset));
        let state = AppState::new(Arc::clone(&config), router, executor);
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/route", post(Self::route))
            .route("/api/query", post(Self::query))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "prodql listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn route(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<RouteRequest>,
    ) -> Result<Json<Decision>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(decide(&state, &request)?))
    }

    async fn query(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<RouteRequest>,
    ) -> Result<Json<QueryResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let decision = decide(&state, &request)?;

        let (result, chart) = match &decision {
            Decision::CasualReply { .. } => (QueryResult::default(), None),
            Decision::DataQuery {
                sql,
                wants_visualization,
                chart_type,
                ..
            } => {
                let result = state.executor.execute(sql).await?;
                let chart = if *wants_visualization {
                    plan_chart(&result.columns, &result.rows, *chart_type, &request.query)
                } else {
                    None
                };
                (result, chart)
            }
        };

        Ok(Json(QueryResponse {
            decision,
            columns: result.columns,
            rows: result.rows,
            chart,
        }))
    }
}

fn decide(state: &AppState, request: &RouteRequest) -> Result<Decision> {
    if request.query.chars().count() > MAX_QUERY_CHARS {
        return Err(ServiceError::InvalidRequest(format!(
            "query exceeds {MAX_QUERY_CHARS} characters"
        )));
    }
    match request.today {
        Some(today) => state.router.route(&request.query, today),
        None => state.router.route_now(&request.query),
    }
}

fn enforce_api_key(headers: &HeaderMap, config: &AppConfig) -> Result<()> {
    if let Some(expected) = &config.api_key {
        let provided = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Auth);
        }
    }

    Ok(())
}
