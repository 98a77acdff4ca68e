use crate::{config::AppConfig, executor::SqlExecutor, router::QueryRouter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub router: Arc<QueryRouter>,
    pub executor: Arc<dyn SqlExecutor>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        router: Arc<QueryRouter>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            config,
            router,
            executor,
        }
    }
}
