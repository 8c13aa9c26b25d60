//! Shared application state

use clinova_plans::PlanService;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub plans: PlanService,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            plans: PlanService::new(pool.clone()),
            pool,
        }
    }
}
