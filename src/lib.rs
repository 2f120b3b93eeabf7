pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::EncoreError;
pub use models::*;

use anyhow::Result;
use std::sync::Arc;

/// Process-wide state: explicit configuration and the two orchestrators,
/// constructed once and shared by reference with whatever invokes them.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<services::catalog::CatalogStore>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub monitoring_service: Arc<services::monitoring::MonitoringService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let catalog = Arc::new(services::catalog::CatalogStore::new());

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(config.clone(), catalog.clone())?,
        );

        let monitoring_service = Arc::new(services::monitoring::MonitoringService::new(
            config.clone(),
        ));

        Ok(Self {
            config,
            catalog,
            recommendation_service,
            monitoring_service,
        })
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
