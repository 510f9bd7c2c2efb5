use std::sync::Arc;

use shopchat_agent::{build_llm_client, ChatRuntime, PromptTemplate};
use shopchat_core::catalog::{CatalogProvider, SpreadsheetSource};
use shopchat_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<ChatRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("language model client could not be built: {0:#}")]
    LlmClient(#[source] anyhow::Error),
    #[error("catalog warm-up task failed: {0}")]
    CatalogWarmup(#[source] tokio::task::JoinError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let llm = build_llm_client(&config.llm).map_err(BootstrapError::LlmClient)?;
    if llm.is_some() {
        info!(
            event_name = "system.bootstrap.model_loaded",
            correlation_id = "bootstrap",
            provider = ?config.llm.provider,
            model = %config.llm.model,
            "language model client ready"
        );
    }

    let catalog = if config.catalog.enabled {
        let source = Arc::new(SpreadsheetSource::new(config.catalog.path.clone()));
        let provider = Arc::new(CatalogProvider::new(source, config.catalog.refresh));
        let warm = Arc::clone(&provider);
        let snapshot = tokio::task::spawn_blocking(move || warm.refresh())
            .await
            .map_err(BootstrapError::CatalogWarmup)?;

        if snapshot.is_healthy() {
            info!(
                event_name = "system.bootstrap.catalog_loaded",
                correlation_id = "bootstrap",
                source = %provider.describe_source(),
                refresh = ?provider.strategy(),
                row_count = snapshot.row_count,
                "product catalog loaded"
            );
        } else {
            warn!(
                event_name = "system.bootstrap.catalog_degraded",
                correlation_id = "bootstrap",
                source = %provider.describe_source(),
                "product catalog unreadable; chat will continue without product data"
            );
        }
        Some(provider)
    } else {
        info!(
            event_name = "system.bootstrap.catalog_disabled",
            correlation_id = "bootstrap",
            "product catalog disabled"
        );
        None
    };

    let runtime = ChatRuntime::new(llm, catalog, PromptTemplate::new(config.shop.name.clone()));
    Ok(Application { config, runtime: Arc::new(runtime) })
}
