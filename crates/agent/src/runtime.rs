use std::sync::Arc;

use shopchat_core::catalog::{CatalogProvider, CatalogSnapshot, CATALOG_LOAD_ERROR};
use shopchat_core::{ApplicationError, ChatTurn};
use tracing::{error, info};

use crate::llm::LlmClient;
use crate::prompt::PromptTemplate;

/// Stateless per-request orchestration: catalog → prompt → model → order extraction.
pub struct ChatRuntime {
    llm: Option<Arc<dyn LlmClient>>,
    catalog: Option<Arc<CatalogProvider>>,
    prompt: PromptTemplate,
}

impl ChatRuntime {
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        catalog: Option<Arc<CatalogProvider>>,
        prompt: PromptTemplate,
    ) -> Self {
        Self { llm, catalog, prompt }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.llm.is_some()
    }

    pub fn catalog(&self) -> Option<&Arc<CatalogProvider>> {
        self.catalog.as_ref()
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Catalog snapshot for this request, or `None` when the catalog is disabled.
    /// The source is read on the blocking pool.
    pub async fn catalog_snapshot(&self) -> Option<CatalogSnapshot> {
        let provider = Arc::clone(self.catalog.as_ref()?);
        match tokio::task::spawn_blocking(move || provider.current()).await {
            Ok(snapshot) => Some(snapshot),
            Err(join_error) => {
                error!(
                    event_name = "catalog.load.panicked",
                    error = %join_error,
                    "catalog load task did not complete"
                );
                Some(CatalogSnapshot {
                    text: CATALOG_LOAD_ERROR.into(),
                    row_count: 0,
                    error: Some(join_error.to_string()),
                })
            }
        }
    }

    /// Runs one chat turn. `correlation_id` tags the turn's log events so they
    /// line up with the HTTP request that triggered them.
    pub async fn handle_message(
        &self,
        message: &str,
        correlation_id: &str,
    ) -> Result<ChatTurn, ApplicationError> {
        let Some(llm) = &self.llm else {
            return Err(ApplicationError::ModelNotLoaded);
        };

        let message = message.trim();
        if message.is_empty() {
            return Err(ApplicationError::InvalidRequest("message is empty".to_string()));
        }

        let catalog = self.catalog_snapshot().await;
        let prompt = self.prompt.compose(catalog.as_ref().map(|snapshot| &*snapshot.text), message);

        let raw_reply = llm
            .complete(&prompt)
            .await
            .map_err(|error| ApplicationError::Integration(format!("{error:#}")))?;

        let turn = ChatTurn::new(message, raw_reply);
        info!(
            event_name = "chat.turn.completed",
            correlation_id = %correlation_id,
            is_order = turn.is_order,
            catalog_rows = catalog.as_ref().map(|snapshot| snapshot.row_count).unwrap_or(0),
            "chat turn completed"
        );
        Ok(turn)
    }
}
