use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{render_catalog, CatalogSource, CATALOG_LOAD_ERROR};

/// When the catalog source is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Read once and serve the cached text until [`CatalogProvider::refresh`] is called.
    #[default]
    Startup,
    /// Re-read the source for every request.
    PerRequest,
}

impl std::str::FromStr for RefreshStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "startup" | "once" => Ok(Self::Startup),
            "per_request" | "always" => Ok(Self::PerRequest),
            other => Err(format!(
                "unsupported catalog refresh strategy `{other}` (expected startup|per_request)"
            )),
        }
    }
}

/// Rendered catalog text together with how it was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub text: Arc<str>,
    pub row_count: usize,
    pub error: Option<String>,
}

impl CatalogSnapshot {
    /// Reads and renders `source`. Never fails: an unreadable source yields
    /// [`CATALOG_LOAD_ERROR`] as the catalog text.
    pub fn load(source: &dyn CatalogSource) -> Self {
        match source.load_rows() {
            Ok(rows) => {
                debug!(
                    event_name = "catalog.load.succeeded",
                    source = %source.describe(),
                    row_count = rows.len(),
                    "product catalog loaded"
                );
                Self { text: render_catalog(&rows).into(), row_count: rows.len(), error: None }
            }
            Err(error) => {
                warn!(
                    event_name = "catalog.load.failed",
                    source = %source.describe(),
                    error = %error,
                    "product catalog could not be loaded"
                );
                Self { text: CATALOG_LOAD_ERROR.into(), row_count: 0, error: Some(error.to_string()) }
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Read-mostly holder of catalog text with a caller-chosen refresh policy.
///
/// Concurrent readers of a per-request provider each read the source on their
/// own; the source is treated as slowly-changing reference data and is never
/// locked.
pub struct CatalogProvider {
    source: Arc<dyn CatalogSource>,
    strategy: RefreshStrategy,
    cached: RwLock<Option<CatalogSnapshot>>,
}

impl CatalogProvider {
    pub fn new(source: Arc<dyn CatalogSource>, strategy: RefreshStrategy) -> Self {
        Self { source, strategy, cached: RwLock::new(None) }
    }

    pub fn strategy(&self) -> RefreshStrategy {
        self.strategy
    }

    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    /// Catalog text for the current request, honouring the refresh strategy.
    pub fn current(&self) -> CatalogSnapshot {
        if self.strategy == RefreshStrategy::Startup {
            if let Some(snapshot) = self.last_loaded() {
                return snapshot;
            }
        }
        self.refresh()
    }

    /// Re-reads the source unconditionally and replaces the cached snapshot.
    pub fn refresh(&self) -> CatalogSnapshot {
        let snapshot = CatalogSnapshot::load(self.source.as_ref());
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(snapshot.clone());
        snapshot
    }

    /// Most recent snapshot without touching the source.
    pub fn last_loaded(&self) -> Option<CatalogSnapshot> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl std::fmt::Debug for CatalogProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogProvider")
            .field("source", &self.source.describe())
            .field("strategy", &self.strategy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{CatalogProvider, CatalogSnapshot, RefreshStrategy};
    use crate::catalog::{CatalogError, CatalogSource, StaticSource, CATALOG_LOAD_ERROR};
    use crate::domain::product::ProductRow;

    #[derive(Default)]
    struct CountingSource {
        reads: AtomicUsize,
    }

    impl CatalogSource for CountingSource {
        fn load_rows(&self) -> Result<Vec<ProductRow>, CatalogError> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![ProductRow { number: Some(read.to_string()), ..ProductRow::default() }])
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct BrokenSource;

    impl CatalogSource for BrokenSource {
        fn load_rows(&self) -> Result<Vec<ProductRow>, CatalogError> {
            Err(CatalogError::NotFound("products.xlsx".into()))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[test]
    fn startup_strategy_reads_the_source_once() {
        let source = Arc::new(CountingSource::default());
        let provider = CatalogProvider::new(source.clone(), RefreshStrategy::Startup);

        let first = provider.current();
        let second = provider.current();

        assert_eq!(first, second);
        assert!(first.text.starts_with("Product No: 1"));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_refresh_replaces_startup_cache() {
        let source = Arc::new(CountingSource::default());
        let provider = CatalogProvider::new(source.clone(), RefreshStrategy::Startup);

        provider.current();
        let refreshed = provider.refresh();

        assert!(refreshed.text.starts_with("Product No: 2"));
        assert_eq!(provider.current(), refreshed);
    }

    #[test]
    fn per_request_strategy_reads_every_time() {
        let source = Arc::new(CountingSource::default());
        let provider = CatalogProvider::new(source.clone(), RefreshStrategy::PerRequest);

        provider.current();
        let latest = provider.current();

        assert!(latest.text.starts_with("Product No: 2"));
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
        assert_eq!(provider.last_loaded(), Some(latest));
    }

    #[test]
    fn unreadable_source_yields_error_text_without_failing() {
        let provider = CatalogProvider::new(Arc::new(BrokenSource), RefreshStrategy::PerRequest);
        let snapshot = provider.current();

        assert_eq!(&*snapshot.text, CATALOG_LOAD_ERROR);
        assert!(!snapshot.is_healthy());
        assert_eq!(snapshot.row_count, 0);
    }

    #[test]
    fn unchanged_source_renders_identical_text() {
        let rows = vec![
            ProductRow { name: Some("Red Shoe".to_string()), ..ProductRow::default() },
            ProductRow { name: Some("Blue Shirt".to_string()), ..ProductRow::default() },
        ];
        let source = StaticSource::new(rows);

        assert_eq!(CatalogSnapshot::load(&source), CatalogSnapshot::load(&source));
    }

    #[test]
    fn nothing_is_cached_before_first_use() {
        let provider = CatalogProvider::new(Arc::new(StaticSource::default()), RefreshStrategy::Startup);
        assert!(provider.last_loaded().is_none());
    }

    #[test]
    fn refresh_strategy_parses_config_values() {
        assert_eq!("startup".parse::<RefreshStrategy>(), Ok(RefreshStrategy::Startup));
        assert_eq!("per-request".parse::<RefreshStrategy>(), Ok(RefreshStrategy::PerRequest));
        assert!("hourly".parse::<RefreshStrategy>().is_err());
    }
}
