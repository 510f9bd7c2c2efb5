use shopchat_core::catalog::{render_catalog, CatalogSource, SpreadsheetSource};
use shopchat_core::config::{AppConfig, LoadOptions};

use super::{CommandResult, CATALOG_FAILURE_EXIT, CONFIG_FAILURE_EXIT};

/// Prints the rendered catalog on success and a JSON outcome on failure.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "catalog",
                "config_validation",
                error.to_string(),
                CONFIG_FAILURE_EXIT,
            )
        }
    };

    if !config.catalog.enabled {
        return CommandResult::success(
            "catalog",
            "catalog disabled (catalog.enabled = false); prompts carry no product list",
        );
    }

    let source = SpreadsheetSource::new(config.catalog.path.clone());
    match source.load_rows() {
        Ok(rows) => CommandResult::plain(render_catalog(&rows)),
        Err(error) => {
            CommandResult::failure("catalog", "catalog_load", error.to_string(), CATALOG_FAILURE_EXIT)
        }
    }
}
