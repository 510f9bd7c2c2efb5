//! Product catalog flattening for prompt context.
//!
//! Rows come from a [`CatalogSource`]; [`render_catalog`] turns them into the
//! labeled plain-text block the model reads as its menu. [`CatalogProvider`]
//! decides how often the source is re-read.

pub mod provider;
pub mod source;

pub use provider::{CatalogProvider, CatalogSnapshot, RefreshStrategy};
pub use source::{CatalogError, CatalogSource, SpreadsheetSource, StaticSource};

use std::borrow::Cow;

use crate::domain::product::{single_line, ProductRow};

/// Catalog text used in place of the product list when the source cannot be read.
pub const CATALOG_LOAD_ERROR: &str = "Error loading product list.";

pub const RECORD_SEPARATOR: &str = "\n---\n";

pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";
pub const PRICE_PLACEHOLDER: &str = "$0";

pub const RECORD_LABELS: [&str; 8] = [
    "Product No",
    "Type",
    "Name",
    "Price",
    "Description",
    "Ingredients",
    "Image URL",
    "Remarks",
];

pub fn render_catalog(rows: &[ProductRow]) -> String {
    rows.iter().map(render_record).collect::<Vec<_>>().join(RECORD_SEPARATOR)
}

pub fn render_record(row: &ProductRow) -> String {
    let values = [
        field_or(&row.number, UNKNOWN_PLACEHOLDER),
        field_or(&row.product_type, UNKNOWN_PLACEHOLDER),
        field_or(&row.name, UNKNOWN_PLACEHOLDER),
        field_or(&row.price, PRICE_PLACEHOLDER),
        field_or(&row.description, ""),
        field_or(&row.ingredients, ""),
        field_or(&row.image_url, ""),
        field_or(&row.remarks, ""),
    ];

    RECORD_LABELS
        .iter()
        .zip(values)
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn field_or<'a>(value: &'a Option<String>, placeholder: &'a str) -> Cow<'a, str> {
    value
        .as_deref()
        .map(single_line)
        .filter(|value| !value.is_empty())
        .unwrap_or(Cow::Borrowed(placeholder))
}
