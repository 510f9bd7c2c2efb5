//! Core of the shop chat assistant: configuration, the product catalog
//! serializer, and order-intent extraction from model replies.

pub mod catalog;
pub mod config;
pub mod deeplink;
pub mod domain;
pub mod errors;
pub mod order;

pub use catalog::{
    render_catalog, CatalogError, CatalogProvider, CatalogSnapshot, CatalogSource,
    RefreshStrategy, SpreadsheetSource, StaticSource, CATALOG_LOAD_ERROR,
};
pub use deeplink::whatsapp_order_link;
pub use domain::chat::ChatTurn;
pub use domain::product::{ProductColumn, ProductRow};
pub use errors::{ApplicationError, InterfaceError};
pub use order::{OrderIntent, ORDER_ACKNOWLEDGEMENT, ORDER_SENTINEL};
