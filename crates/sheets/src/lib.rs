pub mod catalog;
pub mod client;
pub mod schema;

pub use catalog::CatalogService;
pub use client::{GoogleSheetsClient, RowFetcher, RowGrid, SheetsError};
pub use schema::{ColumnMap, SchemaRegistry, SheetSchema};
