use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use optibot_core::ProductRecord;

use crate::client::{RowFetcher, RowGrid, SheetsError};
use crate::schema::{ColumnMap, SchemaRegistry};

/// Normalizes heterogeneous sheet rows into `ProductRecord`s and answers
/// catalog queries. No caching: every call fetches fresh rows, and every
/// lookup is a linear scan. Fine at catalog sizes in the hundreds; callers
/// must not assume sub-linear lookup.
#[derive(Clone)]
pub struct CatalogService {
    fetcher: Arc<dyn RowFetcher>,
    registry: SchemaRegistry,
    categories: Vec<String>,
}

impl CatalogService {
    pub fn new(
        fetcher: Arc<dyn RowFetcher>,
        registry: SchemaRegistry,
        categories: Vec<String>,
    ) -> Self {
        Self { fetcher, registry, categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Fetches and normalizes one category sheet. A fetch failure is logged
    /// and degrades to an empty result; the next call retries from scratch.
    pub async fn fetch_category(&self, sheet_title: &str) -> Vec<ProductRecord> {
        match self.fetcher.fetch_rows(sheet_title).await {
            Ok(grid) => self.normalize(sheet_title, &grid),
            Err(error) => {
                warn!(
                    event_name = "catalog.fetch.failed",
                    sheet = %sheet_title,
                    error = %error,
                    "catalog fetch degraded to empty result"
                );
                Vec::new()
            }
        }
    }

    /// Fallible variant for callers that need to distinguish an empty sheet
    /// from an unreachable one (health probe, price aggregation).
    pub async fn try_fetch_category(
        &self,
        sheet_title: &str,
    ) -> Result<Vec<ProductRecord>, SheetsError> {
        let grid = self.fetcher.fetch_rows(sheet_title).await?;
        Ok(self.normalize(sheet_title, &grid))
    }

    /// Case-insensitive substring search against brand, model, color and
    /// description across every configured category.
    pub async fn search(&self, query: &str) -> Vec<ProductRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for category in &self.categories {
            let records = self.fetch_category(category).await;
            hits.extend(records.into_iter().filter(|record| record.matches(&needle)));
        }
        hits
    }

    /// Scans the configured sheets in order and short-circuits on the first
    /// record whose code matches case-insensitively.
    pub async fn find_by_code(&self, code: &str) -> Option<ProductRecord> {
        let wanted = code.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        for category in &self.categories {
            let records = self.fetch_category(category).await;
            if let Some(record) =
                records.into_iter().find(|record| record.code.trim().to_lowercase() == wanted)
            {
                return Some(record);
            }
        }
        None
    }

    fn normalize(&self, sheet_title: &str, grid: &RowGrid) -> Vec<ProductRecord> {
        let schema = self.registry.resolve(sheet_title);
        let header_index = schema.header_row.saturating_sub(1);

        let Some(headers) = grid.get(header_index) else {
            return Vec::new();
        };
        let columns = ColumnIndexes::resolve(headers, &schema.columns);

        grid.iter()
            .skip(header_index + 1)
            .filter_map(|row| columns.build_record(row, sheet_title))
            .collect()
    }
}

/// Positions of the mapped columns within one sheet's header row.
struct ColumnIndexes {
    code: Option<usize>,
    brand: Option<usize>,
    model: Option<usize>,
    color: Option<usize>,
    stock: Option<usize>,
    price: Option<usize>,
    description: Option<usize>,
}

impl ColumnIndexes {
    fn resolve(headers: &[String], columns: &ColumnMap) -> Self {
        let position = |wanted: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(wanted.trim()))
        };

        Self {
            code: position(&columns.code),
            brand: position(&columns.brand),
            model: position(&columns.model),
            color: position(&columns.color),
            stock: position(&columns.stock),
            price: position(&columns.price),
            description: position(&columns.description),
        }
    }

    /// Builds a record from one data row. Total: a row is either skipped
    /// (no brand and no model) or produced with per-field defaults.
    fn build_record(&self, row: &[String], category: &str) -> Option<ProductRecord> {
        let cell = |index: Option<usize>| {
            index.and_then(|at| row.get(at)).map(|text| text.trim().to_string()).unwrap_or_default()
        };

        let brand = cell(self.brand);
        let model = cell(self.model);
        if brand.is_empty() && model.is_empty() {
            return None;
        }

        Some(ProductRecord {
            code: cell(self.code),
            brand,
            model,
            color: cell(self.color),
            stock: parse_stock(&cell(self.stock)),
            price: parse_price(&cell(self.price)),
            description: cell(self.description),
            category: category.to_string(),
        })
    }
}

/// Quantity cells are free text ("5 unidades", "sin stock", ""). Strips
/// everything but digits and defaults to 0.
pub fn parse_stock(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Price cells carry currency symbols and local separators ("$ 1.250,50").
/// Dots are thousands separators, the comma is the decimal separator.
/// Defaults to 0 on anything unparsable.
pub fn parse_price(raw: &str) -> Decimal {
    let cleaned: String =
        raw.chars().filter(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.')).collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let normalized = cleaned.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}
