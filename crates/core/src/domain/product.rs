use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalized catalog row. Rebuilt on every fetch; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub code: String,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub stock: u32,
    pub price: Decimal,
    pub description: String,
    pub category: String,
}

impl ProductRecord {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn has_price(&self) -> bool {
        self.price > Decimal::ZERO
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.brand.trim(), self.model.trim());
        name.trim().to_string()
    }

    /// Case-insensitive substring match against the searchable text fields.
    /// The needle must already be lower-cased. Queries are raw message text
    /// ("busco un vulk"), so the match works both ways: the needle appears in
    /// a field, or a field appears in the needle. The reverse direction only
    /// applies to fields of three or more characters, so fragments like "un"
    /// never match.
    pub fn matches(&self, needle_lower: &str) -> bool {
        if needle_lower.is_empty() {
            return false;
        }
        [&self.brand, &self.model, &self.color, &self.description].iter().any(|field| {
            let field_lower = field.to_lowercase();
            if field_lower.is_empty() {
                return false;
            }
            field_lower.contains(needle_lower)
                || (field_lower.chars().count() >= 3 && needle_lower.contains(&field_lower))
        })
    }
}
