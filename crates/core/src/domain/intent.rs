use serde::{Deserialize, Serialize};

/// Closed set of message intents. Classification order lives in the
/// recognizer rule table, not here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    ProductInquiry,
    PriceInquiry,
    StockInquiry,
    StockByCode,
    LocationInquiry,
    HoursInquiry,
    InsuranceInquiry,
    ContactLensInquiry,
    LiquidsInquiry,
    BrandInquiry,
    Emergency,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::ProductInquiry => "product_inquiry",
            Self::PriceInquiry => "price_inquiry",
            Self::StockInquiry => "stock_inquiry",
            Self::StockByCode => "stock_by_code",
            Self::LocationInquiry => "location_inquiry",
            Self::HoursInquiry => "hours_inquiry",
            Self::InsuranceInquiry => "insurance_inquiry",
            Self::ContactLensInquiry => "contact_lens_inquiry",
            Self::LiquidsInquiry => "liquids_inquiry",
            Self::BrandInquiry => "brand_inquiry",
            Self::Emergency => "emergency",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Intent;

    #[test]
    fn serde_names_match_as_str() {
        let serialized = serde_json::to_string(&Intent::StockByCode).expect("serialize");
        assert_eq!(serialized, "\"stock_by_code\"");
        assert_eq!(Intent::StockByCode.as_str(), "stock_by_code");
    }
}
