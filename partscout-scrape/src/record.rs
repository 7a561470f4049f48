use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One quantity tier of a distributor price table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreak {
    pub quantity: String,
    pub price: String,
}

/// Structured product data for one attempted URL.
///
/// Every field is optional and serializes as `null` when absent. An empty
/// `specifications` map or `price_breaks` list is kept distinct from `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_name: Option<String>,
    pub price: Option<String>,
    pub condition: Option<String>,
    pub country: Option<String>,
    pub seller: Option<String>,
    pub part_number: Option<String>,
    pub manufacturer: Option<String>,
    pub availability: Option<String>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub price_breaks: Option<Vec<PriceBreak>>,
    pub datasheet_url: Option<String>,
    /// Always within `[0, 1]` when present.
    pub confidence_score: Option<f64>,
}

impl ProductRecord {
    /// The all-null record recorded for failed items.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Records of one job in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeBatchResult {
    pub records: Vec<ProductRecord>,
    /// The job deadline expired before every candidate was attempted.
    pub timed_out: bool,
    /// Candidates discovered on the search page, before the `max_results` cap.
    pub candidates_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_record_serializes_every_key_as_null() {
        let v = serde_json::to_value(ProductRecord::empty()).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 12);
        assert!(obj.values().all(|v| v.is_null()));
        assert!(obj.contains_key("price_breaks"));
        assert!(obj.contains_key("confidence_score"));
    }

    #[test]
    fn empty_collections_are_not_absent() {
        let record = ProductRecord {
            specifications: Some(BTreeMap::new()),
            ..ProductRecord::empty()
        };
        assert!(!record.is_empty());
        assert_eq!(
            serde_json::to_value(&record).unwrap()["specifications"],
            json!({})
        );
    }
}
