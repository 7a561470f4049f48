//! Model-backed structured extraction.
//!
//! The model's answer is untrusted: it is located, parsed into a permissive
//! wire type, then validated into a [`ProductRecord`]. Any failure along the
//! way degrades to the all-null record.

use crate::normalize::NormalizedText;
use crate::record::{PriceBreak, ProductRecord};
use crate::sites;
use partscout_common::{Result, ScoutError};
use partscout_llm::traits::LlmClient;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Turns normalized page text into a [`ProductRecord`].
pub struct ExtractionEngine {
    llm: Arc<dyn LlmClient + Send + Sync>,
}

impl ExtractionEngine {
    /// Token limits come from the client's own configured default.
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }

    /// Extract a record; never fails. Errors are logged and yield the
    /// all-null record.
    pub async fn extract(&self, text: &NormalizedText, source_url: &str) -> ProductRecord {
        match self.try_extract(text, source_url).await {
            Ok(record) => record,
            Err(e) => {
                warn!(target: "scrape.extract", url = %source_url, error = %e, "extraction failed");
                ProductRecord::empty()
            }
        }
    }

    /// Like [`Self::extract`] but surfaces the reason for an empty result.
    /// Empty text returns [`ScoutError::EmptyContent`] without a model call.
    pub async fn try_extract(
        &self,
        text: &NormalizedText,
        source_url: &str,
    ) -> Result<ProductRecord> {
        if text.is_empty() {
            return Err(ScoutError::EmptyContent(source_url.to_string()));
        }

        let prompt = build_extraction_prompt(text.as_str(), sites::search_context(source_url));
        let response = self
            .llm
            .generate(&prompt, None, None, Some(EXTRACTION_TEMPERATURE))
            .await?;

        debug!(
            target: "scrape.extract",
            url = %source_url,
            model = %self.llm.model_name(),
            tokens_used = ?response.tokens_used,
            "model responded"
        );
        parse_product_response(&response.text)
    }
}

pub fn build_extraction_prompt(text: &str, site_context: &str) -> String {
    format!(
        r#"
Extract structured product information from the following e-commerce page content.

CONTEXT: {site_context}

CONTENT TO ANALYZE:
{text}

Please extract the following information and return it as a valid JSON object:

{{
    "product_name": "Full product name or title",
    "price": "Main price (include currency symbol)",
    "condition": "New/Used/Refurbished/etc",
    "country": "Country of origin or shipping",
    "seller": "Seller or supplier name",
    "part_number": "Manufacturer part number or model",
    "manufacturer": "Brand or manufacturer name",
    "availability": "In stock/Out of stock/Lead time info",
    "specifications": {{"key": "value pairs of technical specs"}},
    "price_breaks": [{{"quantity": "1", "price": "$X.XX"}}, {{"quantity": "10", "price": "$Y.YY"}}],
    "datasheet_url": "URL to technical datasheet if available",
    "confidence_score": 0.95
}}

EXTRACTION RULES:
1. If information is not found, use null (not empty string)
2. For prices, preserve currency symbols and formatting
3. Extract all quantity-based pricing if available
4. Focus on the main product, ignore related/suggested items
5. Confidence score should reflect how certain you are about the extraction (0.0-1.0)
6. For specifications, extract key technical parameters
7. Normalize condition values to standard terms

Return only the JSON object, no additional text.
"#
    )
}

/// Parse a model answer into a validated record.
///
/// ```
/// use partscout_scrape::extract::parse_product_response;
///
/// let record = parse_product_response(
///     "```json\n{\"product_name\": \"LM358\", \"confidence_score\": 1.7}\n```",
/// )
/// .unwrap();
/// assert_eq!(record.product_name.as_deref(), Some("LM358"));
/// assert_eq!(record.confidence_score, Some(1.0));
/// ```
pub fn parse_product_response(raw: &str) -> Result<ProductRecord> {
    let block = extract_json_block(raw)
        .ok_or_else(|| ScoutError::Extraction("no JSON object in model response".to_string()))?;
    let value: Value = serde_json::from_str(&block)
        .map_err(|e| ScoutError::Extraction(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ScoutError::Extraction(
            "model response is not a JSON object".to_string(),
        ));
    }
    let wire: ProductRecordWire = serde_json::from_value(value)
        .map_err(|e| ScoutError::Extraction(format!("schema mismatch: {e}")))?;
    Ok(wire.into_record())
}

/// Fenced ```json block if present, else the outermost `{...}` span.
fn extract_json_block(text: &str) -> Option<String> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    static PLAIN: OnceLock<Option<Regex>> = OnceLock::new();

    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").ok())
        .as_ref()?;
    if let Some(caps) = fence.captures(text) {
        return Some(caps.get(1)?.as_str().to_string());
    }
    let plain = PLAIN
        .get_or_init(|| Regex::new(r"(?s)(\{.*\})").ok())
        .as_ref()?;
    plain
        .captures(text)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}

/// Scalar the model may send as a string, number, or boolean.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireText {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl WireText {
    /// Trimmed text; blanks count as absent.
    fn into_text(self) -> Option<String> {
        let s = match self {
            WireText::Text(s) => s.trim().to_string(),
            WireText::Number(n) => n.to_string(),
            WireText::Flag(b) => b.to_string(),
        };
        (!s.is_empty()).then_some(s)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireScore {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct PriceBreakWire {
    #[serde(default)]
    quantity: Option<WireText>,
    #[serde(default)]
    price: Option<WireText>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductRecordWire {
    product_name: Option<WireText>,
    price: Option<WireText>,
    condition: Option<WireText>,
    country: Option<WireText>,
    seller: Option<WireText>,
    part_number: Option<WireText>,
    manufacturer: Option<WireText>,
    availability: Option<WireText>,
    specifications: Option<BTreeMap<String, Option<WireText>>>,
    price_breaks: Option<Vec<PriceBreakWire>>,
    datasheet_url: Option<WireText>,
    confidence_score: Option<WireScore>,
}

impl ProductRecordWire {
    fn into_record(self) -> ProductRecord {
        let text = |v: Option<WireText>| v.and_then(WireText::into_text);

        let specifications = self.specifications.map(|specs| {
            specs
                .into_iter()
                .filter_map(|(k, v)| {
                    let key = k.trim().to_string();
                    let value = v.and_then(WireText::into_text)?;
                    (!key.is_empty()).then_some((key, value))
                })
                .collect()
        });

        // Tiers missing either side are dropped.
        let price_breaks = self.price_breaks.map(|tiers| {
            tiers
                .into_iter()
                .filter_map(|tier| {
                    Some(PriceBreak {
                        quantity: tier.quantity.and_then(WireText::into_text)?,
                        price: tier.price.and_then(WireText::into_text)?,
                    })
                })
                .collect()
        });

        ProductRecord {
            product_name: text(self.product_name),
            price: text(self.price),
            condition: text(self.condition).map(canonical_condition),
            country: text(self.country),
            seller: text(self.seller),
            part_number: text(self.part_number),
            manufacturer: text(self.manufacturer),
            availability: text(self.availability),
            specifications,
            price_breaks,
            datasheet_url: text(self.datasheet_url),
            confidence_score: self.confidence_score.and_then(clamp_score),
        }
    }
}

fn clamp_score(score: WireScore) -> Option<f64> {
    let raw = match score {
        WireScore::Number(n) => n,
        WireScore::Text(s) => s.trim().parse::<f64>().ok()?,
    };
    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}

fn canonical_condition(raw: String) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "new" | "brand new" => "New".to_string(),
        "used" | "pre-owned" => "Used".to_string(),
        "refurbished" | "refurb" => "Refurbished".to_string(),
        _ => raw,
    }
}
