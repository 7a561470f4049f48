//! Job input validation and the response envelope.
//!
//! Validation runs before any browser work and reports the first problem
//! found, in this order: missing fields, `extract_fields` shape,
//! `max_results` parsing and range, then `website_url` syntax.

use crate::record::ProductRecord;
use partscout_common::{Result, ScoutError};
use serde::Serialize;
use serde_json::Value;
use url::Url;

pub const MAX_RESULTS_LIMIT: usize = 50;

const REQUIRED_FIELDS: [&str; 5] = [
    "website_url",
    "search_term",
    "extract_fields",
    "max_results",
    "api_key",
];

/// One validated scrape request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeJob {
    website_url: String,
    search_term: String,
    extract_fields: Vec<String>,
    max_results: usize,
}

impl ScrapeJob {
    /// Build a job from already-typed values, applying the same checks as
    /// [`JobRequest::from_json`].
    pub fn new(
        website_url: impl Into<String>,
        search_term: impl Into<String>,
        extract_fields: Vec<String>,
        max_results: i64,
    ) -> Result<Self> {
        let website_url = website_url.into();
        let search_term = search_term.into();

        let mut missing = Vec::new();
        if website_url.is_empty() {
            missing.push("website_url");
        }
        if search_term.is_empty() {
            missing.push("search_term");
        }
        if extract_fields.is_empty() {
            missing.push("extract_fields");
        }
        if !missing.is_empty() {
            return Err(missing_fields(&missing));
        }

        let max_results = check_range(max_results)?;
        check_site_url(&website_url)?;

        Ok(Self {
            website_url,
            search_term,
            extract_fields,
            max_results,
        })
    }

    pub fn website_url(&self) -> &str {
        &self.website_url
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Requested fields. Advisory only; every record carries the full schema.
    pub fn extract_fields(&self) -> &[String] {
        &self.extract_fields
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

/// A job plus the credential it must run with.
#[derive(Clone, PartialEq)]
pub struct JobRequest {
    pub job: ScrapeJob,
    pub api_key: String,
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("job", &self.job)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl JobRequest {
    /// Validate a raw JSON job description.
    ///
    /// ```
    /// use partscout_scrape::JobRequest;
    /// use serde_json::json;
    ///
    /// let err = JobRequest::from_json(&json!({
    ///     "website_url": "https://www.ebay.com",
    ///     "search_term": "ARDUINO UNO",
    ///     "extract_fields": ["price"],
    ///     "max_results": 51,
    ///     "api_key": "sk-test"
    /// }))
    /// .unwrap_err();
    /// assert_eq!(err.to_string(), "max_results must be between 1 and 50");
    /// ```
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ScoutError::Validation("No JSON data received".to_string()))?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| obj.get(*field).map_or(true, is_blank))
            .collect();
        if !missing.is_empty() {
            return Err(missing_fields(&missing));
        }

        let extract_fields = match &obj["extract_fields"] {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ScoutError::Validation(
                        "extract_fields must be an array of strings".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(ScoutError::Validation(
                    "extract_fields must be an array".to_string(),
                ))
            }
        };

        let max_results = check_range(parse_max_results(&obj["max_results"])?)?;

        let website_url = required_string(obj, "website_url")?;
        check_site_url(&website_url)?;
        let search_term = required_string(obj, "search_term")?;
        let api_key = required_string(obj, "api_key")?;

        Ok(Self {
            job: ScrapeJob {
                website_url,
                search_term,
                extract_fields,
                max_results,
            },
            api_key,
        })
    }
}

/// Wire envelope: `{ success: true, data }` or `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ProductRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResponse {
    pub fn ok(records: Vec<ProductRecord>) -> Self {
        Self {
            success: true,
            data: Some(records),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Absent-equivalent values. Numbers always count as present so `0` reaches
/// the range check.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

fn missing_fields(fields: &[&str]) -> ScoutError {
    ScoutError::Validation(format!("Missing required fields: {}", fields.join(", ")))
}

fn invalid_number() -> ScoutError {
    ScoutError::Validation("max_results must be a valid number".to_string())
}

/// Integers, integral-looking strings, and floats (truncated toward zero).
fn parse_max_results(v: &Value) -> Result<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(invalid_number),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid_number()),
        _ => Err(invalid_number()),
    }
}

fn check_range(n: i64) -> Result<usize> {
    if (1..=MAX_RESULTS_LIMIT as i64).contains(&n) {
        Ok(n as usize)
    } else {
        Err(ScoutError::Validation(format!(
            "max_results must be between 1 and {MAX_RESULTS_LIMIT}"
        )))
    }
}

fn required_string(obj: &serde_json::Map<String, Value>, field: &str) -> Result<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ScoutError::Validation(format!("{field} must be a string")))
}

fn check_site_url(raw: &str) -> Result<()> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Ok(())
        }
        _ => Err(ScoutError::Validation(
            "website_url must be a valid http(s) URL".to_string(),
        )),
    }
}
