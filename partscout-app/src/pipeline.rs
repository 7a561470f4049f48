//! Wiring from configuration to a running scrape job.

use crate::cli::{OutputFormat, ScrapeArgs};
use partscout_common::{Result, ScoutError};
use partscout_config::ScoutConfig;
use partscout_drivers::scout_browser::WebDriverLauncher;
use partscout_llm::ensure_llm_ready;
use partscout_scrape::{
    JobRequest, JobResponse, ProductRecord, ScrapeBatchResult, ScrapeOrchestrator,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Assemble the raw job object from a job file or inline flags, then run it
/// through the same validation as any other job description.
///
/// An `--api-key` (or `OPENAI_API_KEY`) fills in a job file whose key is
/// absent, null or blank.
pub fn job_request(args: &ScrapeArgs) -> Result<JobRequest> {
    let mut raw = match &args.job {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                ScoutError::Validation(format!("cannot read job file {}: {e}", path.display()))
            })?;
            serde_json::from_str::<Value>(&text).map_err(|e| {
                ScoutError::Validation(format!("job file {} is not JSON: {e}", path.display()))
            })?
        }
        None => {
            let mut obj = Map::new();
            if let Some(site) = &args.site {
                obj.insert("website_url".into(), json!(site));
            }
            if let Some(term) = &args.term {
                obj.insert("search_term".into(), json!(term));
            }
            if !args.fields.is_empty() {
                obj.insert("extract_fields".into(), json!(args.fields));
            }
            if let Some(max) = args.max_results {
                obj.insert("max_results".into(), json!(max));
            }
            Value::Object(obj)
        }
    };

    if let (Some(obj), Some(key)) = (raw.as_object_mut(), args.api_key.as_deref()) {
        let blank = match obj.get("api_key") {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if blank {
            obj.insert("api_key".into(), json!(key));
        }
    }
    JobRequest::from_json(&raw)
}

/// Launch one orchestrator for `request` with the configured model and
/// WebDriver endpoint.
pub async fn run_job(cfg: &ScoutConfig, request: &JobRequest) -> Result<ScrapeBatchResult> {
    let llm = ensure_llm_ready(&cfg.llm, Some(&request.api_key)).await?;
    let launcher = Arc::new(WebDriverLauncher::new(cfg.browser.webdriver_url.clone()));

    let orchestrator = ScrapeOrchestrator::new(launcher, llm, cfg.browser.policy.clone())
        .with_headless(cfg.browser.headless);
    orchestrator.run(&request.job).await
}

/// Validate, run and wrap the outcome in the wire envelope.
pub async fn scrape(cfg: &ScoutConfig, args: &ScrapeArgs) -> JobResponse {
    let request = match job_request(args) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "job rejected");
            return JobResponse::failed(e);
        }
    };

    match run_job(cfg, &request).await {
        Ok(batch) => {
            info!(
                records = batch.records.len(),
                candidates_found = batch.candidates_found,
                timed_out = batch.timed_out,
                "job complete"
            );
            JobResponse::ok(batch.records)
        }
        Err(e) => {
            warn!(error = %e, "job failed");
            JobResponse::failed(e)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub llm: bool,
    pub webdriver: bool,
}

/// Check the model provider and the WebDriver `/status` endpoint.
pub async fn health(cfg: &ScoutConfig, api_key: Option<&str>) -> HealthReport {
    let llm = match ensure_llm_ready(&cfg.llm, api_key).await {
        Ok(client) => client.health_check().await.unwrap_or(false),
        Err(e) => {
            warn!(error = %e, "model provider unavailable");
            false
        }
    };
    let webdriver = match WebDriverLauncher::new(cfg.browser.webdriver_url.clone())
        .check_status()
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "webdriver unavailable");
            false
        }
    };

    HealthReport {
        status: if llm && webdriver { "healthy" } else { "unhealthy" },
        llm,
        webdriver,
    }
}

/// CSV header, in `ProductRecord` field order.
pub const CSV_COLUMNS: [&str; 12] = [
    "product_name",
    "price",
    "condition",
    "country",
    "seller",
    "part_number",
    "manufacturer",
    "availability",
    "specifications",
    "price_breaks",
    "datasheet_url",
    "confidence_score",
];

/// One CSV row; nested fields travel as JSON strings.
#[derive(Serialize)]
struct CsvRow<'a> {
    product_name: Option<&'a str>,
    price: Option<&'a str>,
    condition: Option<&'a str>,
    country: Option<&'a str>,
    seller: Option<&'a str>,
    part_number: Option<&'a str>,
    manufacturer: Option<&'a str>,
    availability: Option<&'a str>,
    specifications: Option<String>,
    price_breaks: Option<String>,
    datasheet_url: Option<&'a str>,
    confidence_score: Option<f64>,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a ProductRecord) -> serde_json::Result<Self> {
        Ok(Self {
            product_name: record.product_name.as_deref(),
            price: record.price.as_deref(),
            condition: record.condition.as_deref(),
            country: record.country.as_deref(),
            seller: record.seller.as_deref(),
            part_number: record.part_number.as_deref(),
            manufacturer: record.manufacturer.as_deref(),
            availability: record.availability.as_deref(),
            specifications: record
                .specifications
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            price_breaks: record
                .price_breaks
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            datasheet_url: record.datasheet_url.as_deref(),
            confidence_score: record.confidence_score,
        })
    }
}

/// Records as CSV with a header row, even when there are no records.
pub fn records_to_csv(records: &[ProductRecord]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for record in records {
        writer.serialize(CsvRow::from_record(record)?)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Format the job envelope. CSV carries only the records, so a failed job
/// falls back to the JSON envelope.
pub fn render(response: &JobResponse, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match (format, &response.data) {
        (OutputFormat::Csv, Some(records)) => records_to_csv(records)?,
        (OutputFormat::Yaml, _) => serde_yaml::to_string(response)?,
        _ => serde_json::to_string_pretty(response)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use partscout_scrape::PriceBreak;
    use std::io::Write;

    fn args() -> ScrapeArgs {
        ScrapeArgs {
            job: None,
            site: Some("https://www.ebay.com".into()),
            term: Some("ARDUINO UNO".into()),
            fields: vec!["price".into()],
            max_results: Some(2),
            api_key: Some("sk-test".into()),
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn flags_become_a_validated_job() {
        let request = job_request(&args()).unwrap();
        assert_eq!(request.job.website_url(), "https://www.ebay.com");
        assert_eq!(request.job.max_results(), 2);
        assert_eq!(request.api_key, "sk-test");
    }

    #[test]
    fn missing_flags_use_job_validation_messages() {
        let partial = ScrapeArgs {
            term: None,
            api_key: None,
            ..args()
        };
        let err = job_request(&partial).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: search_term, api_key"
        );
    }

    #[test]
    fn job_file_takes_key_from_flag_when_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"website_url":"https://www.mouser.com","search_term":"LM317",
                "extract_fields":["price"],"max_results":"4"}}"#
        )
        .unwrap();

        let request = job_request(&ScrapeArgs {
            job: Some(file.path().to_path_buf()),
            site: None,
            term: None,
            fields: Vec::new(),
            max_results: None,
            api_key: Some("sk-env".into()),
            format: OutputFormat::Json,
        })
        .unwrap();
        assert_eq!(request.job.search_term(), "LM317");
        assert_eq!(request.job.max_results(), 4);
        assert_eq!(request.api_key, "sk-env");
    }

    #[test]
    fn unparsable_job_file_is_a_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = job_request(&ScrapeArgs {
            job: Some(file.path().to_path_buf()),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, ScoutError::Validation(_)));
    }

    #[test]
    fn renders_failure_envelope_in_every_format() {
        let response = JobResponse::failed("max_results must be between 1 and 50");
        let json = render(&response, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], json!(false));
        assert!(parsed.get("data").is_none());

        let yaml = render(&response, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("success: false"));
        assert!(yaml.contains("max_results must be between 1 and 50"));

        assert_eq!(render(&response, OutputFormat::Csv).unwrap(), json);
    }

    #[test]
    fn csv_round_trips_records_with_nested_fields_as_json() {
        let full = ProductRecord {
            product_name: Some("Arduino Uno R3, \"genuine\"".into()),
            price: Some("$23.00".into()),
            condition: Some("New".into()),
            part_number: Some("A000066".into()),
            specifications: Some([("MCU".to_string(), "ATmega328P".to_string())].into()),
            price_breaks: Some(vec![PriceBreak {
                quantity: "10".into(),
                price: "$21.00".into(),
            }]),
            confidence_score: Some(0.9),
            ..ProductRecord::empty()
        };
        let out = render(
            &JobResponse::ok(vec![full.clone(), ProductRecord::empty()]),
            OutputFormat::Csv,
        )
        .unwrap();

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "Arduino Uno R3, \"genuine\"");
        assert_eq!(&rows[0][5], "A000066");
        assert_eq!(&rows[0][11], "0.9");
        let specs: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&rows[0][8]).unwrap();
        assert_eq!(Some(specs), full.specifications);
        let breaks: Vec<PriceBreak> = serde_json::from_str(&rows[0][9]).unwrap();
        assert_eq!(Some(breaks), full.price_breaks);
        assert_eq!(rows[1].len(), CSV_COLUMNS.len());
        assert!(rows[1].iter().all(str::is_empty));
    }

    #[test]
    fn csv_header_covers_every_record_field() {
        let value = serde_json::to_value(ProductRecord::empty()).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut columns = CSV_COLUMNS.to_vec();
        keys.sort_unstable();
        columns.sort_unstable();
        assert_eq!(keys, columns);

        let empty = records_to_csv(&[]).unwrap();
        assert_eq!(empty.trim_end(), CSV_COLUMNS.join(","));
    }

    fn job_file_with_key(key_json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"website_url":"https://www.ebay.com","search_term":"LM317",
                "extract_fields":["price"],"max_results":1,"api_key":{key_json}}}"#
        )
        .unwrap();
        file
    }

    fn file_args(file: &tempfile::NamedTempFile, api_key: Option<&str>) -> ScrapeArgs {
        ScrapeArgs {
            job: Some(file.path().to_path_buf()),
            site: None,
            term: None,
            fields: Vec::new(),
            max_results: None,
            api_key: api_key.map(str::to_string),
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn blank_key_in_job_file_is_replaced_by_flag() {
        for blank in ["\"\"", "\"   \"", "null"] {
            let file = job_file_with_key(blank);
            let request = job_request(&file_args(&file, Some("sk-env"))).unwrap();
            assert_eq!(request.api_key, "sk-env", "{blank}");
        }
    }

    #[test]
    fn key_in_job_file_wins_over_flag() {
        let file = job_file_with_key("\"sk-file\"");
        let request = job_request(&file_args(&file, Some("sk-env"))).unwrap();
        assert_eq!(request.api_key, "sk-file");

        let err = job_request(&file_args(&job_file_with_key("\"\""), None)).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: api_key");
    }
}
