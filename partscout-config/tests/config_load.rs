use partscout_common::observability::LogFormat;
use partscout_common::LlmConfig;
use partscout_config::ScoutConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_file_and_expands_api_key() {
    let tmp = TempDir::new().unwrap();
    let file_yaml = r#"
llm:
  provider: openai
  model: "gpt-4o-mini"
  api_key: "${PS_IT_OPENAI_KEY}"
  max_tokens: 800
browser:
  webdriver_url: "http://127.0.0.1:4444"
  policy:
    item_pacing_ms: 1500
    max_candidates: 6
logging:
  format: json
"#;
    let p = write_yaml(&tmp, "partscout.yaml", file_yaml);

    let config = temp_env::with_var("PS_IT_OPENAI_KEY", Some("sk-from-env"), || {
        ScoutConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config")
    });

    assert_eq!(
        config.llm,
        LlmConfig::Openai {
            api_key: Some("sk-from-env".into()),
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com/v1".into(),
            max_tokens: Some(800),
        }
    );
    assert_eq!(config.browser.webdriver_url, "http://127.0.0.1:4444");
    assert!(config.browser.headless);
    assert_eq!(config.browser.policy.item_pacing_ms, 1500);
    assert_eq!(config.browser.policy.max_candidates, 6);
    assert_eq!(config.browser.policy.item_timeout_ms, 45_000);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "partscout.yaml", "browser:\n  headless: true\n");

    let config = temp_env::with_var("PARTSCOUT__BROWSER__HEADLESS", Some("false"), || {
        ScoutConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config")
    });

    assert!(!config.browser.headless);
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = ScoutConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");

    assert_eq!(config.llm, LlmConfig::default());
    assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = ScoutConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
