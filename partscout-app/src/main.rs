use anyhow::Result;
use clap::Parser;
use partscout_app::cli::{Cli, Command};
use partscout_app::pipeline;
use partscout_common::observability::init_logging;
use partscout_config::{ScoutConfig, ScoutConfigLoader};
use std::process::ExitCode;

const DEFAULT_CONFIG_FILE: &str = "partscout.yaml";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let loader = match &cli.config {
        Some(path) => ScoutConfigLoader::new().with_file(path),
        None => ScoutConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let cfg: ScoutConfig = loader.load()?;

    // 2) Logging goes to the rolling file; stdout carries only the envelope
    init_logging(&cfg.logging)?;

    match cli.command {
        Command::Scrape(args) => {
            let response = pipeline::scrape(&cfg, &args).await;
            println!("{}", pipeline::render(&response, args.format)?);
            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Health(args) => {
            let report = pipeline::health(&cfg, args.api_key.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.llm && report.webdriver {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
