use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "partscout", version, about = "Search a shop and extract structured product records")]
pub struct Cli {
    /// YAML configuration file (defaults to ./partscout.yaml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one scrape job and print the result envelope.
    Scrape(ScrapeArgs),
    /// Check that the model provider and WebDriver endpoint respond.
    Health(HealthArgs),
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Job description as JSON (website_url, search_term, extract_fields,
    /// max_results, api_key).
    #[arg(long, conflicts_with_all = ["site", "term", "fields", "max_results"])]
    pub job: Option<PathBuf>,

    #[arg(long)]
    pub site: Option<String>,

    #[arg(long)]
    pub term: Option<String>,

    /// Field to extract; repeat for several.
    #[arg(long = "field", value_name = "FIELD")]
    pub fields: Vec<String>,

    #[arg(long)]
    pub max_results: Option<i64>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct HealthArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    /// Records only, one row each; a failed job still prints the JSON envelope.
    Csv,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_job_with_repeated_fields() {
        let cli = Cli::try_parse_from([
            "partscout",
            "scrape",
            "--site",
            "https://www.ebay.com",
            "--term",
            "ARDUINO UNO",
            "--field",
            "price",
            "--field",
            "condition",
            "--max-results",
            "3",
            "--api-key",
            "sk-test",
            "--format",
            "yaml",
        ])
        .unwrap();

        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.fields, vec!["price", "condition"]);
        assert_eq!(args.max_results, Some(3));
        assert_eq!(args.format, OutputFormat::Yaml);
        assert!(args.job.is_none());
    }

    #[test]
    fn accepts_csv_output() {
        let cli = Cli::try_parse_from([
            "partscout", "scrape", "--job", "job.json", "--format", "csv",
        ])
        .unwrap();
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.format, OutputFormat::Csv);
    }

    #[test]
    fn job_file_conflicts_with_inline_flags() {
        let err = Cli::try_parse_from([
            "partscout",
            "scrape",
            "--job",
            "job.json",
            "--site",
            "https://www.ebay.com",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["partscout", "health", "--config", "custom.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(cli.command, Command::Health(_)));
    }
}
