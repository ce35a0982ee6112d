#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod toml_config;

use crate::core::rates::RATE_SYMBOLS;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};

#[cfg(feature = "cli")]
use crate::core::persistence::DEFAULT_PROCESSED_PREFIX;
#[cfg(feature = "cli")]
use crate::core::rates::DEFAULT_REFERENCE_CURRENCY;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

pub const DEFAULT_RATE_ENDPOINT: &str = "http://api.exchangeratesapi.io/v1/latest";
pub const DEFAULT_TABLE_NAME: &str = "properties";

/// Command-line flags. Unset flags fall back to the TOML file given with
/// `--config`, then to built-in defaults.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "currency-normalizer")]
#[command(about = "Normalize property listing prices into a single reference currency")]
pub struct CliConfig {
    /// Directory holding the raw listing files
    #[arg(long)]
    pub input_dir: Option<String>,

    /// Files to process, relative to the input directory (default: every .csv in it)
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<String>,

    /// Directory receiving processed files and the item store
    #[arg(long)]
    pub output_dir: Option<String>,

    #[arg(long)]
    pub api_endpoint: Option<String>,

    #[arg(long, env = "EXCHANGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub table_name: Option<String>,

    #[arg(long)]
    pub reference_currency: Option<String>,

    #[arg(long, help = "Timeout for the rate feed request, in seconds")]
    pub rate_timeout: Option<u64>,

    #[arg(short, long, help = "Path to a TOML settings file")]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per file")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Merges flags over the optional TOML file.
    pub fn resolve(&self) -> Result<LocalConfig> {
        let file = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        Ok(LocalConfig::merge(self, file))
    }
}

/// Fully resolved settings for a local run.
#[derive(Clone)]
pub struct LocalConfig {
    pub input_dir: String,
    pub files: Vec<String>,
    pub output_dir: String,
    pub api_endpoint: String,
    pub api_key: String,
    pub table_name: String,
    pub reference_currency: String,
    pub processed_prefix: String,
    pub rate_timeout_seconds: Option<u64>,
}

impl LocalConfig {
    #[cfg(feature = "cli")]
    fn merge(cli: &CliConfig, file: TomlConfig) -> Self {
        let files = if cli.files.is_empty() {
            file.source.files.unwrap_or_default()
        } else {
            cli.files.clone()
        };

        Self {
            input_dir: pick(&cli.input_dir, file.source.input_dir, "./data"),
            files,
            output_dir: pick(&cli.output_dir, file.archive.output_dir, "./output"),
            api_endpoint: pick(&cli.api_endpoint, file.rates.endpoint, DEFAULT_RATE_ENDPOINT),
            api_key: pick(&cli.api_key, file.rates.access_key, ""),
            table_name: pick(&cli.table_name, file.store.table_name, DEFAULT_TABLE_NAME),
            reference_currency: pick(
                &cli.reference_currency,
                file.rates.reference_currency,
                DEFAULT_REFERENCE_CURRENCY,
            ),
            processed_prefix: file
                .archive
                .prefix
                .unwrap_or_else(|| DEFAULT_PROCESSED_PREFIX.to_string()),
            rate_timeout_seconds: cli.rate_timeout.or(file.rates.timeout_seconds),
        }
    }
}

#[cfg(feature = "cli")]
fn pick(flag: &Option<String>, file: Option<String>, default: &str) -> String {
    flag.clone()
        .or(file)
        .unwrap_or_else(|| default.to_string())
}

impl std::fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConfig")
            .field("input_dir", &self.input_dir)
            .field("files", &self.files)
            .field("output_dir", &self.output_dir)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"***")
            .field("table_name", &self.table_name)
            .field("reference_currency", &self.reference_currency)
            .field("processed_prefix", &self.processed_prefix)
            .field("rate_timeout_seconds", &self.rate_timeout_seconds)
            .finish()
    }
}

impl ConfigProvider for LocalConfig {
    fn source_bucket(&self) -> &str {
        &self.input_dir
    }

    fn processed_bucket(&self) -> &str {
        &self.output_dir
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn rate_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn rate_access_key(&self) -> &str {
        &self.api_key
    }

    fn reference_currency(&self) -> &str {
        &self.reference_currency
    }

    fn processed_prefix(&self) -> &str {
        &self.processed_prefix
    }

    fn rate_timeout_seconds(&self) -> Option<u64> {
        self.rate_timeout_seconds
    }
}

impl Validate for LocalConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input_dir", &self.input_dir)?;
        validation::validate_path("output_dir", &self.output_dir)?;
        validation::validate_file_extensions("files", &self.files, &["csv"])?;
        validate_common(self)?;

        tracing::debug!("✅ Local configuration validation passed");
        Ok(())
    }
}

/// Checks shared by every deployment mode.
pub(crate) fn validate_common<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validation::validate_url("api_endpoint", config.rate_endpoint())?;
    validation::validate_non_empty_string("api_key", config.rate_access_key())?;
    validation::validate_non_empty_string("table_name", config.table_name())?;
    validation::validate_currency_code("reference_currency", config.reference_currency())?;
    validation::validate_one_of("reference_currency", config.reference_currency(), &RATE_SYMBOLS)?;
    if let Some(timeout) = config.rate_timeout_seconds() {
        validation::validate_range("rate_timeout_seconds", timeout, 1, 300)?;
    }
    Ok(())
}
