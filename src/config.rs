use crate::cli::Cli;
use crate::report::ReportRenderer;
use crate::shape::SamplePolicy;
use crate::walker::SnapshotCadence;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub inference: InferenceConfig,
    pub progress: ProgressConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Sampling and classification policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Distinct attribute values kept per attribute before giving up
    pub attribute_samples: usize,
    /// Distinct texts kept per tag before giving up
    pub text_samples: usize,
    /// Samples must be shorter than this many characters
    pub max_sample_length: usize,
    /// Occurrence ratio below which a tag is reported as rare
    pub rarely_threshold: f64,
}

/// Snapshot and progress settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressConfig {
    /// Write intermediate snapshots
    pub snapshots: bool,
    /// Events before the first snapshot
    pub first_snapshot_after: u64,
    /// Events between later snapshots
    pub snapshot_every: u64,
    /// Document size estimate for percentages (defaults to the file size)
    pub total_bytes: Option<u64>,
}

/// Input document settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InputConfig {
    /// Local DTD substituted for any external subset the document declares
    pub dtd: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory report files are written to
    pub directory: PathBuf,
    /// File name prefix of intermediate snapshots
    pub snapshot_prefix: String,
    /// File name prefix of the final report
    pub final_prefix: String,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            attribute_samples: 10,
            text_samples: 10,
            max_sample_length: 20,
            rarely_threshold: 0.05,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        let cadence = SnapshotCadence::default();
        Self {
            snapshots: true,
            first_snapshot_after: cadence.first_after,
            snapshot_every: cadence.every,
            total_bytes: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            snapshot_prefix: "structure".to_string(),
            final_prefix: "structure-final".to_string(),
            verbose: false,
            quiet: false,
        }
    }
}

impl InferenceConfig {
    pub fn attribute_policy(&self) -> SamplePolicy {
        SamplePolicy {
            max_samples: self.attribute_samples,
            max_length: self.max_sample_length,
        }
    }

    pub fn text_policy(&self) -> SamplePolicy {
        SamplePolicy {
            max_samples: self.text_samples,
            max_length: self.max_sample_length,
        }
    }

    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::new(self.rarely_threshold)
    }
}

impl ProgressConfig {
    /// Snapshot cadence, `None` when snapshots are off
    pub fn cadence(&self) -> Option<SnapshotCadence> {
        self.snapshots.then_some(SnapshotCadence {
            first_after: self.first_snapshot_after,
            every: self.snapshot_every,
        })
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli)
    }

    /// Load configuration reading environment overrides from `env`
    pub fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path)?;
        } else if let Some(found_config) = Self::find_config_file()? {
            config = found_config;
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON). Missing keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Result<Option<Config>> {
        Self::find_config_file_in(&Self::search_dirs())
    }

    /// Directories searched for a configuration file, in order
    pub fn search_dirs() -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join("xml-shape"));
        }
        dirs
    }

    /// First configuration file found in `dirs`
    pub fn find_config_file_in(dirs: &[PathBuf]) -> Result<Option<Config>> {
        let config_names = [
            "xml-shape.toml",
            "xml-shape.json",
            ".xml-shape.toml",
            ".xml-shape.json",
        ];

        for dir in dirs {
            for name in &config_names {
                let path = dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path)?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Inference settings
        if let Some(value) = env.get("XML_SHAPE_ATTRIBUTE_SAMPLES") {
            config.inference.attribute_samples = parse_env("XML_SHAPE_ATTRIBUTE_SAMPLES", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_TEXT_SAMPLES") {
            config.inference.text_samples = parse_env("XML_SHAPE_TEXT_SAMPLES", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_MAX_SAMPLE_LENGTH") {
            config.inference.max_sample_length = parse_env("XML_SHAPE_MAX_SAMPLE_LENGTH", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_RARELY_THRESHOLD") {
            config.inference.rarely_threshold = parse_env("XML_SHAPE_RARELY_THRESHOLD", &value)?;
        }

        // Progress settings
        if let Some(value) = env.get("XML_SHAPE_SNAPSHOTS") {
            config.progress.snapshots = parse_env("XML_SHAPE_SNAPSHOTS", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_FIRST_SNAPSHOT") {
            config.progress.first_snapshot_after = parse_env("XML_SHAPE_FIRST_SNAPSHOT", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_SNAPSHOT_EVERY") {
            config.progress.snapshot_every = parse_env("XML_SHAPE_SNAPSHOT_EVERY", &value)?;
        }

        // Input and output settings
        if let Some(dtd) = env.get("XML_SHAPE_DTD") {
            config.input.dtd = Some(PathBuf::from(dtd));
        }

        if let Some(dir) = env.get("XML_SHAPE_OUTPUT_DIR") {
            config.output.directory = PathBuf::from(dir);
        }

        if let Some(value) = env.get("XML_SHAPE_VERBOSE") {
            config.output.verbose = parse_env("XML_SHAPE_VERBOSE", &value)?;
        }

        if let Some(value) = env.get("XML_SHAPE_QUIET") {
            config.output.quiet = parse_env("XML_SHAPE_QUIET", &value)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        // Inference settings
        if let Some(samples) = cli.attribute_samples {
            config.inference.attribute_samples = samples;
        }
        if let Some(samples) = cli.text_samples {
            config.inference.text_samples = samples;
        }
        if let Some(length) = cli.max_sample_length {
            config.inference.max_sample_length = length;
        }
        if let Some(threshold) = cli.rarely_threshold {
            config.inference.rarely_threshold = threshold;
        }

        // Progress settings
        if cli.no_snapshots {
            config.progress.snapshots = false;
        }
        if let Some(first) = cli.first_snapshot {
            config.progress.first_snapshot_after = first;
        }
        if let Some(every) = cli.snapshot_every {
            config.progress.snapshot_every = every;
        }
        if cli.total_bytes.is_some() {
            config.progress.total_bytes = cli.total_bytes;
        }

        // Input and output settings
        if let Some(dtd) = &cli.dtd {
            config.input.dtd = Some(dtd.clone());
        }
        if let Some(dir) = &cli.output_dir {
            config.output.directory = dir.clone();
        }
        if cli.verbose {
            config.output.verbose = true;
        }
        if cli.quiet {
            config.output.quiet = true;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let inference = &config.inference;
        if inference.attribute_samples == 0 || inference.text_samples == 0 {
            return Err(ConfigError::Validation(
                "Sample limits must be greater than 0".to_string(),
            ));
        }

        if inference.max_sample_length == 0 {
            return Err(ConfigError::Validation(
                "Maximum sample length must be greater than 0".to_string(),
            ));
        }

        if !(inference.rarely_threshold > 0.0 && inference.rarely_threshold <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "Rarely threshold must be in (0, 1], got {}",
                inference.rarely_threshold
            )));
        }

        let progress = &config.progress;
        if progress.first_snapshot_after == 0 || progress.snapshot_every == 0 {
            return Err(ConfigError::Validation(
                "Snapshot intervals must be greater than 0".to_string(),
            ));
        }

        let output = &config.output;
        if output.snapshot_prefix.is_empty() || output.final_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "Report file prefixes cannot be empty".to_string(),
            ));
        }

        if output.snapshot_prefix == output.final_prefix {
            return Err(ConfigError::Validation(
                "Snapshot and final report prefixes must differ".to_string(),
            ));
        }

        for prefix in [&output.snapshot_prefix, &output.final_prefix] {
            if prefix.contains('/') || prefix.contains('\\') {
                return Err(ConfigError::Validation(format!(
                    "Invalid report file prefix: {}",
                    prefix
                )));
            }
        }

        if output.verbose && output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}
