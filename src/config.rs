use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `<scope>.jsonl` file per scope.
    Jsonl,
    /// Records are written to the log only.
    Stdout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_search_term")]
    pub search_term: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Overrides `scopes` when set: one scope per line.
    #[serde(default)]
    pub scope_file: Option<String>,

    #[serde(default)]
    pub review_limit: Option<usize>,

    #[serde(default = "default_scope_concurrency")]
    pub scope_concurrency: usize,

    /// Seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Seconds; no limit when absent.
    #[serde(default)]
    pub run_timeout: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
            filename: default_log_filename(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            directory: default_output_directory(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_term: default_search_term(),
            scopes: default_scopes(),
            scope_file: None,
            review_limit: None,
            scope_concurrency: default_scope_concurrency(),
            request_timeout: default_request_timeout(),
            run_timeout: None,
            user_agent: default_user_agent(),
            proxy: None,
            output: OutputConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the file if it exists, otherwise falls back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField("base_url".to_string()).into());
        }
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::InvalidValue(format!(
                "base_url must start with http(s): {}",
                self.base_url
            ))
            .into());
        }

        if self.search_term.trim().is_empty() {
            return Err(ConfigError::MissingField("search_term".to_string()).into());
        }

        if self.scope_file.is_none() && self.scopes.is_empty() {
            return Err(ConfigError::MissingField("scopes or scope_file".to_string()).into());
        }

        if self.scope_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "scope_concurrency must be greater than 0".to_string(),
            )
            .into());
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be greater than 0".to_string(),
            )
            .into());
        }

        if self.review_limit == Some(0) {
            return Err(ConfigError::InvalidValue(
                "review_limit must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Scopes for this run, from `scope_file` when configured.
    pub fn resolve_scopes(&self) -> Result<Vec<String>> {
        let scopes = match &self.scope_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;
                parse_scope_list(&content)
            }
            None => self.scopes.clone(),
        };

        if scopes.is_empty() {
            return Err(ConfigError::MissingField("scopes".to_string()).into());
        }
        Ok(scopes)
    }

    pub fn output_directory(&self) -> PathBuf {
        PathBuf::from(&self.output.directory)
    }
}

/// One scope per line; blank lines and `#` comments are ignored.
pub fn parse_scope_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn default_base_url() -> String {
    "https://www.yelp.com".to_string()
}

fn default_search_term() -> String {
    "Strip Club".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "Portland OR",
        "New York NY",
        "Los Angeles CA",
        "Chicago IL",
        "Houston TX",
        "Phoenix AZ",
        "Philadelphia PA",
        "San Antonio TX",
        "San Diego CA",
        "Dallas TX",
        "San Jose CA",
        "Austin TX",
        "San Francisco CA",
        "Charlotte NC",
        "Seattle WA",
        "Denver CO",
        "Washington DC",
        "Boston MA",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_scope_concurrency() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    crate::client::DEFAULT_USER_AGENT.to_string()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Jsonl
}

fn default_output_directory() -> String {
    "data/reviews".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_filename() -> String {
    "crawler.log".to_string()
}
