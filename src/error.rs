use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Scraping error: {0}")]
    Scraper(#[from] ScraperError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration: {0}")]
    MissingField(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build client: {0}")]
    BuildError(String),

    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Response error {status_code} from {url}")]
    ResponseError { status_code: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Missing {element} on {url}")]
    MissingElement { element: &'static str, url: String },

    #[error("Invalid {field} value {value:?} on {url}")]
    InvalidValue {
        field: &'static str,
        value: String,
        url: String,
    },

    #[error("Selector error: {0}")]
    SelectorError(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write record for scope {scope}: {source}")]
    Write {
        scope: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AppError {
    /// Short label used to tag structured log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Client(_) => "client",
            AppError::Scraper(_) => "scraper",
            AppError::Sink(_) => "sink",
            AppError::Io(_) => "io",
            AppError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
