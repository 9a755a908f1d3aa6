use thiserror::Error;

/// Main error type for wikitree
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Fetch failed for {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run explored nothing beyond a childless seed
    #[error("No results for seed term: {0}")]
    NoResults(String),
}

/// Convenient Result type using CrawlError
pub type Result<T> = std::result::Result<T, CrawlError>;
