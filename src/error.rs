use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lookup error for '{param}': {message}")]
    Lookup { param: String, message: String },

    #[error("Lookup for '{0}' timed out")]
    LookupTimeout(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
