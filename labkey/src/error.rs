use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unable to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unable to authenticate: {0}")]
    Auth(String),

    #[error("Invalid filter `{0}`, expected `<column>~<operator>`")]
    FilterParse(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

impl Error {
    /// Status code of a failed request, when the server answered at all.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
