use std::path::PathBuf;
use terra_rust_core::FetchError;
use thiserror::Error;

/// Reasons a single monitor cycle ends early. None of them stop the service.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("unable to monitor, error: {first}")]
    Game { first: String, count: usize },

    #[error("no action required but game not aborted or finished")]
    Consistency,
}

impl CycleError {
    /// Build a game error from the server's error list.
    pub fn from_server_errors(errors: &[String]) -> Self {
        CycleError::Game {
            first: errors.first().cloned().unwrap_or_default(),
            count: errors.len(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must not be empty")]
    Invalid(&'static str),
}
