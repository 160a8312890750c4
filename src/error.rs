use std::path::PathBuf;
use thiserror::Error;

/// Fatal error type for hubmeta
///
/// Anything surfacing as a `HubmetaError` aborts the run. Per-model failures
/// are reported as [`PipelineError`] instead and never reach this type.
#[derive(Error, Debug)]
pub enum HubmetaError {
    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/hubmeta/config.toml\n- Pass an explicit file with --config <path>\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Hub error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Verify hub.endpoint in config\n- Try increasing hub.timeout_secs in config")]
    Hub(#[from] HubError),

    #[error("Failed to write error log {}: {source}", path.display())]
    ErrorLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hub API errors
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Hub API returned {status} for {url}: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Failed to parse hub response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Hub response for {model_id} has no '{field}' field")]
    MissingField {
        model_id: String,
        field: &'static str,
    },
}

/// Failure of a single model's pipeline run
///
/// The batch driver logs these and moves on to the next model.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to reserve cache slot {}: {source}", path.display())]
    Reserve {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to clone {model_id}: {reason}")]
    Fetch { model_id: String, reason: String },

    #[error("Failed to read {model_id} in {}: {reason}", path.display())]
    Size {
        model_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to read {model_id} README at {}: {reason}", path.display())]
    Readme {
        model_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to fetch model info for {model_id}: {source}")]
    ModelInfo {
        model_id: String,
        #[source]
        source: HubError,
    },

    #[error("Failed to write cache record {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to prepare working directory for {model_id}: {source}")]
    Workspace {
        model_id: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HubmetaError>;
