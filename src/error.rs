//! Error types shared by the playback pipeline
//!
//! Only data-integrity problems and cancellation surface as errors. Missing
//! results, lookup misses and layout timeouts are absorbed by the sequencers
//! (see [`crate::sequencer::PlaybackOutcome`]).

use thiserror::Error;

/// Errors that can occur while loading or playing back a run
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A saved run is missing a field that replay requires
    #[error("saved run is missing required field `{0}`")]
    MissingField(&'static str),

    /// A JSON-encoded field could not be decoded
    #[error("saved run field `{field}` is malformed: {source}")]
    MalformedField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The sequence was cancelled at a suspension point
    #[error("playback cancelled")]
    Cancelled,

    /// The configuration file extension is not recognised
    #[error("unsupported config format: {0}")]
    UnsupportedConfigFormat(String),

    /// A configuration value is out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML document could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for playback operations
pub type PlaybackResult<T> = Result<T, PlaybackError>;

impl PlaybackError {
    /// True when the error only means the sequence was interrupted
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlaybackError::Cancelled)
    }
}
