use std::io;

use thiserror::Error;

use crate::validation::{BYTES_PER_MB, MAX_FILE_SIZE, hundredths};

/// Input problems caught before anything leaves the machine.
///
/// These are shown inline next to the offending control and never move the
/// wizard to another step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(
        "File size exceeds the maximum limit of {limit}MB. Current size: {size:.2}MB",
        limit = MAX_FILE_SIZE / BYTES_PER_MB,
        size = megabytes(.size_bytes)
    )]
    FileTooLarge { size_bytes: u64 },

    #[error("Unsupported file format. Please upload MP4, MOV, or WebM files. Current type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("Please enter an analysis prompt")]
    EmptyPrompt,

    #[error("Please select a video to upload")]
    MissingFile,
}

// thiserror hands fields over by reference
fn megabytes(bytes: &u64) -> f64 {
    hundredths(*bytes as f64 / BYTES_PER_MB as f64)
}

/// Failures of a remote analysis call.
///
/// The `Display` text is what ends up after `"Error: "` in the result panel.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Could not read '{name}': {source}")]
    ReadFile {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Could not build the upload request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("The analysis service did not respond in time")]
    Timeout,

    #[error("{0}")]
    Service(String),

    #[error("Unexpected response from the analysis service: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Network(err)
        }
    }
}

/// Problems loading or saving the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Config file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
