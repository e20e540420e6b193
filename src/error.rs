use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while discovering or sampling block devices.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load devices from {pattern}: {source}")]
    Discovery {
        pattern: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid device pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: &'static str },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed device name: {}", path.display())]
    MalformedPath { path: PathBuf },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
