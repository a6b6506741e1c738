//! CLI-level error type.
//!
//! `CliError` is the single error type the binary reports. It wraps the
//! library's [`BlockError`] and adds the failures that only exist at the
//! command-line boundary (reading input, bad arguments).
//!
//! ## Error Code Mapping
//!
//! Codes come from [`OutputErrorCode`]:
//! - `2`: unreadable input files and bad arguments
//! - `3`, `4`, `10`: whatever the wrapped [`BlockError`] maps to

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tugblock_core::{BlockError, OutputErrorCode};

/// Errors surfaced by the `tugblock` command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Parsing or inspecting the block failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// The input could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the response failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
}

impl CliError {
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CliError::Read {
            path: path.into(),
            source,
        }
    }
}

impl From<&CliError> for OutputErrorCode {
    fn from(err: &CliError) -> Self {
        match err {
            CliError::Block(err) => OutputErrorCode::from(err),
            CliError::Read { .. } => OutputErrorCode::InvalidArguments,
            CliError::Write(_) => OutputErrorCode::InternalError,
        }
    }
}
