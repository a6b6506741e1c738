//! Error types and error code constants for tugblock.
//!
//! ## Error Classes
//!
//! - **Input rejection** ([`BlockError::Syntax`]): the parser refused the text.
//!   Wrapped in [`BlockError::InFile`] when the originating file is known.
//! - **Internal consistency** ([`BlockError::Internal`]): a position or
//!   ordering rule is missing for some construct. Never expected on
//!   well-formed input; the message carries the full diagnostic.
//! - **Usage** ([`BlockError::Usage`]): the caller broke an API contract.
//! - **Literal evaluation** ([`BlockError::Literal`]): a value that is not a
//!   pure literal was handed to the literal-only evaluator.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (usage faults)
//! - `3`: Input rejected (syntax errors)
//! - `4`: Literal evaluation failed
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable numeric codes for CLI exit status and JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// The parser rejected the input.
    InputRejected = 3,
    /// A value could not be evaluated as a literal.
    LiteralError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// BlockError
// ============================================================================

/// Errors produced while parsing, annotating, splitting, or inspecting blocks.
///
/// Errors are `Clone` so a failed parse can be cached on its block and handed
/// out again, unchanged, on every later access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// The parser rejected the source text.
    #[error("{message} (line {line}, column {col})")]
    Syntax { message: String, line: u32, col: u32 },

    /// Internal consistency fault.
    #[error("internal error: {message}")]
    Internal { message: String },

    /// The caller violated an API contract.
    #[error("invalid argument: {message}")]
    Usage { message: String },

    /// Literal-only evaluation failed.
    #[error("{message}")]
    Literal { message: String },

    /// Any of the above, raised while parsing a named file.
    #[error("While parsing {filename}: {source}")]
    InFile {
        filename: String,
        #[source]
        source: Box<BlockError>,
    },
}

/// Result alias used throughout tugblock.
pub type BlockResult<T> = Result<T, BlockError>;

impl BlockError {
    pub fn syntax(message: impl Into<String>, line: u32, col: u32) -> Self {
        BlockError::Syntax {
            message: message.into(),
            line,
            col,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        BlockError::Internal {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        BlockError::Usage {
            message: message.into(),
        }
    }

    pub fn literal(message: impl Into<String>) -> Self {
        BlockError::Literal {
            message: message.into(),
        }
    }

    /// Prefix this error with the file it was raised for.
    pub fn in_file(self, filename: impl Into<String>) -> Self {
        BlockError::InFile {
            filename: filename.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, with any filename wrappers removed.
    pub fn root(&self) -> &BlockError {
        match self {
            BlockError::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self.root(), BlockError::Syntax { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.root(), BlockError::Internal { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self.root(), BlockError::Usage { .. })
    }
}

impl From<&BlockError> for OutputErrorCode {
    fn from(err: &BlockError) -> Self {
        match err.root() {
            BlockError::Syntax { .. } => OutputErrorCode::InputRejected,
            BlockError::Usage { .. } => OutputErrorCode::InvalidArguments,
            BlockError::Literal { .. } => OutputErrorCode::LiteralError,
            BlockError::Internal { .. } | BlockError::InFile { .. } => {
                OutputErrorCode::InternalError
            }
        }
    }
}
