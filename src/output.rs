//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response has `status` as its first field
//! 2. **Deterministic:** same input gives the same output (field order, array order)
//! 3. **Nullable vs absent:** explicit `null` for "no value"; an absent field means
//!    "not applicable"
//! 4. **Versioned:** `schema_version` in every response
//!
//! Positions are 1-indexed `{line, col}` pairs. Python values (string
//! literal contents aside) are rendered as their Python `repr`.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tugblock_core::{BlockError, FilePos, OutputErrorCode};

use crate::error::CliError;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Shared Types
// ============================================================================

/// A 1-indexed position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

impl From<FilePos> for Location {
    fn from(pos: FilePos) -> Self {
        Location {
            line: pos.lineno,
            col: pos.colno,
        }
    }
}

/// What a statement chunk holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// `import` / `from ... import`.
    Import,
    /// Comments and blank lines only.
    Comment,
    /// A bare string literal.
    Docstring,
    /// Anything else.
    Code,
}

// ============================================================================
// statements
// ============================================================================

/// One top-level statement or comment/blank run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementInfo {
    pub kind: StatementKind,
    /// Node kind (`Assign`, `FunctionDef`, ...); `null` for comment runs.
    pub node: Option<String>,
    pub start: Location,
    pub end: Location,
    pub text: String,
}

/// Response for the `statements` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementsResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Effective compiler flags, as hex.
    pub flags: String,
    /// Names of the `__future__` features behind `flags`.
    pub features: Vec<String>,
    pub statements: Vec<StatementInfo>,
}

impl StatementsResponse {
    pub fn new(
        file: Option<String>,
        flags: String,
        features: Vec<String>,
        statements: Vec<StatementInfo>,
    ) -> Self {
        StatementsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file,
            flags,
            features,
            statements,
        }
    }
}

// ============================================================================
// strings
// ============================================================================

/// A string literal and where it sits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringInfo {
    pub value: String,
    pub start: Option<Location>,
    /// Known only for strings whose start needed recovering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Location>,
}

/// Response for the `strings` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringsResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub strings: Vec<StringInfo>,
}

impl StringsResponse {
    pub fn new(file: Option<String>, strings: Vec<StringInfo>) -> Self {
        StringsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file,
            strings,
        }
    }
}

// ============================================================================
// assignments
// ============================================================================

/// A `name = value` statement.
///
/// Exactly one of `value` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentInfo {
    pub name: Option<String>,
    pub start: Location,
    /// Python `repr` of the evaluated literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for the `assignments` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentsResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub assignments: Vec<AssignmentInfo>,
}

impl AssignmentsResponse {
    pub fn new(file: Option<String>, assignments: Vec<AssignmentInfo>) -> Self {
        AssignmentsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file,
            assignments,
        }
    }
}

// ============================================================================
// groups
// ============================================================================

/// A run of consecutive statements of the same kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    pub kind: StatementKind,
    pub start: Location,
    pub end: Location,
    pub statement_count: usize,
    pub text: String,
}

/// Response for the `groups` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub groups: Vec<GroupInfo>,
}

impl GroupsResponse {
    pub fn new(file: Option<String>, groups: Vec<GroupInfo>) -> Self {
        GroupsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file,
            groups,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (also the exit status).
    pub code: u8,
    pub message: String,
    /// File the error was raised for, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Where the parser gave up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a CliError.
    pub fn from_error(err: &CliError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();
        let (file, location) = match err {
            CliError::Block(err) => block_error_context(err),
            CliError::Read { path, .. } => (Some(path.display().to_string()), None),
            CliError::Write(_) => (None, None),
        };
        ErrorInfo {
            code,
            message,
            file,
            location,
        }
    }
}

fn block_error_context(err: &BlockError) -> (Option<String>, Option<Location>) {
    let file = match err {
        BlockError::InFile { filename, .. } => Some(filename.clone()),
        _ => None,
    };
    let location = match err.root() {
        BlockError::Syntax { line, col, .. } => Some(Location {
            line: *line,
            col: *col,
        }),
        _ => None,
    };
    (file, location)
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(error: ErrorInfo) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error,
        }
    }

    pub fn from_error(err: &CliError) -> Self {
        Self::new(ErrorInfo::from_error(err))
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod response_shape {
        use super::*;

        #[test]
        fn status_is_the_first_field() {
            let response = StringsResponse::new(None, vec![]);
            let json = serde_json::to_string(&response).unwrap();
            assert!(json.starts_with("{\"status\":\"ok\""));
            assert!(json.contains("\"schema_version\":\"1\""));
            assert!(!json.contains("\"file\""));
        }

        #[test]
        fn statement_kinds_are_lowercase() {
            let info = StatementInfo {
                kind: StatementKind::Docstring,
                node: Some("Expr".to_string()),
                start: FilePos::new(1, 1).into(),
                end: FilePos::new(2, 4).into(),
                text: "'''a\nb'''".to_string(),
            };
            let json = serde_json::to_value(&info).unwrap();
            assert_eq!(json["kind"], "docstring");
            assert_eq!(json["start"]["line"], 1);
            assert_eq!(json["end"]["col"], 4);
        }

        #[test]
        fn missing_string_start_is_null() {
            let info = StringInfo {
                value: "x".to_string(),
                start: None,
                end: None,
            };
            let json = serde_json::to_string(&info).unwrap();
            assert!(json.contains("\"start\":null"));
            assert!(!json.contains("\"end\""));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn syntax_error_carries_file_and_location() {
            let err = CliError::from(BlockError::syntax("invalid syntax", 2, 5).in_file("m.py"));
            let info = ErrorInfo::from_error(&err);
            assert_eq!(info.code, 3);
            assert_eq!(info.file.as_deref(), Some("m.py"));
            assert_eq!(info.location, Some(Location { line: 2, col: 5 }));
        }

        #[test]
        fn internal_error_has_no_location() {
            let err = CliError::from(BlockError::internal("boom"));
            let response = ErrorResponse::from_error(&err);
            assert_eq!(response.status, "error");
            assert_eq!(response.error.code, 10);
            assert!(response.error.location.is_none());
        }
    }

    mod emission {
        use super::*;

        #[test]
        fn compact_is_one_line() {
            let response = GroupsResponse::new(Some("a.py".to_string()), vec![]);
            let mut out = Vec::new();
            emit_response_compact(&response, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert_eq!(text.lines().count(), 1);
            assert!(text.ends_with('\n'));
        }

        #[test]
        fn pretty_spans_lines() {
            let response = GroupsResponse::new(None, vec![]);
            let mut out = Vec::new();
            emit_response(&response, &mut out).unwrap();
            assert!(String::from_utf8(out).unwrap().lines().count() > 1);
        }
    }
}
