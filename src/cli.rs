//! CLI front door.
//!
//! Each `run_*` function inspects one parsed block and builds the response
//! for the matching subcommand; the binary owns argument parsing and
//! emission. Reading input lives here too, since the library crates never
//! touch the filesystem.
//!
//! ## Error Handling
//!
//! All functions return `Result<T, CliError>`. Block failures surface
//! unchanged (a syntax error is cached on the block, so every command that
//! touches the tree reports the same error).

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};
use tugblock_core::config::ResolvedConfig;
use tugblock_core::{BlockError, BlockResult, FileText};
use tugblock_python::{NodeKind, PythonBlock, PythonStatement};

use crate::error::CliError;
use crate::output::{
    emit_response, emit_response_compact, AssignmentInfo, AssignmentsResponse, GroupInfo,
    GroupsResponse, StatementInfo, StatementKind, StatementsResponse, StringInfo,
    StringsResponse,
};

/// Path argument meaning "read standard input".
pub const STDIN_PATH: &str = "-";

// ============================================================================
// Input
// ============================================================================

/// Read `path` (or stdin for `-`) into a text span named after the file.
pub fn read_input(path: &Path) -> Result<FileText, CliError> {
    if path == Path::new(STDIN_PATH) {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .map_err(|e| CliError::read(path, e))?;
        return Ok(FileText::new(source));
    }
    let source = fs::read_to_string(path).map_err(|e| CliError::read(path, e))?;
    Ok(FileText::new(source).with_filename(path))
}

/// Read `path` and wrap it in a block carrying the configured flags.
pub fn load_block(path: &Path, config: &ResolvedConfig) -> Result<PythonBlock, CliError> {
    let text = read_input(path)?;
    debug!(
        path = %path.display(),
        lines = text.num_lines(),
        flags = %config.flags.value,
        source = ?config.flags.source,
        "loaded input"
    );
    Ok(PythonBlock::from_text(text, config.flags.value))
}

// ============================================================================
// Classification
// ============================================================================

/// Sort a statement into import / comment / docstring / code.
pub fn classify(statement: &PythonStatement) -> BlockResult<StatementKind> {
    Ok(if statement.is_comment_or_blank()? {
        StatementKind::Comment
    } else if statement.is_import()? {
        StatementKind::Import
    } else if statement.is_string_literal()? {
        StatementKind::Docstring
    } else {
        StatementKind::Code
    })
}

fn file_label(block: &PythonBlock) -> Option<String> {
    block.filename().map(|p| p.display().to_string())
}

// ============================================================================
// Commands
// ============================================================================

/// `statements`: every top-level statement and comment run, in order.
pub fn run_statements(block: &PythonBlock) -> Result<StatementsResponse, CliError> {
    let flags = block.flags()?;
    let statements = block
        .statements()?
        .iter()
        .map(|statement| {
            Ok(StatementInfo {
                kind: classify(statement)?,
                node: statement
                    .ast_node()?
                    .map(|node| node.kind_name().to_string()),
                start: statement.startpos().into(),
                end: statement.text().endpos().into(),
                text: statement.text().joined(),
            })
        })
        .collect::<BlockResult<Vec<_>>>()?;
    Ok(StatementsResponse::new(
        file_label(block),
        flags.to_string(),
        flags.names().into_iter().map(String::from).collect(),
        statements,
    ))
}

/// `strings`: every plain string literal, in source order.
pub fn run_strings(block: &PythonBlock) -> Result<StringsResponse, CliError> {
    let strings = block
        .string_literals()?
        .filter_map(|node| {
            let value = node.str_value()?.to_string();
            if node.startpos().is_none() {
                warn!(value = %value, "string literal has no recovered position");
            }
            Some(StringInfo {
                value,
                start: node.startpos().map(Into::into),
                end: node.endpos().map(Into::into),
            })
        })
        .collect();
    Ok(StringsResponse::new(file_label(block), strings))
}

fn assignment_target(statement: &PythonStatement) -> BlockResult<Option<String>> {
    let Some(node) = statement.ast_node()? else {
        return Ok(None);
    };
    let NodeKind::Assign { targets, .. } = node.kind() else {
        return Ok(None);
    };
    Ok(match targets.as_slice() {
        [target] => match node.tree().ast().kind(*target) {
            NodeKind::Name { id } => Some(id.clone()),
            _ => None,
        },
        _ => None,
    })
}

/// `assignments`: single-target assignments and their literal values.
///
/// Statements whose value is not a pure literal (or whose target is not a
/// plain name) are reported with an `error` instead of failing the command.
pub fn run_assignments(block: &PythonBlock) -> Result<AssignmentsResponse, CliError> {
    let mut assignments = Vec::new();
    for statement in block.statements()? {
        if !statement.is_single_assign()? {
            continue;
        }
        let start = statement.startpos().into();
        match statement.get_assignment_literal_value() {
            Ok((name, value)) => assignments.push(AssignmentInfo {
                name: Some(name),
                start,
                value: Some(value.to_string()),
                error: None,
            }),
            Err(err) if matches!(err.root(), BlockError::Literal { .. } | BlockError::Usage { .. }) => {
                debug!(at = %statement.startpos(), "not a literal assignment: {}", err);
                assignments.push(AssignmentInfo {
                    name: assignment_target(statement)?,
                    start,
                    value: None,
                    error: Some(err.to_string()),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(AssignmentsResponse::new(file_label(block), assignments))
}

/// `groups`: consecutive statements of the same kind, merged.
pub fn run_groups(block: &PythonBlock) -> Result<GroupsResponse, CliError> {
    let groups = block
        .group_by(classify)?
        .into_iter()
        .map(|(kind, group)| {
            Ok(GroupInfo {
                kind,
                start: group.startpos().into(),
                end: group.endpos().into(),
                statement_count: group.statements()?.len(),
                text: group.text().joined(),
            })
        })
        .collect::<BlockResult<Vec<_>>>()?;
    Ok(GroupsResponse::new(file_label(block), groups))
}

// ============================================================================
// Emission
// ============================================================================

/// Write `response` as JSON, compact or pretty-printed.
pub fn emit<T: Serialize>(
    response: &T,
    compact: bool,
    writer: &mut impl Write,
) -> Result<(), CliError> {
    let result = if compact {
        emit_response_compact(response, writer)
    } else {
        emit_response(response, writer)
    };
    result.map_err(CliError::Write)
}
