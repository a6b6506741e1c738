//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

use tugblock::config::{
    CliOverrides, ConfigSource, ConfigValue, ResolvedConfig, ENV_COMPACT, ENV_FLAGS,
};
use tugblock::flags::FlagsParseError;
use tugblock::text::byte_to_char_column;
use tugblock::{BlockError, BlockResult, CompilerFlags, FilePos, FileText, OutputErrorCode};

// ============================================================================
// Python Layer
// ============================================================================

use tugblock::{BlockOptions, CodeInput, LiteralValue, NodeKind, NodeRef, PythonBlock, PythonStatement};
use tugblock_python::order::{child_nodes_in_order, walk_in_order};
use tugblock_python::{
    annotate, literal_eval, split_code_lines, AnnotatedTree, Ast, Chunk, Module,
    Node, NodeId, NodeSpan, Positions, PythonParser, RawPos, StringLiterals,
};

// ============================================================================
// Front Door
// ============================================================================

use tugblock::cli::{
    classify, emit, load_block, read_input, run_assignments, run_groups, run_statements,
    run_strings, STDIN_PATH,
};
use tugblock::error::CliError;
use tugblock::output::{
    emit_response, emit_response_compact, AssignmentInfo, AssignmentsResponse, ErrorInfo,
    ErrorResponse, GroupInfo, GroupsResponse, Location, StatementInfo, StatementKind,
    StatementsResponse, StringInfo, StringsResponse, SCHEMA_VERSION,
};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    // The imports above form the public API contract.
    let _ = std::any::type_name::<PythonBlock>();
    let _ = std::any::type_name::<PythonStatement>();
    let _ = std::any::type_name::<NodeRef>();
    let _ = std::any::type_name::<BlockError>();
    let _ = std::any::type_name::<CliError>();
    let _ = std::any::type_name::<ResolvedConfig>();
    let _ = std::any::type_name::<StatementsResponse>();
}

#[test]
fn schema_version_is_stable() {
    assert_eq!(SCHEMA_VERSION, "1");
}
