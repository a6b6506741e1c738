//! tugblock: statement-granular Python source blocks.
//!
//! Splits Python source into top-level statements with exact positions,
//! recovers string literal locations, and evaluates literal assignments.
//! The `tugblock` binary exposes these as JSON-emitting subcommands.

// Core infrastructure - re-exported from tugblock-core
pub use tugblock_core::config;
pub use tugblock_core::flags;
pub use tugblock_core::text;
pub use tugblock_core::{BlockError, BlockResult, CompilerFlags, FilePos, FileText, OutputErrorCode};

// Python layer
pub use tugblock_python::{
    BlockOptions, CodeInput, LiteralValue, NodeKind, NodeRef, PythonBlock, PythonStatement,
};

// Front door
pub mod cli;
pub mod error;
pub mod output;
