//! Core infrastructure for tugblock.
//!
//! This crate provides the language-agnostic pieces the Python layer builds on:
//! - Text positions and immutable, line-addressable text spans
//! - Compiler feature flags (`__future__` dialect toggles)
//! - Error types and stable error codes
//! - Configuration resolution with source precedence

pub mod config;
pub mod error;
pub mod flags;
pub mod text;

pub use error::{BlockError, BlockResult, OutputErrorCode};
pub use flags::CompilerFlags;
pub use text::{FilePos, FileText};
