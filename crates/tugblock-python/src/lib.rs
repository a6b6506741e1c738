//! Python source blocks with exact per-node positions.
//!
//! This crate turns Python source text into statement-granular blocks:
//! - `parser`: tree-sitter based parsing into an arena [`Ast`]
//! - `order`: child enumeration in true source order
//! - `annotate`: start/end position recovery, including multi-line strings
//! - `split`: partition of a text span into statement and comment chunks
//! - `block`: the [`PythonBlock`] / [`PythonStatement`] value types
//! - `literal`: string decoding and literal-only evaluation

pub mod annotate;
pub mod block;
pub mod literal;
pub mod nodes;
pub mod order;
pub mod parser;
pub mod split;

pub use annotate::{annotate, AnnotatedTree, NodeRef, Positions};
pub use block::{BlockOptions, CodeInput, Module, PythonBlock, PythonStatement, StringLiterals};
pub use literal::{literal_eval, LiteralValue};
pub use nodes::{Ast, Node, NodeId, NodeKind, RawPos};
pub use parser::PythonParser;
pub use split::{split_code_lines, Chunk, NodeSpan};
