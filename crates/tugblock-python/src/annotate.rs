//! Start/end position recovery.
//!
//! Every positioned node gets an absolute start position. Most come straight
//! from the parser. Multi-line plain string literals do not: the parser only
//! reports the line their first piece *ends* on, so the start (and the exact
//! end) is recovered by trying candidate quote ranges and re-parsing each one
//! until a range decodes to exactly the literal's value. Ancestors whose
//! first token is such a string inherit the recovered start.

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use tugblock_core::text::byte_to_char_column;
use tugblock_core::{BlockError, BlockResult, FilePos, FileText};

use crate::literal::{literal_eval, LiteralValue};
use crate::nodes::{Ast, Node, NodeId, NodeKind};
use crate::order::child_nodes_in_order;
use crate::parser::PythonParser;

static STRING_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[bBrRuU]*["']"#).expect("valid regex"));

static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']"#).expect("valid regex"));

// ============================================================================
// Annotated tree
// ============================================================================

/// Absolute positions, indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positions {
    start: Vec<Option<FilePos>>,
    end: Vec<Option<FilePos>>,
}

impl Positions {
    fn new(len: usize) -> Self {
        Positions {
            start: vec![None; len],
            end: vec![None; len],
        }
    }

    pub fn start(&self, id: NodeId) -> Option<FilePos> {
        self.start.get(id.index()).copied().flatten()
    }

    /// Only known for recovered string literals (and bare statements
    /// wrapping them).
    pub fn end(&self, id: NodeId) -> Option<FilePos> {
        self.end.get(id.index()).copied().flatten()
    }
}

/// A parsed module together with its recovered positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedTree {
    ast: Ast,
    positions: Positions,
}

impl AnnotatedTree {
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn startpos(&self, id: NodeId) -> Option<FilePos> {
        self.positions.start(id)
    }

    pub fn endpos(&self, id: NodeId) -> Option<FilePos> {
        self.positions.end(id)
    }
}

/// Assign absolute positions to every positioned node of `ast`.
///
/// `text` must be the text `ast` was parsed from. `parser` is reused to
/// re-parse candidate string ranges.
pub fn annotate(
    ast: Ast,
    text: &FileText,
    parser: &mut PythonParser,
) -> BlockResult<AnnotatedTree> {
    let mut annotator = Annotator {
        ast: &ast,
        text,
        parser,
        positions: Positions::new(ast.len()),
    };
    annotator.annotate_node(ast.root(), text.startpos())?;
    let positions = annotator.positions;
    Ok(AnnotatedTree { ast, positions })
}

// ============================================================================
// Annotator
// ============================================================================

struct Annotator<'a> {
    ast: &'a Ast,
    text: &'a FileText,
    parser: &'a mut PythonParser,
    positions: Positions,
}

impl Annotator<'_> {
    /// Returns whether `id` is, or starts with, a multi-line string literal.
    fn annotate_node(&mut self, id: NodeId, minpos: FilePos) -> BlockResult<bool> {
        let mut child_minpos = minpos;
        let mut leading_string = None;
        for (index, child) in child_nodes_in_order(self.ast, id).into_iter().enumerate() {
            let is_string_led = self.annotate_node(child, child_minpos)?;
            if index == 0 && is_string_led {
                leading_string = Some(child);
            }
            if let Some(start) = self.positions.start(child) {
                if start < child_minpos {
                    return Err(self.out_of_order(id, child, minpos));
                }
                child_minpos = start;
            }
        }

        let node = self.ast.node(id);
        let Some(raw) = node.pos else {
            return Ok(false);
        };
        if raw.has_column() {
            let start = self.text.startpos() + (raw.lineno - 1, raw.col_offset as u32);
            self.positions.start[id.index()] = Some(start);
            return Ok(false);
        }

        if let Some(first) = leading_string {
            self.positions.start[id.index()] = self.positions.start(first);
            if matches!(node.kind, NodeKind::Expr { value } if value == first) {
                self.positions.end[id.index()] = self.positions.end(first);
            }
            return Ok(true);
        }

        match &node.kind {
            NodeKind::Str { s, .. } => self.locate_string(id, s, raw.lineno, minpos),
            _ => Err(BlockError::internal(format!(
                "got a non-string col_offset=-1: {}",
                self.ast.dump(id)
            ))),
        }
    }

    fn locate_string(
        &mut self,
        id: NodeId,
        target: &str,
        raw_lineno: u32,
        minpos: FilePos,
    ) -> BlockResult<bool> {
        let text = self.text;
        let first_end = text.startpos().lineno + raw_lineno - 1;
        if minpos.lineno > first_end {
            return Err(BlockError::internal(format!(
                "string ending on line {} starts after its lower bound {}: {}",
                first_end,
                minpos,
                self.ast.dump(id)
            )));
        }
        debug!(node = %id, first_end, minpos = %minpos, "searching for multi-line string");

        let mut opens: Vec<(char, FilePos)> = Vec::new();
        for lineno in minpos.lineno..=first_end {
            let line = text.line(lineno).unwrap_or("");
            let startcol = text.line_startcol(lineno);
            for m in STRING_OPEN.find_iter(line) {
                let quote = m.as_str().chars().last().unwrap_or('"');
                let pos = FilePos::new(lineno, startcol + byte_to_char_column(line, m.start()));
                if pos >= minpos {
                    opens.push((quote, pos));
                }
            }
        }

        for end_lineno in first_end..=text.endpos().lineno {
            let line = text.line(end_lineno).unwrap_or("");
            let startcol = text.line_startcol(end_lineno);
            let closes: Vec<(char, FilePos)> = QUOTE
                .find_iter(line)
                .map(|m| {
                    let quote = m.as_str().chars().next().unwrap_or('"');
                    let col = startcol + byte_to_char_column(line, m.start()) + 1;
                    (quote, FilePos::new(end_lineno, col))
                })
                .collect();
            if closes.is_empty() {
                if end_lineno == first_end {
                    return Err(BlockError::internal(
                        "No quote char found on line with supposed string",
                    ));
                }
                continue;
            }

            // Mismatched quote chars only happen with adjacent concatenation
            // like "foo"'''bar''', so try them last.
            let mut likely = Vec::new();
            let mut unlikely = Vec::new();
            for (close_quote, end) in closes.iter().rev() {
                for (open_quote, start) in &opens {
                    if start >= end {
                        continue;
                    }
                    if open_quote == close_quote {
                        likely.push((*start, *end));
                    } else {
                        unlikely.push((*start, *end));
                    }
                }
            }

            let mut viable: Vec<FilePos> = Vec::new();
            for (start, end) in likely.into_iter().chain(unlikely) {
                let fragment = self.candidate_fragment(start, end);
                let Some(candidate) = self.parser.parse_string_literal(&fragment) else {
                    continue;
                };
                trace!(start = %start, end = %end, "candidate string range parsed");
                if candidate == target {
                    self.positions.start[id.index()] = Some(start);
                    self.positions.end[id.index()] = Some(end);
                    return Ok(true);
                }
                if target.starts_with(&candidate) && !viable.contains(&start) {
                    viable.push(start);
                }
            }
            if viable.is_empty() {
                break;
            }
            opens.retain(|(_, start)| viable.contains(start));
        }

        Err(BlockError::internal(format!(
            "Couldn't find exact position of {}",
            self.ast.dump(id)
        )))
    }

    /// Source between `start` and `end`, with continuation lines dedented the
    /// same way the module was before parsing.
    fn candidate_fragment(&self, start: FilePos, end: FilePos) -> String {
        let slice = self.text.slice(start, end);
        let dedent = self.ast.dedent();
        let mut lines = slice.lines().iter();
        let mut out = lines.next().cloned().unwrap_or_default();
        for line in lines {
            out.push('\n');
            out.push_str(line.strip_prefix(dedent).unwrap_or(line));
        }
        out
    }

    fn out_of_order(&self, parent: NodeId, culprit: NodeId, minpos: FilePos) -> BlockError {
        let kind = self.ast.kind(parent);
        let mut message = String::from("Got out-of-order AST node(s):\n");
        message.push_str(&format!("  parent minpos={}\n", minpos));
        message.push_str(&format!("    node: {}\n", self.ast.dump(parent)));
        message.push_str(&format!("      fields: {}\n", kind.fields().join(" ")));
        message.push_str("      children:\n");
        for child in child_nodes_in_order(self.ast, parent) {
            let marker = if child == culprit { "==>" } else { "   " };
            let start = self
                .positions
                .start(child)
                .map(|p| p.to_string())
                .unwrap_or_default();
            message.push_str(&format!(
                "        {} {:>9}: {}\n",
                marker,
                start,
                self.ast.dump(child)
            ));
        }
        message.push_str(&format!(
            "\nA child ordering rule is missing or wrong for {} nodes.",
            kind.name()
        ));
        BlockError::internal(message)
    }
}

// ============================================================================
// NodeRef
// ============================================================================

/// A handle on one node of a shared [`AnnotatedTree`].
///
/// Handles from different trees never compare equal, even when the trees
/// were parsed from identical text.
#[derive(Clone)]
pub struct NodeRef {
    tree: Rc<AnnotatedTree>,
    id: NodeId,
}

impl NodeRef {
    pub fn new(tree: Rc<AnnotatedTree>, id: NodeId) -> Self {
        NodeRef { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &Rc<AnnotatedTree> {
        &self.tree
    }

    pub fn node(&self) -> &Node {
        self.tree.ast().node(self.id)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.node().kind
    }

    pub fn kind_name(&self) -> &str {
        self.kind().name()
    }

    pub fn startpos(&self) -> Option<FilePos> {
        self.tree.startpos(self.id)
    }

    pub fn endpos(&self) -> Option<FilePos> {
        self.tree.endpos(self.id)
    }

    /// Children in source order.
    pub fn children(&self) -> Vec<NodeRef> {
        child_nodes_in_order(self.tree.ast(), self.id)
            .into_iter()
            .map(|id| NodeRef::new(Rc::clone(&self.tree), id))
            .collect()
    }

    /// The decoded value, if this is a plain string literal.
    pub fn str_value(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Str { s, .. } => Some(s),
            _ => None,
        }
    }

    pub fn dump(&self) -> String {
        self.tree.ast().dump(self.id)
    }

    pub fn literal_value(&self) -> BlockResult<LiteralValue> {
        literal_eval(self.tree.ast(), self.id)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.startpos() {
            Some(pos) => write!(f, "{} at {}", self.dump(), pos),
            None => write!(f, "{}", self.dump()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tugblock_core::CompilerFlags;

    fn annotated(text: &FileText) -> BlockResult<AnnotatedTree> {
        let mut parser = PythonParser::new().unwrap();
        let ast = parser.parse_module(text, CompilerFlags::NONE)?;
        annotate(ast, text, &mut parser)
    }

    fn body_starts(tree: &AnnotatedTree) -> Vec<Option<FilePos>> {
        tree.ast()
            .module_body()
            .iter()
            .map(|id| tree.startpos(*id))
            .collect()
    }

    mod plain {
        use super::*;

        #[test]
        fn columns_become_one_indexed() {
            let tree = annotated(&FileText::new("x = 1\n  \nif y:\n    z = 2\n")).unwrap();
            assert_eq!(
                body_starts(&tree),
                vec![Some(FilePos::new(1, 1)), Some(FilePos::new(3, 1))]
            );
        }

        #[test]
        fn anchored_text_shifts_first_line_only() {
            let text = FileText::new("a = 1\nb = 2").with_startpos(FilePos::new(5, 9));
            let tree = annotated(&text).unwrap();
            assert_eq!(
                body_starts(&tree),
                vec![Some(FilePos::new(5, 9)), Some(FilePos::new(6, 1))]
            );
        }

        #[test]
        fn unpositioned_nodes_have_no_start() {
            let tree = annotated(&FileText::new("import os\n")).unwrap();
            assert_eq!(tree.startpos(tree.ast().root()), None);
        }
    }

    mod multiline_strings {
        use super::*;

        #[test]
        fn docstring_statement_gets_start_and_end() {
            let tree = annotated(&FileText::new("x = 1\n'''foo\nbar'''\ny = 2\n")).unwrap();
            let expr = tree.ast().module_body()[1];
            assert_eq!(tree.startpos(expr), Some(FilePos::new(2, 1)));
            assert_eq!(tree.endpos(expr), Some(FilePos::new(3, 7)));
        }

        #[test]
        fn leading_string_infects_ancestors() {
            let tree = annotated(&FileText::new("'''a\nb''' + c\n")).unwrap();
            let stmt = tree.ast().module_body()[0];
            assert_eq!(tree.startpos(stmt), Some(FilePos::new(1, 1)));
            // BinOp wraps the string, so only the string itself has an end
            assert_eq!(tree.endpos(stmt), None);
        }

        #[test]
        fn adjacent_strings_with_different_quotes() {
            let source = "x = 0\n(\"\"\"a\nb\"\"\" '''c\nd''')\n";
            let tree = annotated(&FileText::new(source)).unwrap();
            let stmt = tree.ast().module_body()[1];
            assert_eq!(tree.startpos(stmt), Some(FilePos::new(2, 1)));
            let NodeKind::Expr { value } = tree.ast().kind(stmt) else {
                panic!("expected Expr");
            };
            assert_eq!(tree.startpos(*value), Some(FilePos::new(2, 2)));
            assert_eq!(tree.endpos(*value), Some(FilePos::new(4, 5)));
        }

        #[test]
        fn string_inside_indented_block() {
            let source = "def f():\n    '''doc\n    more'''\n    return 1\n";
            let tree = annotated(&FileText::new(source)).unwrap();
            let def = tree.ast().module_body()[0];
            let NodeKind::FunctionDef { body, .. } = tree.ast().kind(def) else {
                panic!("expected FunctionDef");
            };
            assert_eq!(tree.startpos(body[0]), Some(FilePos::new(2, 5)));
            assert_eq!(tree.startpos(body[1]), Some(FilePos::new(4, 5)));
        }

        #[test]
        fn dedented_text_matches_indented_continuation() {
            let source = "    x = '''a\n    b'''\n    '''c\n    d'''\n";
            let tree = annotated(&FileText::new(source)).unwrap();
            assert_eq!(
                body_starts(&tree),
                vec![Some(FilePos::new(1, 5)), Some(FilePos::new(3, 5))]
            );
        }
    }

    mod faults {
        use super::*;
        use crate::nodes::RawPos;

        fn module(mut ast: Ast, stmt: NodeId) -> Ast {
            let root = ast.push(NodeKind::Module { body: vec![stmt] }, None);
            ast.finish(root, String::new())
        }

        #[test]
        fn out_of_order_children_name_the_rule() {
            // right operand reported before the left one
            let mut ast = Ast::new();
            let left = ast.push(NodeKind::Name { id: "x".into() }, Some(RawPos::new(1, 4)));
            let right = ast.push(NodeKind::Name { id: "y".into() }, Some(RawPos::new(1, 0)));
            let op = ast.push(
                NodeKind::BinOp {
                    left,
                    op: "+".into(),
                    right,
                },
                Some(RawPos::new(1, 0)),
            );
            let stmt = ast.push(NodeKind::Expr { value: op }, Some(RawPos::new(1, 0)));
            let ast = module(ast, stmt);

            let text = FileText::new("x + y\n");
            let mut parser = PythonParser::new().unwrap();
            let err = annotate(ast, &text, &mut parser).unwrap_err();
            assert!(err.is_internal());
            let message = err.to_string();
            assert!(message.contains("Got out-of-order AST node(s)"));
            assert!(message.contains("fields: left op right"));
            assert!(message.contains("==>"));
            assert!(message.contains("(1,1): Name(id='y')"));
            assert!(message.contains("missing or wrong for BinOp nodes"));
        }

        #[test]
        fn string_missing_from_text_exhausts_the_search() {
            let mut ast = Ast::new();
            let s = ast.push(
                NodeKind::Str {
                    s: "zz".into(),
                    is_bytes: false,
                },
                Some(RawPos::unknown_column(1)),
            );
            let stmt = ast.push(NodeKind::Expr { value: s }, Some(RawPos::unknown_column(1)));
            let ast = module(ast, stmt);

            let text = FileText::new("'a'\n");
            let mut parser = PythonParser::new().unwrap();
            let err = annotate(ast, &text, &mut parser).unwrap_err();
            assert!(err.is_internal());
            assert!(err
                .to_string()
                .contains("Couldn't find exact position of Str(s='zz')"));
        }

        #[test]
        fn sentinel_on_a_non_string_is_internal() {
            let mut ast = Ast::new();
            let name = ast.push(NodeKind::Name { id: "x".into() }, Some(RawPos::unknown_column(1)));
            let stmt = ast.push(NodeKind::Expr { value: name }, Some(RawPos::new(1, 0)));
            let ast = module(ast, stmt);

            let mut parser = PythonParser::new().unwrap();
            let err = annotate(ast, &FileText::new("x\n"), &mut parser).unwrap_err();
            assert!(err.to_string().contains("got a non-string col_offset=-1"));
        }
    }

    mod node_ref {
        use super::*;

        #[test]
        fn children_in_source_order_and_identity() {
            let tree = Rc::new(annotated(&FileText::new("{1: 'a'}\n")).unwrap());
            let stmt = NodeRef::new(Rc::clone(&tree), tree.ast().module_body()[0]);
            let dict = &stmt.children()[0];
            let kids = dict.children();
            assert_eq!(kids[0].kind_name(), "Num");
            assert_eq!(kids[1].str_value(), Some("a"));
            assert_eq!(format!("{:?}", kids[1]), "Str(s='a') at (1,5)");

            let other = Rc::new(annotated(&FileText::new("{1: 'a'}\n")).unwrap());
            let same_id = NodeRef::new(other, stmt.id());
            assert_ne!(stmt, same_id);
            assert_eq!(stmt, stmt.clone());
        }
    }
}
