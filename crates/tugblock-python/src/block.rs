//! Block and statement value types.
//!
//! A [`PythonBlock`] is a span of source text plus the feature flags it is
//! parsed under. Its syntax tree, flags and statement partition are computed
//! on first use and memoized; a failed parse is memoized too and handed back
//! unchanged on every later access.
//!
//! A [`PythonStatement`] wraps a block holding at most one top-level
//! statement. Statements carved out of a larger block share that block's
//! parsed tree instead of re-parsing.

use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;
use tugblock_core::{BlockError, BlockResult, CompilerFlags, FilePos, FileText};

use crate::annotate::{annotate, NodeRef};
use crate::literal::{repr_str, LiteralValue};
use crate::nodes::NodeKind;
use crate::order::walk_in_order;
use crate::parser::PythonParser;
use crate::split::{split_code_lines, NodeSpan};

// ============================================================================
// Inputs
// ============================================================================

/// Anything a block or statement can be built from.
#[derive(Debug, Clone)]
pub enum CodeInput {
    Text(FileText),
    Block(PythonBlock),
    Statement(PythonStatement),
}

impl From<&str> for CodeInput {
    fn from(text: &str) -> Self {
        CodeInput::Text(FileText::new(text))
    }
}

impl From<String> for CodeInput {
    fn from(text: String) -> Self {
        CodeInput::Text(FileText::new(text))
    }
}

impl From<FileText> for CodeInput {
    fn from(text: FileText) -> Self {
        CodeInput::Text(text)
    }
}

impl From<PythonBlock> for CodeInput {
    fn from(block: PythonBlock) -> Self {
        CodeInput::Block(block)
    }
}

impl From<PythonStatement> for CodeInput {
    fn from(statement: PythonStatement) -> Self {
        CodeInput::Statement(statement)
    }
}

/// Overrides applied when building a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOptions {
    pub filename: Option<PathBuf>,
    pub startpos: Option<FilePos>,
    /// Added to (never replacing) the flags an existing block already has.
    pub flags: Option<CompilerFlags>,
}

impl BlockOptions {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.startpos.is_none() && self.flags.is_none()
    }
}

// ============================================================================
// Module
// ============================================================================

/// Top-level statements of a parsed block.
///
/// A concatenated block's statements may come from different trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    body: Vec<NodeRef>,
}

impl Module {
    pub fn body(&self) -> &[NodeRef] {
        &self.body
    }
}

fn parse_and_annotate(text: &FileText, flags: CompilerFlags) -> BlockResult<Module> {
    let mut parser = PythonParser::new()?;
    let ast = parser.parse_module(text, flags)?;
    let tree = Rc::new(annotate(ast, text, &mut parser)?);
    let body = tree
        .ast()
        .module_body()
        .iter()
        .map(|id| NodeRef::new(Rc::clone(&tree), *id))
        .collect();
    Ok(Module { body })
}

// ============================================================================
// PythonBlock
// ============================================================================

/// A sequence of consecutive top-level statements and the text around them.
pub struct PythonBlock {
    text: FileText,
    input_flags: CompilerFlags,
    ast: OnceCell<BlockResult<Module>>,
    source_flags: OnceCell<CompilerFlags>,
    flags: OnceCell<CompilerFlags>,
    statements: OnceCell<BlockResult<Vec<PythonStatement>>>,
    /// Already known to be exactly one statement (itself).
    single: bool,
}

impl Clone for PythonBlock {
    fn clone(&self) -> Self {
        PythonBlock {
            text: self.text.clone(),
            input_flags: self.input_flags,
            ast: self.ast.clone(),
            source_flags: self.source_flags.clone(),
            flags: self.flags.clone(),
            statements: OnceCell::new(),
            single: self.single,
        }
    }
}

impl PythonBlock {
    /// A block over `text` with no input flags.
    pub fn new(text: impl Into<FileText>) -> Self {
        Self::from_text(text, CompilerFlags::NONE)
    }

    pub fn from_text(text: impl Into<FileText>, flags: CompilerFlags) -> Self {
        PythonBlock {
            text: text.into(),
            input_flags: flags,
            ast: OnceCell::new(),
            source_flags: OnceCell::new(),
            flags: OnceCell::new(),
            statements: OnceCell::new(),
            single: false,
        }
    }

    /// Build a block from text, a block, or a statement.
    ///
    /// An existing block (or a statement's block) with empty `options` is
    /// returned as-is. Otherwise the text is re-anchored/renamed per
    /// `options` and the flags are the union of the option flags and the
    /// existing block's effective flags.
    pub fn from_input(input: impl Into<CodeInput>, options: BlockOptions) -> BlockResult<Self> {
        let (text, flags) = match input.into() {
            CodeInput::Statement(statement) if options.is_empty() => return Ok(statement.block),
            CodeInput::Block(block) if options.is_empty() => return Ok(block),
            CodeInput::Statement(PythonStatement { block }) | CodeInput::Block(block) => {
                let flags = options.flags.unwrap_or_default() | block.flags()?;
                (block.text, flags)
            }
            CodeInput::Text(text) => (text, options.flags.unwrap_or_default()),
        };
        let mut text = text;
        if let Some(filename) = options.filename {
            text = text.with_filename(filename);
        }
        if let Some(startpos) = options.startpos {
            text = text.with_startpos(startpos);
        }
        Ok(Self::from_text(text, flags))
    }

    /// A sub-block whose tree is already known.
    fn carved(text: FileText, module: Module, flags: CompilerFlags, single: bool) -> Self {
        PythonBlock {
            text,
            input_flags: flags,
            ast: OnceCell::from(Ok(module)),
            source_flags: OnceCell::new(),
            flags: OnceCell::from(flags),
            statements: OnceCell::new(),
            single,
        }
    }

    /// Join textually contiguous blocks into one.
    ///
    /// Contiguity is the caller's responsibility. The result takes the first
    /// block's flags.
    pub fn concatenate(blocks: &[PythonBlock]) -> BlockResult<Self> {
        match blocks {
            [] => Err(BlockError::usage("cannot concatenate an empty list of blocks")),
            [only] => Ok(only.clone()),
            [first, ..] => {
                let text = FileText::concatenate(blocks.iter().map(|b| &b.text))
                    .ok_or_else(|| BlockError::internal("concatenated no text"))?;
                let mut body = Vec::new();
                for block in blocks {
                    body.extend(block.ast()?.body.iter().cloned());
                }
                Ok(Self::carved(text, Module { body }, first.flags()?, false))
            }
        }
    }

    pub fn text(&self) -> &FileText {
        &self.text
    }

    pub fn filename(&self) -> Option<&Path> {
        self.text.filename()
    }

    pub fn startpos(&self) -> FilePos {
        self.text.startpos()
    }

    pub fn endpos(&self) -> FilePos {
        self.text.endpos()
    }

    pub fn input_flags(&self) -> CompilerFlags {
        self.input_flags
    }

    /// The parsed, position-annotated top-level statements.
    pub fn ast(&self) -> BlockResult<&Module> {
        self.ast
            .get_or_init(|| {
                let result = parse_and_annotate(&self.text, self.input_flags);
                match &result {
                    Ok(module) => debug!(
                        statements = module.body.len(),
                        startpos = %self.text.startpos(),
                        "parsed block"
                    ),
                    Err(err) => debug!(error = %err, "block failed to parse"),
                }
                result.map_err(|err| match self.text.filename() {
                    Some(filename) => err.in_file(filename.display().to_string()),
                    None => err,
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Flags declared by this block's own `from __future__` imports.
    pub fn source_flags(&self) -> BlockResult<CompilerFlags> {
        if let Some(flags) = self.source_flags.get() {
            return Ok(*flags);
        }
        let mut flags = CompilerFlags::NONE;
        for node in self.ast()?.body() {
            if let NodeKind::ImportFrom {
                module: Some(module),
                names,
                ..
            } = node.kind()
            {
                if module != "__future__" {
                    continue;
                }
                for alias in names {
                    if let NodeKind::Alias { name, .. } = node.tree().ast().kind(*alias) {
                        if let Some(flag) = CompilerFlags::from_future_name(name) {
                            flags |= flag;
                        }
                    }
                }
            }
        }
        Ok(*self.source_flags.get_or_init(|| flags))
    }

    /// Effective flags: input flags plus source flags.
    pub fn flags(&self) -> BlockResult<CompilerFlags> {
        if let Some(flags) = self.flags.get() {
            return Ok(*flags);
        }
        let flags = self.input_flags | self.source_flags()?;
        Ok(*self.flags.get_or_init(|| flags))
    }

    /// Partition into statements and comment/blank runs, in order.
    pub fn statements(&self) -> BlockResult<&[PythonStatement]> {
        self.statements
            .get_or_init(|| self.split_statements())
            .as_deref()
            .map_err(Clone::clone)
    }

    fn split_statements(&self) -> BlockResult<Vec<PythonStatement>> {
        if self.single {
            return Ok(vec![PythonStatement {
                block: self.clone(),
            }]);
        }
        let module = self.ast()?;
        let spans = module
            .body
            .iter()
            .map(|node| {
                let start = node.startpos().ok_or_else(|| {
                    BlockError::internal(format!("statement has no position: {}", node.dump()))
                })?;
                Ok(NodeSpan {
                    start,
                    end: node.endpos(),
                })
            })
            .collect::<BlockResult<Vec<_>>>()?;
        let chunks = split_code_lines(&spans, &self.text)?;
        if chunks.len() == 1 {
            let mut block = self.clone();
            block.single = true;
            return Ok(vec![PythonStatement { block }]);
        }

        let flags = self.flags()?;
        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let body = chunk
                    .node
                    .map(|index| vec![module.body[index].clone()])
                    .unwrap_or_default();
                PythonStatement {
                    block: Self::carved(chunk.text, Module { body }, flags, true),
                }
            })
            .collect())
    }

    /// Group consecutive statements with equal keys into blocks.
    pub fn group_by<K, F>(&self, mut key: F) -> BlockResult<Vec<(K, PythonBlock)>>
    where
        K: PartialEq,
        F: FnMut(&PythonStatement) -> BlockResult<K>,
    {
        let mut groups: Vec<(K, Vec<PythonBlock>)> = Vec::new();
        for statement in self.statements()? {
            let k = key(statement)?;
            match groups.last_mut() {
                Some((last, blocks)) if *last == k => blocks.push(statement.block.clone()),
                _ => groups.push((k, vec![statement.block.clone()])),
            }
        }
        groups
            .into_iter()
            .map(|(k, blocks)| Ok((k, Self::concatenate(&blocks)?)))
            .collect()
    }

    /// Every plain string literal in the block, in source order.
    pub fn string_literals(&self) -> BlockResult<StringLiterals> {
        Ok(StringLiterals {
            statements: self.ast()?.body.clone().into_iter(),
            pending: Vec::new().into_iter(),
        })
    }
}

impl fmt::Debug for PythonBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PythonBlock({}", repr_str(&self.text.joined()))?;
        if let Some(filename) = self.filename() {
            write!(f, ", filename={}", repr_str(&filename.display().to_string()))?;
        }
        if self.startpos() != FilePos::START {
            write!(f, ", startpos={}", self.startpos())?;
        }
        match (self.flags(), self.source_flags()) {
            (Ok(flags), Ok(source)) if flags != source => write!(f, ", flags={}", flags)?,
            (Err(_), _) | (_, Err(_)) if !self.input_flags.is_empty() => {
                write!(f, ", flags={}", self.input_flags)?
            }
            _ => {}
        }
        write!(f, ")")
    }
}

impl PartialEq for PythonBlock {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.text == other.text && self.flags().ok() == other.flags().ok())
    }
}

impl Eq for PythonBlock {}

impl PartialOrd for PythonBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// By text, then by effective flags.
impl Ord for PythonBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        if std::ptr::eq(self, other) {
            return Ordering::Equal;
        }
        self.text
            .cmp(&other.text)
            .then_with(|| self.flags().ok().cmp(&other.flags().ok()))
    }
}

impl Hash for PythonBlock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.flags().ok().hash(state);
    }
}

/// Forward-only walk yielding string literal nodes.
///
/// Statements of a concatenated block may belong to different trees, so
/// the walk proceeds one top-level statement at a time.
pub struct StringLiterals {
    statements: std::vec::IntoIter<NodeRef>,
    pending: std::vec::IntoIter<NodeRef>,
}

impl Iterator for StringLiterals {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        loop {
            if let Some(node) = self.pending.next() {
                return Some(node);
            }
            let statement = self.statements.next()?;
            let tree = statement.tree();
            self.pending = walk_in_order(tree.ast(), statement.id())
                .map(|id| NodeRef::new(Rc::clone(tree), id))
                .filter(|node| node.str_value().is_some())
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}

// ============================================================================
// PythonStatement
// ============================================================================

/// A span holding one top-level statement, or only comments and blanks.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonStatement {
    block: PythonBlock,
}

impl PythonStatement {
    /// Build a statement; fails unless the input holds exactly one chunk.
    pub fn from_input(input: impl Into<CodeInput>, options: BlockOptions) -> BlockResult<Self> {
        let block = match input.into() {
            CodeInput::Statement(statement) if options.is_empty() => return Ok(statement),
            other => PythonBlock::from_input(other, options)?,
        };
        match block.statements()? {
            [statement] => Ok(statement.clone()),
            statements => Err(BlockError::usage(format!(
                "Code contains {} statements instead of exactly 1: {:?}",
                statements.len(),
                block
            ))),
        }
    }

    pub fn block(&self) -> &PythonBlock {
        &self.block
    }

    pub fn text(&self) -> &FileText {
        self.block.text()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.block.filename()
    }

    pub fn startpos(&self) -> FilePos {
        self.block.startpos()
    }

    pub fn flags(&self) -> BlockResult<CompilerFlags> {
        self.block.flags()
    }

    /// The statement's node, or `None` for a comment/blank run.
    pub fn ast_node(&self) -> BlockResult<Option<NodeRef>> {
        match self.block.ast()?.body() {
            [] => Ok(None),
            [node] => Ok(Some(node.clone())),
            _ => Err(BlockError::internal("More than one AST node in block")),
        }
    }

    pub fn is_comment_or_blank(&self) -> BlockResult<bool> {
        Ok(self.ast_node()?.is_none())
    }

    pub fn is_comment_or_blank_or_string_literal(&self) -> BlockResult<bool> {
        Ok(match self.ast_node()? {
            None => true,
            Some(node) => string_literal_value(&node).is_some(),
        })
    }

    /// Whether the statement is a bare string literal.
    pub fn is_string_literal(&self) -> BlockResult<bool> {
        Ok(self
            .ast_node()?
            .is_some_and(|node| string_literal_value(&node).is_some()))
    }

    pub fn is_import(&self) -> BlockResult<bool> {
        Ok(self.ast_node()?.is_some_and(|node| {
            matches!(node.kind(), NodeKind::Import { .. } | NodeKind::ImportFrom { .. })
        }))
    }

    pub fn is_single_assign(&self) -> BlockResult<bool> {
        Ok(self
            .ast_node()?
            .is_some_and(|node| matches!(node.kind(), NodeKind::Assign { targets, .. } if targets.len() == 1)))
    }

    /// `(name, value)` of a `name = <literal>` statement.
    pub fn get_assignment_literal_value(&self) -> BlockResult<(String, LiteralValue)> {
        let not_assignment = || {
            BlockError::usage(format!(
                "Statement is not an assignment to a single name: {:?}",
                self
            ))
        };
        let node = self.ast_node()?.ok_or_else(not_assignment)?;
        let NodeKind::Assign { targets, value } = node.kind() else {
            return Err(not_assignment());
        };
        let [target] = targets[..] else {
            return Err(not_assignment());
        };
        let ast = node.tree().ast();
        let NodeKind::Name { id } = ast.kind(target) else {
            return Err(not_assignment());
        };
        let literal = NodeRef::new(Rc::clone(node.tree()), *value).literal_value()?;
        Ok((id.clone(), literal))
    }
}

fn string_literal_value(node: &NodeRef) -> Option<String> {
    match node.kind() {
        NodeKind::Str { s, .. } => Some(s.clone()),
        NodeKind::Expr { value } => match node.tree().ast().kind(*value) {
            NodeKind::Str { s, .. } => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

impl fmt::Debug for PythonStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = format!("{:?}", self.block);
        let rest = repr.strip_prefix("PythonBlock(").unwrap_or(&repr);
        write!(f, "PythonStatement({}", rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_texts(block: &PythonBlock) -> Vec<String> {
        block
            .statements()
            .unwrap()
            .iter()
            .map(|s| s.text().joined())
            .collect()
    }

    mod splitting {
        use super::*;

        #[test]
        fn single_statement_is_its_own_statement() {
            let block = PythonBlock::new("x = 1");
            let statements = block.statements().unwrap();
            assert_eq!(statements.len(), 1);
            assert_eq!(statements[0].block(), &block);
        }

        #[test]
        fn comment_only_block() {
            let block = PythonBlock::new("# just a comment\n\n");
            let statements = block.statements().unwrap();
            assert_eq!(statements.len(), 1);
            assert!(statements[0].is_comment_or_blank().unwrap());
        }

        #[test]
        fn carved_statements_reuse_the_tree() {
            let block = PythonBlock::new("a = 1\nb = 2\n");
            let statements = block.statements().unwrap();
            assert_eq!(statements.len(), 2);
            let node = statements[1].ast_node().unwrap().unwrap();
            let parent = block.ast().unwrap().body()[1].clone();
            assert_eq!(node, parent);
            // a carved block is its own single statement
            let again = statements[1].block().statements().unwrap();
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].text(), statements[1].text());
        }

        #[test]
        fn round_trip_reproduces_text() {
            let source = "import os\n\n# comment\ndef f(a, b=2):\n    return a  # done\n\nx = f(1)\n";
            let block = PythonBlock::new(source);
            assert_eq!(statement_texts(&block).concat(), source);
        }
    }

    mod flags {
        use super::*;

        #[test]
        fn blocks_order_by_text_then_flags() {
            let plain = PythonBlock::new("x = 1\n");
            let division = PythonBlock::from_text("x = 1\n", CompilerFlags::DIVISION);
            let later = PythonBlock::new("y = 1\n");
            let mut blocks = vec![later.clone(), division.clone(), plain.clone()];
            blocks.sort();
            assert_eq!(blocks, vec![plain.clone(), division, later]);
            assert_eq!(plain.cmp(&plain.clone()), Ordering::Equal);

            let a = PythonStatement::from_input("a = 1\n", BlockOptions::default()).unwrap();
            let b = PythonStatement::from_input("b = 1\n", BlockOptions::default()).unwrap();
            assert!(a < b);
        }

        #[test]
        fn source_flags_from_future_imports() {
            let block = PythonBlock::new("from __future__ import division, print_function\nprint(1)\n");
            assert_eq!(
                block.source_flags().unwrap(),
                CompilerFlags::DIVISION | CompilerFlags::PRINT_FUNCTION
            );
            assert_eq!(block.flags().unwrap(), block.source_flags().unwrap());
        }

        #[test]
        fn input_flags_merge_with_source_flags() {
            let block = PythonBlock::from_text(
                "from __future__ import division\n",
                CompilerFlags::PRINT_FUNCTION,
            );
            assert_eq!(
                block.flags().unwrap(),
                CompilerFlags::DIVISION | CompilerFlags::PRINT_FUNCTION
            );
            assert_eq!(
                format!("{:?}", block),
                "PythonBlock('from __future__ import division\\n', flags=0x12000)"
            );
        }

        #[test]
        fn carved_statements_inherit_flags() {
            let block = PythonBlock::new("from __future__ import print_function\nprint(1)\n");
            let statements = block.statements().unwrap();
            assert_eq!(statements[1].flags().unwrap(), CompilerFlags::PRINT_FUNCTION);
            assert_eq!(
                format!("{:?}", statements[1]),
                "PythonStatement('print(1)\\n', startpos=(2,1), flags=0x10000)"
            );
        }

        #[test]
        fn block_options_add_flags() {
            let base = PythonBlock::new("x = 1\n");
            let block = PythonBlock::from_input(
                base,
                BlockOptions {
                    flags: Some(CompilerFlags::DIVISION),
                    ..Default::default()
                },
            )
            .unwrap();
            assert_eq!(block.input_flags(), CompilerFlags::DIVISION);
        }
    }

    mod statements {
        use super::*;

        fn statement(source: &str) -> PythonStatement {
            PythonStatement::from_input(source, BlockOptions::default()).unwrap()
        }

        #[test]
        fn predicates() {
            assert!(statement("import os\n").is_import().unwrap());
            assert!(statement("from a import b\n").is_import().unwrap());
            assert!(statement("x = 1\n").is_single_assign().unwrap());
            assert!(!statement("x = y = 1\n").is_single_assign().unwrap());
            assert!(statement("'doc'\n").is_string_literal().unwrap());
            assert!(statement("'doc'\n")
                .is_comment_or_blank_or_string_literal()
                .unwrap());
            assert!(!statement("f()\n").is_comment_or_blank_or_string_literal().unwrap());
        }

        #[test]
        fn multiple_statements_rejected() {
            let err = PythonStatement::from_input("a = 1\nb = 2\n", BlockOptions::default())
                .unwrap_err();
            assert!(err.is_usage());
            assert!(err.to_string().contains("Code contains 2 statements instead of exactly 1"));
        }

        #[test]
        fn assignment_literal_value() {
            let (name, value) = statement("foo = {1: {2: 3}}")
                .get_assignment_literal_value()
                .unwrap();
            assert_eq!(name, "foo");
            assert_eq!(value.to_string(), "{1: {2: 3}}");
        }

        #[test]
        fn assignment_of_non_literal_fails() {
            let err = statement("foo = bar\n").get_assignment_literal_value().unwrap_err();
            assert_eq!(err, BlockError::literal("malformed node or string: Name"));
            let err = statement("foo.x = 1\n").get_assignment_literal_value().unwrap_err();
            assert!(err.is_usage());
            let err = statement("foo = `bar`\n").get_assignment_literal_value().unwrap_err();
            assert_eq!(err, BlockError::literal("malformed node or string: repr"));
        }

        #[test]
        fn repr_strips_block_prefix() {
            let s = statement("x = 1\n");
            assert_eq!(format!("{:?}", s), "PythonStatement('x = 1\\n')");
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn cached_failure_is_identical() {
            let block = PythonBlock::new(FileText::new("x = (\n").with_filename("bad.py"));
            let first = block.ast().unwrap_err();
            let second = block.ast().unwrap_err();
            assert_eq!(first, second);
            assert!(first.to_string().starts_with("While parsing bad.py: "));
            assert_eq!(block.statements().unwrap_err(), first);
        }
    }

    mod grouping {
        use super::*;

        #[test]
        fn group_imports_and_code() {
            let block = PythonBlock::new("import a\nimport b\nx = 1\nimport c\n");
            let groups = block.group_by(|s| s.is_import()).unwrap();
            let summary: Vec<(bool, String)> = groups
                .iter()
                .map(|(k, b)| (*k, b.text().joined()))
                .collect();
            assert_eq!(
                summary,
                vec![
                    (true, "import a\nimport b\n".to_string()),
                    (false, "x = 1\n".to_string()),
                    (true, "import c\n".to_string()),
                ]
            );
            assert_eq!(groups[0].1.statements().unwrap().len(), 2);
        }

        #[test]
        fn string_literals_span_concatenated_trees() {
            let first = PythonBlock::new("x = 'a'\n");
            let second = PythonBlock::new(
                FileText::new("y = ('b', f('c'))\n").with_startpos(FilePos::new(2, 1)),
            );
            let both = PythonBlock::concatenate(&[first, second]).unwrap();
            let found: Vec<(String, Option<FilePos>)> = both
                .string_literals()
                .unwrap()
                .map(|node| (node.str_value().unwrap().to_string(), node.startpos()))
                .collect();
            assert_eq!(
                found,
                vec![
                    ("a".to_string(), Some(FilePos::new(1, 5))),
                    ("b".to_string(), Some(FilePos::new(2, 6))),
                    ("c".to_string(), Some(FilePos::new(2, 13))),
                ]
            );
        }

        #[test]
        fn concatenate_requires_blocks() {
            assert!(PythonBlock::concatenate(&[]).unwrap_err().is_usage());
        }
    }
}
