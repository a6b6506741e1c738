//! Python parser adapter built on tree-sitter.
//!
//! [`PythonParser`] parses text with `tree-sitter-python` and lowers the
//! concrete tree into the arena [`Ast`]. Positions are reported under the
//! legacy contract the annotator consumes:
//!
//! - a positioned node reports the line and char column of its first token;
//! - when that first token is a multi-line plain (non-f) string literal, the
//!   node instead reports [`RawPos::COL_UNKNOWN`] and the *ending* line of
//!   that string token.
//!
//! Text is dedented by its common leading whitespace before parsing; the
//! removed width is added back to every reported column.

use tracing::debug;
use tree_sitter::{Node as TsNode, Parser};
use tugblock_core::text::byte_to_char_column;
use tugblock_core::{BlockError, BlockResult, CompilerFlags, FilePos, FileText};

use crate::literal::decode_string_literal;
use crate::nodes::{Ast, NodeId, NodeKind, RawPos};

/// `__future__` features that are accepted but carry no flag bit.
const FLAGLESS_FEATURES: &[&str] = &["barry_as_FLUFL", "generator_stop", "annotations"];

const STATEMENT_KINDS: &[&str] = &[
    "expression_statement",
    "return_statement",
    "delete_statement",
    "raise_statement",
    "pass_statement",
    "break_statement",
    "continue_statement",
    "global_statement",
    "nonlocal_statement",
    "assert_statement",
    "print_statement",
    "exec_statement",
    "import_statement",
    "import_from_statement",
    "future_import_statement",
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "function_definition",
    "class_definition",
    "decorated_definition",
    "match_statement",
    "type_alias_statement",
];

// ============================================================================
// Parser
// ============================================================================

/// A reusable Python parser.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> BlockResult<Self> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| BlockError::internal(format!("failed to load Python grammar: {}", e)))?;
        Ok(PythonParser { parser })
    }

    /// Parse `text` as a module.
    ///
    /// Rejects text the grammar cannot parse, `print` statements while
    /// `print_function` is in effect, and unknown `__future__` features.
    pub fn parse_module(&mut self, text: &FileText, flags: CompilerFlags) -> BlockResult<Ast> {
        let dedented = Dedented::new(text.lines());
        debug!(
            lines = text.num_lines(),
            flags = %flags,
            dedent = dedented.prefix.len(),
            "parsing python text"
        );
        let tree = self
            .parser
            .parse(&dedented.source, None)
            .ok_or_else(|| BlockError::internal("parser returned no tree"))?;

        let mut lowering = Lowering {
            source: &dedented.source,
            lines: dedented.source.split('\n').collect(),
            indent_width: dedented.prefix.chars().count() as u32,
            startpos: text.startpos(),
            flags,
            ast: Ast::new(),
        };

        let root = tree.root_node();
        if root.has_error() {
            let bad = first_error(root).unwrap_or(root);
            let message = if bad.is_missing() {
                format!("invalid syntax: missing {}", bad.kind())
            } else {
                "invalid syntax".to_string()
            };
            let err = lowering.syntax_error(bad, &message);
            debug!(error = %err, "parser rejected text");
            return Err(err);
        }

        let body = lowering.lower_statements(root)?;
        let module = lowering.ast.push(NodeKind::Module { body }, None);
        Ok(lowering.ast.finish(module, dedented.prefix))
    }

    /// Parse `fragment` as a standalone expression and return its value if
    /// it is exactly one plain string literal (adjacent pieces allowed).
    ///
    /// Pieces separated by a bare newline are two statements, not one
    /// literal.
    pub fn parse_string_literal(&mut self, fragment: &str) -> Option<String> {
        let tree = self.parser.parse(fragment, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }
        let [statement] = named(root)[..] else {
            return None;
        };
        if statement.kind() != "expression_statement" {
            return None;
        }
        let [expr] = named(statement)[..] else {
            return None;
        };
        let pieces = match expr.kind() {
            "string" => vec![expr],
            "concatenated_string" => named(expr),
            _ => return None,
        };
        let mut value = String::new();
        for piece in pieces {
            let decoded = decode_string_literal(&fragment[piece.byte_range()]).ok()?;
            if decoded.is_fstring {
                return None;
            }
            value.push_str(&decoded.value);
        }
        Some(value)
    }
}

// ============================================================================
// Dedent
// ============================================================================

struct Dedented {
    source: String,
    prefix: String,
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '\t')
}

impl Dedented {
    fn new(lines: &[String]) -> Self {
        let mut common: Option<&str> = None;
        for line in lines.iter().filter(|l| !is_blank(l)) {
            let width = line.len() - line.trim_start_matches([' ', '\t']).len();
            let indent = &line[..width];
            common = Some(match common {
                None => indent,
                Some(prev) => {
                    let shared = prev
                        .bytes()
                        .zip(indent.bytes())
                        .take_while(|(a, b)| a == b)
                        .count();
                    &prev[..shared]
                }
            });
        }
        let prefix = common.unwrap_or("").to_string();
        if prefix.is_empty() {
            return Dedented {
                source: lines.join("\n"),
                prefix,
            };
        }
        let source = lines
            .iter()
            .map(|line| match line.strip_prefix(prefix.as_str()) {
                Some(rest) => rest,
                None => "",
            })
            .collect::<Vec<_>>()
            .join("\n");
        Dedented { source, prefix }
    }
}

// ============================================================================
// Tree helpers
// ============================================================================

fn children<'t>(node: TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).filter(|c| !c.is_extra()).collect()
}

fn named<'t>(node: TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn first_error(node: TsNode<'_>) -> Option<TsNode<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error);
    found
}

fn starts_with_async(node: TsNode<'_>) -> bool {
    children(node).first().is_some_and(|c| c.kind() == "async")
}

fn is_statement_kind(kind: &str) -> bool {
    STATEMENT_KINDS.contains(&kind)
}

// ============================================================================
// Lowering
// ============================================================================

struct Lowering<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
    indent_width: u32,
    startpos: FilePos,
    flags: CompilerFlags,
    ast: Ast,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: TsNode<'_>) -> &'s str {
        let source = self.source;
        &source[node.byte_range()]
    }

    fn char_column(&self, row: usize, byte_column: usize) -> u32 {
        let line = self.lines.get(row).copied().unwrap_or("");
        byte_to_char_column(line, byte_column) + self.indent_width
    }

    fn syntax_error(&self, node: TsNode<'_>, message: &str) -> BlockError {
        let point = node.start_position();
        let pos = self.startpos + (point.row as u32, self.char_column(point.row, point.column));
        BlockError::syntax(message, pos.lineno, pos.colno)
    }

    fn required<'t>(&self, node: TsNode<'t>, field: &str) -> BlockResult<TsNode<'t>> {
        node.child_by_field_name(field).ok_or_else(|| {
            BlockError::internal(format!("{} node has no '{}' field", node.kind(), field))
        })
    }

    /// The string token that starts `node`, if it belongs to a plain string.
    fn leading_plain_string<'t>(&self, node: TsNode<'t>) -> Option<TsNode<'t>> {
        let mut current = node;
        loop {
            match current.kind() {
                "string" => {
                    let decoded = decode_string_literal(self.text(current)).ok()?;
                    return (!decoded.is_fstring).then_some(current);
                }
                "concatenated_string" => {
                    let pieces = named(current);
                    let any_fstring = pieces.iter().any(|p| {
                        decode_string_literal(self.text(*p)).map_or(true, |d| d.is_fstring)
                    });
                    return if any_fstring {
                        None
                    } else {
                        pieces.first().copied()
                    };
                }
                _ => current = children(current).first().copied()?,
            }
        }
    }

    /// Reported position of `node` under the legacy contract.
    fn pos(&self, node: TsNode<'_>) -> RawPos {
        if let Some(string) = self.leading_plain_string(node) {
            let (start, end) = (string.start_position(), string.end_position());
            if start.row != end.row {
                return RawPos::unknown_column(end.row as u32 + 1);
            }
        }
        let point = node.start_position();
        RawPos::new(point.row as u32 + 1, self.char_column(point.row, point.column))
    }

    fn push(&mut self, kind: NodeKind, pos: Option<RawPos>) -> NodeId {
        self.ast.push(kind, pos)
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn lower_statements(&mut self, parent: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        let mut body = Vec::new();
        for child in named(parent) {
            if child.kind() == "block" {
                body.extend(self.lower_statements(child)?);
            } else {
                body.push(self.lower_statement(child)?);
            }
        }
        Ok(body)
    }

    fn lower_suite(&mut self, node: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        if node.kind() == "block" {
            self.lower_statements(node)
        } else {
            Ok(vec![self.lower_statement(node)?])
        }
    }

    /// Body of a clause: its `body` field, or its `block` child.
    fn clause_body(&mut self, node: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        let body = node
            .child_by_field_name("body")
            .or_else(|| named(node).into_iter().find(|c| c.kind() == "block"));
        match body {
            Some(body) => self.lower_suite(body),
            None => Ok(Vec::new()),
        }
    }

    fn lower_statement(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let kind = match node.kind() {
            "expression_statement" => return self.lower_expression_statement(node),
            "return_statement" => NodeKind::Return {
                value: self.lower_optional(named(node).first().copied())?,
            },
            "delete_statement" => {
                let targets = match named(node).first() {
                    Some(list) if list.kind() == "expression_list" => {
                        self.lower_all(named(*list))?
                    }
                    Some(single) => vec![self.lower_expr(*single)?],
                    None => Vec::new(),
                };
                NodeKind::Delete { targets }
            }
            "raise_statement" => {
                let cause = node.child_by_field_name("cause");
                let exc = named(node).into_iter().find(|c| Some(*c) != cause);
                NodeKind::Raise {
                    exc: self.lower_optional(exc)?,
                    cause: self.lower_optional(cause)?,
                }
            }
            "pass_statement" => NodeKind::Pass,
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "global_statement" => NodeKind::Global {
                names: named(node).iter().map(|n| self.text(*n).to_string()).collect(),
            },
            "nonlocal_statement" => NodeKind::Nonlocal {
                names: named(node).iter().map(|n| self.text(*n).to_string()).collect(),
            },
            "assert_statement" => {
                let parts = named(node);
                let test = match parts.first() {
                    Some(test) => self.lower_expr(*test)?,
                    None => return Err(self.syntax_error(node, "invalid syntax")),
                };
                NodeKind::Assert {
                    test,
                    msg: self.lower_optional(parts.get(1).copied())?,
                }
            }
            "print_statement" => return self.lower_print(node),
            "exec_statement" => {
                let parts = named(node);
                let Some(code) = parts.first() else {
                    return Err(self.syntax_error(node, "invalid syntax"));
                };
                NodeKind::Exec {
                    body: self.lower_expr(*code)?,
                    globals: self.lower_optional(parts.get(1).copied())?,
                    locals: self.lower_optional(parts.get(2).copied())?,
                }
            }
            "import_statement" => NodeKind::Import {
                names: named(node)
                    .into_iter()
                    .map(|n| self.lower_alias(n))
                    .collect::<BlockResult<_>>()?,
            },
            "import_from_statement" => return self.lower_import_from(node),
            "future_import_statement" => return self.lower_future_import(node),
            "if_statement" => {
                let test = self.lower_expr(self.required(node, "condition")?)?;
                let body = self.lower_suite(self.required(node, "consequence")?)?;
                let alternatives: Vec<_> = named(node)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "elif_clause" | "else_clause"))
                    .collect();
                let orelse = self.lower_else_chain(&alternatives)?;
                NodeKind::If { test, body, orelse }
            }
            "for_statement" => {
                let target = self.lower_expr(self.required(node, "left")?)?;
                let iter = self.lower_expr(self.required(node, "right")?)?;
                let body = self.lower_suite(self.required(node, "body")?)?;
                let orelse = match node.child_by_field_name("alternative") {
                    Some(alt) => self.clause_body(alt)?,
                    None => Vec::new(),
                };
                NodeKind::For {
                    target,
                    iter,
                    body,
                    orelse,
                    is_async: starts_with_async(node),
                }
            }
            "while_statement" => {
                let test = self.lower_expr(self.required(node, "condition")?)?;
                let body = self.lower_suite(self.required(node, "body")?)?;
                let orelse = match node.child_by_field_name("alternative") {
                    Some(alt) => self.clause_body(alt)?,
                    None => Vec::new(),
                };
                NodeKind::While { test, body, orelse }
            }
            "try_statement" => {
                let body = self.lower_suite(self.required(node, "body")?)?;
                let mut handlers = Vec::new();
                let mut orelse = Vec::new();
                let mut finalbody = Vec::new();
                for clause in named(node) {
                    match clause.kind() {
                        "except_clause" | "except_group_clause" => {
                            handlers.push(self.lower_except(clause)?)
                        }
                        "else_clause" => orelse = self.clause_body(clause)?,
                        "finally_clause" => finalbody = self.clause_body(clause)?,
                        _ => {}
                    }
                }
                NodeKind::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                }
            }
            "with_statement" => {
                let mut items = Vec::new();
                for clause in named(node).into_iter().filter(|c| c.kind() == "with_clause") {
                    for item in named(clause) {
                        items.push(self.lower_with_item(item)?);
                    }
                }
                NodeKind::With {
                    items,
                    body: self.lower_suite(self.required(node, "body")?)?,
                    is_async: starts_with_async(node),
                }
            }
            "function_definition" => {
                let pos = self.pos(node);
                return self.lower_function(node, Vec::new(), pos);
            }
            "class_definition" => {
                let pos = self.pos(node);
                return self.lower_class(node, Vec::new(), pos);
            }
            "decorated_definition" => return self.lower_decorated(node),
            _ => return self.lower_other(node),
        };
        Ok(self.push(kind, pos))
    }

    fn lower_expression_statement(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let parts = named(node);
        let kind = match parts.as_slice() {
            [single] if single.kind() == "assignment" => {
                return self.lower_assignment(*single, pos);
            }
            [single] if single.kind() == "augmented_assignment" => {
                let target = self.lower_expr(self.required(*single, "left")?)?;
                let op = self.text(self.required(*single, "operator")?).to_string();
                let value = self.lower_rhs(self.required(*single, "right")?)?;
                NodeKind::AugAssign { target, op, value }
            }
            [single] => NodeKind::Expr {
                value: self.lower_expr(*single)?,
            },
            [] => return Err(self.syntax_error(node, "invalid syntax")),
            many => {
                let tuple_pos = Some(self.pos(many[0]));
                let elts = self.lower_all(many.to_vec())?;
                let value = self.push(NodeKind::Tuple { elts }, tuple_pos);
                NodeKind::Expr { value }
            }
        };
        Ok(self.push(kind, pos))
    }

    fn lower_assignment(&mut self, node: TsNode<'_>, pos: Option<RawPos>) -> BlockResult<NodeId> {
        let left = self.required(node, "left")?;
        if let Some(annotation) = node.child_by_field_name("type") {
            let target = self.lower_expr(left)?;
            let annotation = self.lower_expr(annotation)?;
            let value = match node.child_by_field_name("right") {
                Some(right) => Some(self.lower_rhs(right)?),
                None => None,
            };
            return Ok(self.push(
                NodeKind::AnnAssign {
                    target,
                    annotation,
                    value,
                },
                pos,
            ));
        }

        let mut targets = vec![self.lower_expr(left)?];
        let mut right = self.required(node, "right")?;
        while right.kind() == "assignment" && right.child_by_field_name("type").is_none() {
            targets.push(self.lower_expr(self.required(right, "left")?)?);
            right = self.required(right, "right")?;
        }
        let value = self.lower_rhs(right)?;
        Ok(self.push(NodeKind::Assign { targets, value }, pos))
    }

    fn lower_rhs(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        match node.kind() {
            "assignment" | "augmented_assignment" => self.lower_other(node),
            _ => self.lower_expr(node),
        }
    }

    fn lower_print(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        if self.flags.contains(CompilerFlags::PRINT_FUNCTION) {
            return Err(self.syntax_error(node, "invalid syntax"));
        }
        let pos = Some(self.pos(node));
        let mut dest = None;
        let mut values = Vec::new();
        for child in named(node) {
            if child.kind() == "chevron" {
                dest = self.lower_optional(named(child).first().copied())?;
            } else {
                values.push(self.lower_expr(child)?);
            }
        }
        let nl = children(node).last().is_none_or(|c| c.kind() != ",");
        Ok(self.push(NodeKind::Print { dest, values, nl }, pos))
    }

    fn lower_alias(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let squash = |s: &str| s.split_whitespace().collect::<String>();
        let kind = match node.kind() {
            "aliased_import" => NodeKind::Alias {
                name: squash(self.text(self.required(node, "name")?)),
                asname: Some(self.text(self.required(node, "alias")?).to_string()),
            },
            "wildcard_import" => NodeKind::Alias {
                name: "*".to_string(),
                asname: None,
            },
            _ => NodeKind::Alias {
                name: squash(self.text(node)),
                asname: None,
            },
        };
        Ok(self.push(kind, None))
    }

    fn lower_import_from(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let module_node = node.child_by_field_name("module_name");
        let (module, level) = match module_node {
            Some(m) if m.kind() == "relative_import" => {
                let level = self.text(m).chars().take_while(|c| *c == '.').count() as u32;
                let module = named(m)
                    .into_iter()
                    .find(|c| c.kind() == "dotted_name")
                    .map(|d| self.text(d).to_string());
                (module, level)
            }
            Some(m) => (Some(self.text(m).to_string()), 0),
            None => (None, 0),
        };
        let mut names = Vec::new();
        for child in named(node).into_iter().filter(|c| Some(*c) != module_node) {
            names.push(self.lower_alias(child)?);
        }
        Ok(self.push(
            NodeKind::ImportFrom {
                module,
                names,
                level,
            },
            pos,
        ))
    }

    fn lower_future_import(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let mut names = Vec::new();
        for child in named(node) {
            let alias = self.lower_alias(child)?;
            if let NodeKind::Alias { name, .. } = self.ast.kind(alias) {
                match CompilerFlags::from_future_name(name) {
                    Some(flag) => self.flags |= flag,
                    None if FLAGLESS_FEATURES.contains(&name.as_str()) => {}
                    None => {
                        let message = format!("future feature {} is not defined", name);
                        return Err(self.syntax_error(child, &message));
                    }
                }
            }
            names.push(alias);
        }
        Ok(self.push(
            NodeKind::ImportFrom {
                module: Some("__future__".to_string()),
                names,
                level: 0,
            },
            pos,
        ))
    }

    /// `elif` clauses become nested `If` nodes positioned at `elif`.
    fn lower_else_chain(&mut self, alternatives: &[TsNode<'_>]) -> BlockResult<Vec<NodeId>> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Ok(Vec::new());
        };
        if first.kind() == "else_clause" {
            return self.clause_body(*first);
        }
        let pos = Some(self.pos(*first));
        let test = self.lower_expr(self.required(*first, "condition")?)?;
        let body = self.lower_suite(self.required(*first, "consequence")?)?;
        let orelse = self.lower_else_chain(rest)?;
        Ok(vec![self.push(NodeKind::If { test, body, orelse }, pos)])
    }

    fn lower_except(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let parts: Vec<_> = named(node)
            .into_iter()
            .filter(|c| c.kind() != "block")
            .collect();
        let (type_, name) = match parts.as_slice() {
            [] => (None, None),
            [only] if only.kind() == "as_pattern" => {
                let inner = named(*only);
                let type_ = self.lower_optional(inner.first().copied())?;
                let alias = only.child_by_field_name("alias").or(inner.get(1).copied());
                (type_, alias.map(|a| self.text(a).to_string()))
            }
            [type_] => (Some(self.lower_expr(*type_)?), None),
            [type_, alias, ..] => (
                Some(self.lower_expr(*type_)?),
                Some(self.text(*alias).to_string()),
            ),
        };
        let body = self.clause_body(node)?;
        Ok(self.push(NodeKind::ExceptHandler { type_, name, body }, pos))
    }

    fn lower_with_item(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let value = node
            .child_by_field_name("value")
            .or_else(|| named(node).first().copied())
            .ok_or_else(|| BlockError::internal("with_item has no value"))?;
        let (context_expr, optional_vars) = if value.kind() == "as_pattern" {
            let inner = named(value);
            let Some(context) = inner.first() else {
                return Err(self.syntax_error(value, "invalid syntax"));
            };
            let context_expr = self.lower_expr(*context)?;
            let target = value.child_by_field_name("alias").or(inner.get(1).copied());
            (context_expr, self.lower_optional(target)?)
        } else {
            (self.lower_expr(value)?, None)
        };
        Ok(self.push(
            NodeKind::WithItem {
                context_expr,
                optional_vars,
            },
            None,
        ))
    }

    fn lower_decorated(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = self.pos(node);
        let mut decorators = Vec::new();
        for decorator in named(node).into_iter().filter(|c| c.kind() == "decorator") {
            match named(decorator).first() {
                Some(expr) => decorators.push(self.lower_expr(*expr)?),
                None => return Err(self.syntax_error(decorator, "invalid syntax")),
            }
        }
        let definition = self.required(node, "definition")?;
        match definition.kind() {
            "function_definition" => self.lower_function(definition, decorators, pos),
            "class_definition" => self.lower_class(definition, decorators, pos),
            _ => self.lower_other(node),
        }
    }

    fn lower_function(
        &mut self,
        node: TsNode<'_>,
        decorator_list: Vec<NodeId>,
        pos: RawPos,
    ) -> BlockResult<NodeId> {
        let name = self.text(self.required(node, "name")?).to_string();
        let args = self.lower_parameters(node.child_by_field_name("parameters"))?;
        let returns = self.lower_optional(node.child_by_field_name("return_type"))?;
        let body = self.lower_suite(self.required(node, "body")?)?;
        Ok(self.push(
            NodeKind::FunctionDef {
                name,
                args,
                body,
                decorator_list,
                returns,
                is_async: starts_with_async(node),
            },
            Some(pos),
        ))
    }

    fn lower_class(
        &mut self,
        node: TsNode<'_>,
        decorator_list: Vec<NodeId>,
        pos: RawPos,
    ) -> BlockResult<NodeId> {
        let name = self.text(self.required(node, "name")?).to_string();
        let bases = match node.child_by_field_name("superclasses") {
            Some(list) => self.lower_call_arguments(list)?,
            None => Vec::new(),
        };
        let body = self.lower_suite(self.required(node, "body")?)?;
        Ok(self.push(
            NodeKind::ClassDef {
                name,
                bases,
                body,
                decorator_list,
            },
            Some(pos),
        ))
    }

    fn lower_parameters(&mut self, node: Option<TsNode<'_>>) -> BlockResult<NodeId> {
        let mut args = Vec::new();
        let mut defaults = Vec::new();
        let mut kwonlyargs = Vec::new();
        let mut kw_defaults = Vec::new();
        let mut vararg = None;
        let mut kwarg = None;
        let mut keyword_only = false;

        let params = node.map(named).unwrap_or_default();
        for param in params {
            let (name_node, annotation, default) = match param.kind() {
                "list_splat_pattern" => {
                    vararg = Some(self.splat_name(param));
                    keyword_only = true;
                    continue;
                }
                "dictionary_splat_pattern" => {
                    kwarg = Some(self.splat_name(param));
                    continue;
                }
                "keyword_separator" => {
                    keyword_only = true;
                    continue;
                }
                "positional_separator" => continue,
                "typed_parameter" => {
                    let ty = param.child_by_field_name("type");
                    let inner = named(param).into_iter().find(|c| Some(*c) != ty);
                    match inner {
                        Some(splat) if splat.kind() == "list_splat_pattern" => {
                            vararg = Some(self.splat_name(splat));
                            keyword_only = true;
                            continue;
                        }
                        Some(splat) if splat.kind() == "dictionary_splat_pattern" => {
                            kwarg = Some(self.splat_name(splat));
                            continue;
                        }
                        _ => (inner.unwrap_or(param), ty, None),
                    }
                }
                "default_parameter" => (
                    self.required(param, "name")?,
                    None,
                    Some(self.required(param, "value")?),
                ),
                "typed_default_parameter" => (
                    self.required(param, "name")?,
                    param.child_by_field_name("type"),
                    Some(self.required(param, "value")?),
                ),
                _ => (param, None, None),
            };

            if !keyword_only && default.is_none() && !defaults.is_empty() {
                return Err(self.syntax_error(param, "non-default argument follows default argument"));
            }
            let pos = Some(self.pos(param));
            let annotation = self.lower_optional(annotation)?;
            let arg = self.push(
                NodeKind::Arg {
                    arg: self.text(name_node).to_string(),
                    annotation,
                },
                pos,
            );
            let default = self.lower_optional(default)?;
            if keyword_only {
                kwonlyargs.push(arg);
                kw_defaults.push(default);
            } else {
                args.push(arg);
                defaults.extend(default);
            }
        }

        Ok(self.push(
            NodeKind::Arguments {
                args,
                vararg,
                kwonlyargs,
                kw_defaults,
                kwarg,
                defaults,
            },
            None,
        ))
    }

    fn splat_name(&self, node: TsNode<'_>) -> String {
        self.text(node).trim_start_matches('*').trim().to_string()
    }

    /// Arguments of a call or class header, in source order.
    fn lower_call_arguments(&mut self, node: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        let mut out = Vec::new();
        for arg in named(node) {
            let id = match arg.kind() {
                "keyword_argument" => {
                    let name = self.text(self.required(arg, "name")?).to_string();
                    let value = self.lower_expr(self.required(arg, "value")?)?;
                    self.push(
                        NodeKind::Keyword {
                            arg: Some(name),
                            value,
                        },
                        None,
                    )
                }
                "dictionary_splat" => {
                    let value = self.lower_first_named(arg)?;
                    self.push(NodeKind::Keyword { arg: None, value }, None)
                }
                _ => self.lower_expr(arg)?,
            };
            out.push(id);
        }
        Ok(out)
    }

    fn lower_other(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let mut children = Vec::new();
        for child in named(node) {
            match child.kind() {
                "block" => children.extend(self.lower_statements(child)?),
                kind if is_statement_kind(kind) => children.push(self.lower_statement(child)?),
                _ => children.push(self.lower_expr(child)?),
            }
        }
        Ok(self.push(
            NodeKind::Other {
                kind: node.kind().to_string(),
                children,
            },
            pos,
        ))
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn lower_optional(&mut self, node: Option<TsNode<'_>>) -> BlockResult<Option<NodeId>> {
        node.map(|n| self.lower_expr(n)).transpose()
    }

    fn lower_all(&mut self, nodes: Vec<TsNode<'_>>) -> BlockResult<Vec<NodeId>> {
        nodes.into_iter().map(|n| self.lower_expr(n)).collect()
    }

    fn lower_first_named(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        match named(node).first() {
            Some(inner) => self.lower_expr(*inner),
            None => Err(self.syntax_error(node, "invalid syntax")),
        }
    }

    fn lower_expr(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let kind = match node.kind() {
            "identifier" | "keyword_identifier" => NodeKind::Name {
                id: self.text(node).to_string(),
            },
            "integer" | "float" => NodeKind::Num {
                n: self.text(node).to_string(),
            },
            "true" => NodeKind::NameConstant {
                value: "True".to_string(),
            },
            "false" => NodeKind::NameConstant {
                value: "False".to_string(),
            },
            "none" => NodeKind::NameConstant {
                value: "None".to_string(),
            },
            "ellipsis" => NodeKind::Ellipsis,
            "string" | "concatenated_string" => return self.lower_string(node),
            "parenthesized_expression" | "type" | "as_pattern_target" | "decorator" => {
                return match named(node)[..] {
                    [inner] => self.lower_expr(inner),
                    _ => self.lower_other(node),
                };
            }
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => NodeKind::Tuple {
                elts: self.lower_all(named(node))?,
            },
            "list" | "list_pattern" => NodeKind::List {
                elts: self.lower_all(named(node))?,
            },
            "set" => NodeKind::Set {
                elts: self.lower_all(named(node))?,
            },
            "dictionary" => {
                let mut keys = Vec::new();
                let mut values = Vec::new();
                for entry in named(node) {
                    if entry.kind() == "pair" {
                        keys.push(Some(self.lower_expr(self.required(entry, "key")?)?));
                        values.push(self.lower_expr(self.required(entry, "value")?)?);
                    } else {
                        keys.push(None);
                        values.push(self.lower_first_named(entry)?);
                    }
                }
                NodeKind::Dict { keys, values }
            }
            "list_comprehension" | "set_comprehension" | "generator_expression" => {
                let elt = self.lower_expr(self.required(node, "body")?)?;
                let generators = self.lower_generators(node)?;
                match node.kind() {
                    "list_comprehension" => NodeKind::ListComp { elt, generators },
                    "set_comprehension" => NodeKind::SetComp { elt, generators },
                    _ => NodeKind::GeneratorExp { elt, generators },
                }
            }
            "dictionary_comprehension" => {
                let pair = self.required(node, "body")?;
                let key = self.lower_expr(self.required(pair, "key")?)?;
                let value = self.lower_expr(self.required(pair, "value")?)?;
                let generators = self.lower_generators(node)?;
                NodeKind::DictComp {
                    key,
                    value,
                    generators,
                }
            }
            "binary_operator" => {
                let left = self.lower_expr(self.required(node, "left")?)?;
                let op = self.text(self.required(node, "operator")?).to_string();
                let right = self.lower_expr(self.required(node, "right")?)?;
                NodeKind::BinOp { left, op, right }
            }
            "unary_operator" => {
                let op = self.text(self.required(node, "operator")?).to_string();
                let operand = self.lower_expr(self.required(node, "argument")?)?;
                NodeKind::UnaryOp { op, operand }
            }
            "not_operator" => NodeKind::UnaryOp {
                op: "not".to_string(),
                operand: self.lower_expr(self.required(node, "argument")?)?,
            },
            "boolean_operator" => {
                let op = self.text(self.required(node, "operator")?).to_string();
                let mut operands = vec![self.required(node, "right")?];
                let mut current = self.required(node, "left")?;
                while current.kind() == "boolean_operator"
                    && self.text(self.required(current, "operator")?) == op
                {
                    operands.push(self.required(current, "right")?);
                    current = self.required(current, "left")?;
                }
                operands.push(current);
                operands.reverse();
                NodeKind::BoolOp {
                    op,
                    values: self.lower_all(operands)?,
                }
            }
            "comparison_operator" => {
                let operands = named(node);
                let ops = children(node)
                    .into_iter()
                    .filter(|c| !c.is_named())
                    .map(|c| c.kind().to_string())
                    .collect();
                let Some((first, rest)) = operands.split_first() else {
                    return Err(self.syntax_error(node, "invalid syntax"));
                };
                NodeKind::Compare {
                    left: self.lower_expr(*first)?,
                    ops,
                    comparators: self.lower_all(rest.to_vec())?,
                }
            }
            "conditional_expression" => {
                let [body, test, orelse] = named(node)[..] else {
                    return Err(self.syntax_error(node, "invalid syntax"));
                };
                let body = self.lower_expr(body)?;
                let test = self.lower_expr(test)?;
                let orelse = self.lower_expr(orelse)?;
                NodeKind::IfExp { test, body, orelse }
            }
            "named_expression" => NodeKind::NamedExpr {
                target: self.lower_expr(self.required(node, "name")?)?,
                value: self.lower_expr(self.required(node, "value")?)?,
            },
            "lambda" => NodeKind::Lambda {
                args: self.lower_parameters(node.child_by_field_name("parameters"))?,
                body: self.lower_expr(self.required(node, "body")?)?,
            },
            "await" => NodeKind::Await {
                value: self.lower_first_named(node)?,
            },
            "yield" => {
                let value = named(node).first().copied();
                if children(node).iter().any(|c| c.kind() == "from") {
                    let Some(value) = value else {
                        return Err(self.syntax_error(node, "invalid syntax"));
                    };
                    NodeKind::YieldFrom {
                        value: self.lower_expr(value)?,
                    }
                } else {
                    NodeKind::Yield {
                        value: self.lower_optional(value)?,
                    }
                }
            }
            "attribute" => NodeKind::Attribute {
                value: self.lower_expr(self.required(node, "object")?)?,
                attr: self.text(self.required(node, "attribute")?).to_string(),
            },
            "subscript" => {
                let value_node = self.required(node, "value")?;
                let value = self.lower_expr(value_node)?;
                let subs: Vec<_> = named(node)
                    .into_iter()
                    .filter(|c| *c != value_node)
                    .collect();
                let trailing_comma = children(node).iter().any(|c| c.kind() == ",");
                let slice = match subs.as_slice() {
                    [single] if !trailing_comma => self.lower_expr(*single)?,
                    _ => {
                        let elts = self.lower_all(subs)?;
                        let tuple_pos = elts.first().and_then(|e| self.ast.node(*e).pos);
                        self.push(NodeKind::Tuple { elts }, tuple_pos)
                    }
                };
                NodeKind::Subscript { value, slice }
            }
            "slice" => return self.lower_slice(node),
            "call" => {
                let func = self.lower_expr(self.required(node, "function")?)?;
                let arguments = self.required(node, "arguments")?;
                let args = if arguments.kind() == "generator_expression" {
                    vec![self.lower_expr(arguments)?]
                } else {
                    self.lower_call_arguments(arguments)?
                };
                NodeKind::Call { func, args }
            }
            "list_splat" | "list_splat_pattern" => NodeKind::Starred {
                value: self.lower_first_named(node)?,
            },
            "keyword_argument" | "dictionary_splat" => {
                let mut args = self.lower_call_arguments_of(node)?;
                return args
                    .pop()
                    .ok_or_else(|| self.syntax_error(node, "invalid syntax"));
            }
            _ => return self.lower_other(node),
        };
        Ok(self.push(kind, pos))
    }

    /// Lower a lone keyword or `**` argument outside an argument list.
    fn lower_call_arguments_of(&mut self, node: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        let value = match node.child_by_field_name("value") {
            Some(value) => self.lower_expr(value)?,
            None => self.lower_first_named(node)?,
        };
        let arg = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string());
        Ok(vec![self.push(NodeKind::Keyword { arg, value }, None)])
    }

    fn lower_string(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let pos = Some(self.pos(node));
        let pieces = if node.kind() == "concatenated_string" {
            named(node)
        } else {
            vec![node]
        };
        // tree-sitter scans Python 2 `expr` repr as a string token
        if pieces.iter().any(|piece| self.text(*piece).starts_with('`')) {
            let kind = NodeKind::Other {
                kind: "repr".to_string(),
                children: Vec::new(),
            };
            return Ok(self.push(kind, pos));
        }
        let mut value = String::new();
        let mut is_bytes = false;
        let mut is_fstring = false;
        for (i, piece) in pieces.iter().enumerate() {
            let decoded = decode_string_literal(self.text(*piece))?;
            if i == 0 {
                is_bytes = decoded.is_bytes;
            }
            is_fstring |= decoded.is_fstring;
            value.push_str(&decoded.value);
        }
        let kind = if is_fstring {
            NodeKind::JoinedStr {
                text: self.text(node).to_string(),
            }
        } else {
            NodeKind::Str { s: value, is_bytes }
        };
        Ok(self.push(kind, pos))
    }

    fn lower_slice(&mut self, node: TsNode<'_>) -> BlockResult<NodeId> {
        let mut parts: [Option<NodeId>; 3] = [None; 3];
        let mut index = 0;
        for child in children(node) {
            if !child.is_named() {
                if child.kind() == ":" {
                    index += 1;
                }
                continue;
            }
            if index < parts.len() {
                parts[index] = Some(self.lower_expr(child)?);
            }
        }
        let [lower, upper, step] = parts;
        Ok(self.push(NodeKind::Slice { lower, upper, step }, None))
    }

    fn lower_generators(&mut self, node: TsNode<'_>) -> BlockResult<Vec<NodeId>> {
        struct Pending {
            target: NodeId,
            iter: NodeId,
            ifs: Vec<NodeId>,
            is_async: bool,
        }

        let mut pending: Vec<Pending> = Vec::new();
        for clause in named(node) {
            match clause.kind() {
                "for_in_clause" => {
                    let left = self.required(clause, "left")?;
                    let target = self.lower_expr(left)?;
                    let rights: Vec<_> = named(clause).into_iter().filter(|c| *c != left).collect();
                    let iter = match rights.as_slice() {
                        [single] => self.lower_expr(*single)?,
                        [] => return Err(self.syntax_error(clause, "invalid syntax")),
                        many => {
                            let tuple_pos = Some(self.pos(many[0]));
                            let elts = self.lower_all(many.to_vec())?;
                            self.push(NodeKind::Tuple { elts }, tuple_pos)
                        }
                    };
                    pending.push(Pending {
                        target,
                        iter,
                        ifs: Vec::new(),
                        is_async: starts_with_async(clause),
                    });
                }
                "if_clause" => {
                    let test = self.lower_first_named(clause)?;
                    match pending.last_mut() {
                        Some(current) => current.ifs.push(test),
                        None => return Err(self.syntax_error(clause, "invalid syntax")),
                    }
                }
                _ => {}
            }
        }

        Ok(pending
            .into_iter()
            .map(|p| {
                self.push(
                    NodeKind::Comprehension {
                        target: p.target,
                        iter: p.iter,
                        ifs: p.ifs,
                        is_async: p.is_async,
                    },
                    None,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Ast {
        PythonParser::new()
            .unwrap()
            .parse_module(&FileText::new(source), CompilerFlags::NONE)
            .unwrap()
    }

    fn top(ast: &Ast, index: usize) -> &crate::nodes::Node {
        ast.node(ast.module_body()[index])
    }

    mod statements {
        use super::*;

        #[test]
        fn module_body_in_order() {
            let ast = parse("import os\nx = 1\nprint 2\n");
            let kinds: Vec<_> = ast
                .module_body()
                .iter()
                .map(|id| ast.kind(*id).name().to_string())
                .collect();
            assert_eq!(kinds, vec!["Import", "Assign", "Print"]);
        }

        #[test]
        fn positions_are_first_token() {
            let ast = parse("x = 1\n  \ny = [1,\n 2]\n");
            assert_eq!(top(&ast, 0).pos, Some(RawPos::new(1, 0)));
            assert_eq!(top(&ast, 1).pos, Some(RawPos::new(3, 0)));
        }

        #[test]
        fn decorated_definition_starts_at_decorator() {
            let ast = parse("@dec\ndef f(a, b=1):\n    pass\n");
            let node = top(&ast, 0);
            assert_eq!(node.kind.name(), "FunctionDef");
            assert_eq!(node.pos, Some(RawPos::new(1, 0)));
        }

        #[test]
        fn elif_becomes_nested_if() {
            let ast = parse("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
            let NodeKind::If { orelse, .. } = &top(&ast, 0).kind else {
                panic!("expected If");
            };
            assert_eq!(orelse.len(), 1);
            let nested = ast.node(orelse[0]);
            assert_eq!(nested.kind.name(), "If");
            assert_eq!(nested.pos, Some(RawPos::new(3, 0)));
        }

        #[test]
        fn backtick_repr_is_not_a_string() {
            let ast = parse("x = `y`\n");
            let NodeKind::Assign { value, .. } = &top(&ast, 0).kind else {
                panic!("expected Assign");
            };
            let node = ast.node(*value);
            assert_eq!(node.kind.name(), "repr");
            assert_eq!(node.pos, Some(RawPos::new(1, 4)));
        }

        #[test]
        fn chained_assignment_targets() {
            let ast = parse("a = b = 3\n");
            let NodeKind::Assign { targets, .. } = &top(&ast, 0).kind else {
                panic!("expected Assign");
            };
            assert_eq!(targets.len(), 2);
        }

        #[test]
        fn print_chevron_and_trailing_comma() {
            let ast = parse("print >>f, x,\n");
            let NodeKind::Print { dest, values, nl } = &top(&ast, 0).kind else {
                panic!("expected Print");
            };
            assert!(dest.is_some());
            assert_eq!(values.len(), 1);
            assert!(!nl);
        }

        #[test]
        fn relative_import_level() {
            let ast = parse("from ..pkg import a as b, c\n");
            let NodeKind::ImportFrom {
                module,
                names,
                level,
            } = &top(&ast, 0).kind
            else {
                panic!("expected ImportFrom");
            };
            assert_eq!(module.as_deref(), Some("pkg"));
            assert_eq!(*level, 2);
            assert_eq!(names.len(), 2);
        }
    }

    mod sentinel {
        use super::*;

        #[test]
        fn multiline_string_reports_end_line_and_unknown_column() {
            let ast = parse("x = 1\n'''foo\nbar'''\n");
            let expr = top(&ast, 1);
            assert_eq!(expr.pos, Some(RawPos::unknown_column(3)));
            let NodeKind::Expr { value } = expr.kind else {
                panic!("expected Expr");
            };
            assert_eq!(ast.node(value).pos, Some(RawPos::unknown_column(3)));
        }

        #[test]
        fn string_not_leftmost_keeps_column() {
            let ast = parse("x = '''foo\nbar'''\n");
            assert_eq!(top(&ast, 0).pos, Some(RawPos::new(1, 0)));
        }

        #[test]
        fn adjacent_strings_report_first_piece_end() {
            let ast = parse("('''a\nb''' '''c\nd''')\n");
            let NodeKind::Expr { value } = top(&ast, 0).kind else {
                panic!("expected Expr");
            };
            let node = ast.node(value);
            assert_eq!(node.pos, Some(RawPos::unknown_column(2)));
            assert!(matches!(&node.kind, NodeKind::Str { s, .. } if s == "a\nbc\nd"));
        }

        #[test]
        fn single_line_string_keeps_column() {
            let ast = parse("'abc'\n");
            assert_eq!(top(&ast, 0).pos, Some(RawPos::new(1, 0)));
        }
    }

    mod dialect {
        use super::*;

        #[test]
        fn print_rejected_under_print_function_flag() {
            let err = PythonParser::new()
                .unwrap()
                .parse_module(&FileText::new("print 2\n"), CompilerFlags::PRINT_FUNCTION)
                .unwrap_err();
            assert!(err.is_syntax());
        }

        #[test]
        fn print_rejected_after_future_import() {
            let err = PythonParser::new()
                .unwrap()
                .parse_module(
                    &FileText::new("from __future__ import print_function\nprint 2\n"),
                    CompilerFlags::NONE,
                )
                .unwrap_err();
            assert_eq!(err, BlockError::syntax("invalid syntax", 2, 1));
        }

        #[test]
        fn unknown_future_feature_rejected() {
            let err = PythonParser::new()
                .unwrap()
                .parse_module(&FileText::new("from __future__ import braces\n"), CompilerFlags::NONE)
                .unwrap_err();
            assert!(err.to_string().contains("future feature braces is not defined"));
        }
    }

    mod errors_and_dedent {
        use super::*;

        #[test]
        fn syntax_error_position_is_absolute() {
            let text = FileText::new("x = 1\ny = (\n").with_startpos(FilePos::new(10, 1));
            let err = PythonParser::new()
                .unwrap()
                .parse_module(&text, CompilerFlags::NONE)
                .unwrap_err();
            let BlockError::Syntax { line, .. } = err else {
                panic!("expected syntax error, got {err:?}");
            };
            assert!(line >= 11);
        }

        #[test]
        fn dedented_columns_include_indent() {
            let ast = parse("    x = 1\n    y = 2\n");
            assert_eq!(ast.dedent(), "    ");
            assert_eq!(top(&ast, 1).pos, Some(RawPos::new(2, 4)));
        }

        #[test]
        fn columns_count_chars() {
            let ast = parse("é = 1; y = 2\n");
            assert_eq!(top(&ast, 1).pos, Some(RawPos::new(1, 7)));
        }
    }

    mod string_literal_fragments {
        use super::*;

        fn fragment(source: &str) -> Option<String> {
            PythonParser::new().unwrap().parse_string_literal(source)
        }

        #[test]
        fn plain_and_concatenated() {
            assert_eq!(fragment(r#""foo\n" r"\nbar""#).as_deref(), Some("foo\n\\nbar"));
            assert_eq!(fragment("'''a\nb''' 'c'").as_deref(), Some("a\nbc"));
            assert_eq!(fragment("''\n'''c\nd'''"), None);
        }

        #[test]
        fn non_literals_rejected() {
            assert_eq!(fragment("'a' + 'b'"), None);
            assert_eq!(fragment("'a') + ('b'"), None);
            assert_eq!(fragment("x"), None);
            assert_eq!(fragment("'abc"), None);
            assert_eq!(fragment("f'{x}'"), None);
        }
    }
}
