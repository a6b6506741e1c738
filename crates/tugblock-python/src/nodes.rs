//! Arena representation of a parsed Python module.
//!
//! Nodes are immutable once the parser has built them. Every node lives in
//! the [`Ast`] arena and is addressed by a [`NodeId`]; child fields hold ids,
//! never references, so resolved positions can be kept in a separate side
//! table (see [`crate::annotate::Positions`]).
//!
//! The vocabulary follows the classic Python `ast` module. Leaf payload
//! (identifiers, numeric text, decoded string values, operator spellings) is
//! stored inline and is not itself a node.

use std::fmt;

use crate::literal::repr_str;

// ============================================================================
// Identifiers and raw positions
// ============================================================================

/// Index of a node in its [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position metadata as reported by the parser, before annotation.
///
/// `lineno` is 1-based and relative to the parsed text. `col_offset` is a
/// 0-based char column, or [`RawPos::COL_UNKNOWN`] when the node's first token
/// is a multi-line string literal. In that case `lineno` is the *ending* line
/// of that first literal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPos {
    pub lineno: u32,
    pub col_offset: i32,
}

impl RawPos {
    /// Sentinel column for nodes whose start column is unknown.
    pub const COL_UNKNOWN: i32 = -1;

    pub fn new(lineno: u32, col_offset: u32) -> Self {
        RawPos {
            lineno,
            col_offset: col_offset as i32,
        }
    }

    /// A position with the unknown-column sentinel.
    pub fn unknown_column(end_lineno: u32) -> Self {
        RawPos {
            lineno: end_lineno,
            col_offset: Self::COL_UNKNOWN,
        }
    }

    pub fn has_column(&self) -> bool {
        self.col_offset >= 0
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// A syntax node's kind and fields.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        body: Vec<NodeId>,
    },
    FunctionDef {
        name: String,
        args: NodeId,
        body: Vec<NodeId>,
        decorator_list: Vec<NodeId>,
        returns: Option<NodeId>,
        is_async: bool,
    },
    /// `bases` holds positional bases and class keywords in source order.
    ClassDef {
        name: String,
        bases: Vec<NodeId>,
        body: Vec<NodeId>,
        decorator_list: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Delete {
        targets: Vec<NodeId>,
    },
    Assign {
        targets: Vec<NodeId>,
        value: NodeId,
    },
    AugAssign {
        target: NodeId,
        op: String,
        value: NodeId,
    },
    AnnAssign {
        target: NodeId,
        annotation: NodeId,
        value: Option<NodeId>,
    },
    For {
        target: NodeId,
        iter: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
        is_async: bool,
    },
    While {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    If {
        test: NodeId,
        body: Vec<NodeId>,
        orelse: Vec<NodeId>,
    },
    With {
        items: Vec<NodeId>,
        body: Vec<NodeId>,
        is_async: bool,
    },
    WithItem {
        context_expr: NodeId,
        optional_vars: Option<NodeId>,
    },
    Raise {
        exc: Option<NodeId>,
        cause: Option<NodeId>,
    },
    Try {
        body: Vec<NodeId>,
        handlers: Vec<NodeId>,
        orelse: Vec<NodeId>,
        finalbody: Vec<NodeId>,
    },
    ExceptHandler {
        type_: Option<NodeId>,
        name: Option<String>,
        body: Vec<NodeId>,
    },
    Assert {
        test: NodeId,
        msg: Option<NodeId>,
    },
    Import {
        names: Vec<NodeId>,
    },
    ImportFrom {
        module: Option<String>,
        names: Vec<NodeId>,
        level: u32,
    },
    Alias {
        name: String,
        asname: Option<String>,
    },
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Expr {
        value: NodeId,
    },
    Pass,
    Break,
    Continue,
    /// Statement-form `print`.
    Print {
        dest: Option<NodeId>,
        values: Vec<NodeId>,
        nl: bool,
    },
    /// Statement-form `exec`.
    Exec {
        body: NodeId,
        globals: Option<NodeId>,
        locals: Option<NodeId>,
    },
    BoolOp {
        op: String,
        values: Vec<NodeId>,
    },
    NamedExpr {
        target: NodeId,
        value: NodeId,
    },
    BinOp {
        left: NodeId,
        op: String,
        right: NodeId,
    },
    UnaryOp {
        op: String,
        operand: NodeId,
    },
    Lambda {
        args: NodeId,
        body: NodeId,
    },
    IfExp {
        test: NodeId,
        body: NodeId,
        orelse: NodeId,
    },
    /// `keys[i]` is `None` for a `**mapping` entry.
    Dict {
        keys: Vec<Option<NodeId>>,
        values: Vec<NodeId>,
    },
    Set {
        elts: Vec<NodeId>,
    },
    ListComp {
        elt: NodeId,
        generators: Vec<NodeId>,
    },
    SetComp {
        elt: NodeId,
        generators: Vec<NodeId>,
    },
    DictComp {
        key: NodeId,
        value: NodeId,
        generators: Vec<NodeId>,
    },
    GeneratorExp {
        elt: NodeId,
        generators: Vec<NodeId>,
    },
    Comprehension {
        target: NodeId,
        iter: NodeId,
        ifs: Vec<NodeId>,
        is_async: bool,
    },
    Await {
        value: NodeId,
    },
    Yield {
        value: Option<NodeId>,
    },
    YieldFrom {
        value: NodeId,
    },
    Compare {
        left: NodeId,
        ops: Vec<String>,
        comparators: Vec<NodeId>,
    },
    /// `args` holds positional, starred and keyword arguments in source order.
    Call {
        func: NodeId,
        args: Vec<NodeId>,
    },
    /// `arg` is `None` for `**mapping`.
    Keyword {
        arg: Option<String>,
        value: NodeId,
    },
    /// Numeric literal, as written.
    Num {
        n: String,
    },
    /// Plain string or bytes literal (possibly adjacent-concatenated).
    Str {
        s: String,
        is_bytes: bool,
    },
    /// Formatted string literal, kept as source text.
    JoinedStr {
        text: String,
    },
    /// `True`, `False` or `None`.
    NameConstant {
        value: String,
    },
    Ellipsis,
    Attribute {
        value: NodeId,
        attr: String,
    },
    Subscript {
        value: NodeId,
        slice: NodeId,
    },
    Slice {
        lower: Option<NodeId>,
        upper: Option<NodeId>,
        step: Option<NodeId>,
    },
    Starred {
        value: NodeId,
    },
    Name {
        id: String,
    },
    List {
        elts: Vec<NodeId>,
    },
    Tuple {
        elts: Vec<NodeId>,
    },
    /// Parameter list. `*args` / `**kwargs` names are leaf metadata.
    Arguments {
        args: Vec<NodeId>,
        vararg: Option<String>,
        kwonlyargs: Vec<NodeId>,
        kw_defaults: Vec<Option<NodeId>>,
        kwarg: Option<String>,
        defaults: Vec<NodeId>,
    },
    Arg {
        arg: String,
        annotation: Option<NodeId>,
    },
    /// A construct outside this vocabulary (e.g. `match`), with its children
    /// in source order.
    Other {
        kind: String,
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// The kind name, as the classic `ast` module spells it.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Module { .. } => "Module",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::ClassDef { .. } => "ClassDef",
            NodeKind::Return { .. } => "Return",
            NodeKind::Delete { .. } => "Delete",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::AugAssign { .. } => "AugAssign",
            NodeKind::AnnAssign { .. } => "AnnAssign",
            NodeKind::For { .. } => "For",
            NodeKind::While { .. } => "While",
            NodeKind::If { .. } => "If",
            NodeKind::With { .. } => "With",
            NodeKind::WithItem { .. } => "withitem",
            NodeKind::Raise { .. } => "Raise",
            NodeKind::Try { .. } => "Try",
            NodeKind::ExceptHandler { .. } => "ExceptHandler",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Import { .. } => "Import",
            NodeKind::ImportFrom { .. } => "ImportFrom",
            NodeKind::Alias { .. } => "alias",
            NodeKind::Global { .. } => "Global",
            NodeKind::Nonlocal { .. } => "Nonlocal",
            NodeKind::Expr { .. } => "Expr",
            NodeKind::Pass => "Pass",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Print { .. } => "Print",
            NodeKind::Exec { .. } => "Exec",
            NodeKind::BoolOp { .. } => "BoolOp",
            NodeKind::NamedExpr { .. } => "NamedExpr",
            NodeKind::BinOp { .. } => "BinOp",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Lambda { .. } => "Lambda",
            NodeKind::IfExp { .. } => "IfExp",
            NodeKind::Dict { .. } => "Dict",
            NodeKind::Set { .. } => "Set",
            NodeKind::ListComp { .. } => "ListComp",
            NodeKind::SetComp { .. } => "SetComp",
            NodeKind::DictComp { .. } => "DictComp",
            NodeKind::GeneratorExp { .. } => "GeneratorExp",
            NodeKind::Comprehension { .. } => "comprehension",
            NodeKind::Await { .. } => "Await",
            NodeKind::Yield { .. } => "Yield",
            NodeKind::YieldFrom { .. } => "YieldFrom",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::Call { .. } => "Call",
            NodeKind::Keyword { .. } => "keyword",
            NodeKind::Num { .. } => "Num",
            NodeKind::Str { .. } => "Str",
            NodeKind::JoinedStr { .. } => "JoinedStr",
            NodeKind::NameConstant { .. } => "NameConstant",
            NodeKind::Ellipsis => "Ellipsis",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Subscript { .. } => "Subscript",
            NodeKind::Slice { .. } => "Slice",
            NodeKind::Starred { .. } => "Starred",
            NodeKind::Name { .. } => "Name",
            NodeKind::List { .. } => "List",
            NodeKind::Tuple { .. } => "Tuple",
            NodeKind::Arguments { .. } => "arguments",
            NodeKind::Arg { .. } => "arg",
            NodeKind::Other { kind, .. } => kind,
        }
    }

    /// Declared field layout, in declaration order.
    ///
    /// Includes leaf fields. The default child order walks the node-valued
    /// fields of this layout from left to right.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Module { .. } => &["body"],
            NodeKind::FunctionDef { .. } => &["name", "args", "body", "decorator_list", "returns"],
            NodeKind::ClassDef { .. } => &["name", "bases", "body", "decorator_list"],
            NodeKind::Return { .. } => &["value"],
            NodeKind::Delete { .. } => &["targets"],
            NodeKind::Assign { .. } => &["targets", "value"],
            NodeKind::AugAssign { .. } => &["target", "op", "value"],
            NodeKind::AnnAssign { .. } => &["target", "annotation", "value"],
            NodeKind::For { .. } => &["target", "iter", "body", "orelse"],
            NodeKind::While { .. } | NodeKind::If { .. } => &["test", "body", "orelse"],
            NodeKind::With { .. } => &["items", "body"],
            NodeKind::WithItem { .. } => &["context_expr", "optional_vars"],
            NodeKind::Raise { .. } => &["exc", "cause"],
            NodeKind::Try { .. } => &["body", "handlers", "orelse", "finalbody"],
            NodeKind::ExceptHandler { .. } => &["type", "name", "body"],
            NodeKind::Assert { .. } => &["test", "msg"],
            NodeKind::Import { .. } => &["names"],
            NodeKind::ImportFrom { .. } => &["module", "names", "level"],
            NodeKind::Alias { .. } => &["name", "asname"],
            NodeKind::Global { .. } | NodeKind::Nonlocal { .. } => &["names"],
            NodeKind::Expr { .. } => &["value"],
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue | NodeKind::Ellipsis => &[],
            NodeKind::Print { .. } => &["dest", "values", "nl"],
            NodeKind::Exec { .. } => &["body", "globals", "locals"],
            NodeKind::BoolOp { .. } => &["op", "values"],
            NodeKind::NamedExpr { .. } => &["target", "value"],
            NodeKind::BinOp { .. } => &["left", "op", "right"],
            NodeKind::UnaryOp { .. } => &["op", "operand"],
            NodeKind::Lambda { .. } => &["args", "body"],
            NodeKind::IfExp { .. } => &["test", "body", "orelse"],
            NodeKind::Dict { .. } => &["keys", "values"],
            NodeKind::Set { .. } | NodeKind::List { .. } | NodeKind::Tuple { .. } => &["elts"],
            NodeKind::ListComp { .. }
            | NodeKind::SetComp { .. }
            | NodeKind::GeneratorExp { .. } => &["elt", "generators"],
            NodeKind::DictComp { .. } => &["key", "value", "generators"],
            NodeKind::Comprehension { .. } => &["target", "iter", "ifs"],
            NodeKind::Await { .. } | NodeKind::YieldFrom { .. } | NodeKind::Starred { .. } => {
                &["value"]
            }
            NodeKind::Yield { .. } => &["value"],
            NodeKind::Compare { .. } => &["left", "ops", "comparators"],
            NodeKind::Call { .. } => &["func", "args"],
            NodeKind::Keyword { .. } => &["arg", "value"],
            NodeKind::Num { .. } => &["n"],
            NodeKind::Str { .. } => &["s"],
            NodeKind::JoinedStr { .. } => &["values"],
            NodeKind::NameConstant { .. } => &["value"],
            NodeKind::Attribute { .. } => &["value", "attr"],
            NodeKind::Subscript { .. } => &["value", "slice"],
            NodeKind::Slice { .. } => &["lower", "upper", "step"],
            NodeKind::Name { .. } => &["id"],
            NodeKind::Arguments { .. } => {
                &["args", "vararg", "kwonlyargs", "kw_defaults", "kwarg", "defaults"]
            }
            NodeKind::Arg { .. } => &["arg", "annotation"],
            NodeKind::Other { .. } => &["children"],
        }
    }

    /// Node-valued children in declared field order, lists flattened.
    pub fn field_children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::Module { body } => out.extend(body),
            NodeKind::FunctionDef {
                args,
                body,
                decorator_list,
                returns,
                ..
            } => {
                out.push(*args);
                out.extend(body);
                out.extend(decorator_list);
                out.extend(returns);
            }
            NodeKind::ClassDef {
                bases,
                body,
                decorator_list,
                ..
            } => {
                out.extend(bases);
                out.extend(body);
                out.extend(decorator_list);
            }
            NodeKind::Return { value } | NodeKind::Yield { value } => out.extend(value),
            NodeKind::Delete { targets } => out.extend(targets),
            NodeKind::Assign { targets, value } => {
                out.extend(targets);
                out.push(*value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                out.push(*target);
                out.push(*value);
            }
            NodeKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                out.push(*target);
                out.push(*annotation);
                out.extend(value);
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
                ..
            } => {
                out.push(*target);
                out.push(*iter);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::While { test, body, orelse } | NodeKind::If { test, body, orelse } => {
                out.push(*test);
                out.extend(body);
                out.extend(orelse);
            }
            NodeKind::With { items, body, .. } => {
                out.extend(items);
                out.extend(body);
            }
            NodeKind::WithItem {
                context_expr,
                optional_vars,
            } => {
                out.push(*context_expr);
                out.extend(optional_vars);
            }
            NodeKind::Raise { exc, cause } => {
                out.extend(exc);
                out.extend(cause);
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                out.extend(body);
                out.extend(handlers);
                out.extend(orelse);
                out.extend(finalbody);
            }
            NodeKind::ExceptHandler { type_, body, .. } => {
                out.extend(type_);
                out.extend(body);
            }
            NodeKind::Assert { test, msg } => {
                out.push(*test);
                out.extend(msg);
            }
            NodeKind::Import { names } | NodeKind::ImportFrom { names, .. } => out.extend(names),
            NodeKind::Expr { value }
            | NodeKind::Await { value }
            | NodeKind::YieldFrom { value }
            | NodeKind::Starred { value }
            | NodeKind::Keyword { value, .. } => out.push(*value),
            NodeKind::Print { dest, values, .. } => {
                out.extend(dest);
                out.extend(values);
            }
            NodeKind::Exec {
                body,
                globals,
                locals,
            } => {
                out.push(*body);
                out.extend(globals);
                out.extend(locals);
            }
            NodeKind::BoolOp { values, .. } => out.extend(values),
            NodeKind::NamedExpr { target, value } => {
                out.push(*target);
                out.push(*value);
            }
            NodeKind::BinOp { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            NodeKind::UnaryOp { operand, .. } => out.push(*operand),
            NodeKind::Lambda { args, body } => {
                out.push(*args);
                out.push(*body);
            }
            NodeKind::IfExp { test, body, orelse } => {
                out.push(*test);
                out.push(*body);
                out.push(*orelse);
            }
            NodeKind::Dict { keys, values } => {
                out.extend(keys.iter().flatten());
                out.extend(values);
            }
            NodeKind::Set { elts } | NodeKind::List { elts } | NodeKind::Tuple { elts } => {
                out.extend(elts)
            }
            NodeKind::ListComp { elt, generators }
            | NodeKind::SetComp { elt, generators }
            | NodeKind::GeneratorExp { elt, generators } => {
                out.push(*elt);
                out.extend(generators);
            }
            NodeKind::DictComp {
                key,
                value,
                generators,
            } => {
                out.push(*key);
                out.push(*value);
                out.extend(generators);
            }
            NodeKind::Comprehension {
                target, iter, ifs, ..
            } => {
                out.push(*target);
                out.push(*iter);
                out.extend(ifs);
            }
            NodeKind::Compare {
                left, comparators, ..
            } => {
                out.push(*left);
                out.extend(comparators);
            }
            NodeKind::Call { func, args } => {
                out.push(*func);
                out.extend(args);
            }
            NodeKind::Attribute { value, .. } => out.push(*value),
            NodeKind::Subscript { value, slice } => {
                out.push(*value);
                out.push(*slice);
            }
            NodeKind::Slice { lower, upper, step } => {
                out.extend(lower);
                out.extend(upper);
                out.extend(step);
            }
            NodeKind::Arguments {
                args,
                kwonlyargs,
                kw_defaults,
                defaults,
                ..
            } => {
                out.extend(args);
                out.extend(kwonlyargs);
                out.extend(kw_defaults.iter().flatten());
                out.extend(defaults);
            }
            NodeKind::Arg { annotation, .. } => out.extend(annotation),
            NodeKind::Other { children, .. } => out.extend(children),
            NodeKind::Alias { .. }
            | NodeKind::Global { .. }
            | NodeKind::Nonlocal { .. }
            | NodeKind::Pass
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Num { .. }
            | NodeKind::Str { .. }
            | NodeKind::JoinedStr { .. }
            | NodeKind::NameConstant { .. }
            | NodeKind::Ellipsis
            | NodeKind::Name { .. } => {}
        }
        out
    }

    /// Leaf payload rendered for diagnostics, if the kind carries any.
    fn leaf_summary(&self) -> Option<String> {
        match self {
            NodeKind::FunctionDef { name, .. } | NodeKind::ClassDef { name, .. } => {
                Some(format!("name={}", repr_str(name)))
            }
            NodeKind::AugAssign { op, .. }
            | NodeKind::BoolOp { op, .. }
            | NodeKind::BinOp { op, .. }
            | NodeKind::UnaryOp { op, .. } => Some(format!("op={}", repr_str(op))),
            NodeKind::Compare { ops, .. } => Some(format!(
                "ops=[{}]",
                ops.iter().map(|o| repr_str(o)).collect::<Vec<_>>().join(", ")
            )),
            NodeKind::ImportFrom { module, level, .. } => Some(format!(
                "module={}, level={}",
                module.as_deref().map(repr_str).unwrap_or_else(|| "None".into()),
                level
            )),
            NodeKind::Alias { name, asname } => Some(match asname {
                Some(asname) => format!("name={}, asname={}", repr_str(name), repr_str(asname)),
                None => format!("name={}", repr_str(name)),
            }),
            NodeKind::Global { names } | NodeKind::Nonlocal { names } => Some(format!(
                "names=[{}]",
                names.iter().map(|n| repr_str(n)).collect::<Vec<_>>().join(", ")
            )),
            NodeKind::ExceptHandler { name: Some(name), .. } => {
                Some(format!("name={}", repr_str(name)))
            }
            NodeKind::Print { nl, .. } => Some(format!("nl={}", if *nl { "True" } else { "False" })),
            NodeKind::Keyword { arg, .. } => Some(format!(
                "arg={}",
                arg.as_deref().map(repr_str).unwrap_or_else(|| "None".into())
            )),
            NodeKind::Num { n } => Some(format!("n={}", n)),
            NodeKind::Str { s, is_bytes } => Some(format!(
                "s={}{}",
                if *is_bytes { "b" } else { "" },
                repr_str(s)
            )),
            NodeKind::JoinedStr { text } => Some(format!("text={}", repr_str(text))),
            NodeKind::NameConstant { value } => Some(format!("value={}", value)),
            NodeKind::Attribute { attr, .. } => Some(format!("attr={}", repr_str(attr))),
            NodeKind::Name { id } => Some(format!("id={}", repr_str(id))),
            NodeKind::Arguments { vararg, kwarg, .. } if vararg.is_some() || kwarg.is_some() => {
                Some(format!(
                    "vararg={}, kwarg={}",
                    vararg.as_deref().map(repr_str).unwrap_or_else(|| "None".into()),
                    kwarg.as_deref().map(repr_str).unwrap_or_else(|| "None".into())
                ))
            }
            NodeKind::Arg { arg, .. } => Some(format!("arg={}", repr_str(arg))),
            _ => None,
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

/// One arena entry: a kind plus the parser-reported position, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// `None` for nodes that carry no position (module, parameter lists,
    /// keywords, comprehensions, with-items, aliases, slices).
    pub pos: Option<RawPos>,
}

/// An immutable parsed module.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
    dedent: String,
}

impl Ast {
    pub(crate) fn new() -> Self {
        Ast {
            nodes: Vec::new(),
            root: NodeId(0),
            dedent: String::new(),
        }
    }

    pub(crate) fn push(&mut self, kind: NodeKind, pos: Option<RawPos>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, pos });
        id
    }

    pub(crate) fn finish(mut self, root: NodeId, dedent: String) -> Self {
        self.root = root;
        self.dedent = dedent;
        self
    }

    /// The `Module` node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level statements of the module.
    pub fn module_body(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Module { body } => body,
            _ => &[],
        }
    }

    /// Common leading whitespace removed from every line before parsing.
    pub fn dedent(&self) -> &str {
        &self.dedent
    }

    /// Render a node and its subtree, `ast.dump` style.
    pub fn dump(&self, id: NodeId) -> String {
        let kind = self.kind(id);
        let mut parts: Vec<String> = Vec::new();
        parts.extend(kind.leaf_summary());
        parts.extend(kind.field_children().into_iter().map(|c| self.dump(c)));
        format!("{}({})", kind.name(), parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Ast, NodeId) {
        let mut ast = Ast::new();
        let key = ast.push(NodeKind::Num { n: "1".into() }, Some(RawPos::new(1, 1)));
        let value = ast.push(
            NodeKind::Str {
                s: "a".into(),
                is_bytes: false,
            },
            Some(RawPos::new(1, 4)),
        );
        let dict = ast.push(
            NodeKind::Dict {
                keys: vec![Some(key), None],
                values: vec![value, key],
            },
            Some(RawPos::new(1, 0)),
        );
        (ast, dict)
    }

    #[test]
    fn field_children_follow_declaration_order() {
        let (ast, dict) = sample();
        let children = ast.kind(dict).field_children();
        // keys first (spread entry skipped), then values
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], children[2]);
    }

    #[test]
    fn dump_includes_leaf_payload() {
        let (ast, dict) = sample();
        assert_eq!(ast.dump(dict), "Dict(Num(n=1), Str(s='a'), Num(n=1))");
    }

    #[test]
    fn unknown_column_sentinel() {
        let pos = RawPos::unknown_column(3);
        assert!(!pos.has_column());
        assert_eq!(pos.col_offset, RawPos::COL_UNKNOWN);
        assert!(RawPos::new(1, 0).has_column());
    }

    #[test]
    fn other_kind_reports_its_name() {
        let kind = NodeKind::Other {
            kind: "match_statement".into(),
            children: vec![],
        };
        assert_eq!(kind.name(), "match_statement");
        assert_eq!(kind.fields(), &["children"]);
    }
}
