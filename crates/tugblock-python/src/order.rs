//! Child enumeration in source order.
//!
//! The default order walks a node's declared fields left to right. That
//! matches the source for most kinds; the exceptions below are reordered
//! explicitly. Each override checks the field layout it was written against,
//! so a changed layout trips in debug builds instead of silently enumerating
//! children out of order.

use crate::nodes::{Ast, NodeId, NodeKind};

/// Children of `id` in the order they appear in the source text.
pub fn child_nodes_in_order(ast: &Ast, id: NodeId) -> Vec<NodeId> {
    let kind = ast.kind(id);
    match kind {
        NodeKind::Dict { keys, values } => {
            debug_assert_eq!(kind.fields(), &["keys", "values"]);
            // `**spread` entries have no key
            keys.iter()
                .zip(values)
                .flat_map(|(key, value)| key.iter().copied().chain(Some(*value)))
                .collect()
        }
        NodeKind::FunctionDef {
            args,
            body,
            decorator_list,
            returns,
            ..
        } => {
            debug_assert_eq!(
                kind.fields(),
                &["name", "args", "body", "decorator_list", "returns"]
            );
            let mut out = decorator_list.clone();
            out.push(*args);
            out.extend(returns);
            out.extend(body);
            out
        }
        NodeKind::ClassDef {
            bases,
            body,
            decorator_list,
            ..
        } => {
            debug_assert_eq!(kind.fields(), &["name", "bases", "body", "decorator_list"]);
            let mut out = decorator_list.clone();
            out.extend(bases);
            out.extend(body);
            out
        }
        NodeKind::IfExp { test, body, orelse } => {
            debug_assert_eq!(kind.fields(), &["test", "body", "orelse"]);
            vec![*body, *test, *orelse]
        }
        NodeKind::Arguments {
            args,
            kwonlyargs,
            kw_defaults,
            defaults,
            ..
        } => {
            debug_assert_eq!(
                kind.fields(),
                &["args", "vararg", "kwonlyargs", "kw_defaults", "kwarg", "defaults"]
            );
            // defaults align with the trailing positional args
            let without_default = args.len().saturating_sub(defaults.len());
            let mut out: Vec<NodeId> = args[..without_default].to_vec();
            for (arg, default) in args[without_default..].iter().zip(defaults) {
                out.push(*arg);
                out.push(*default);
            }
            for (arg, default) in kwonlyargs.iter().zip(kw_defaults) {
                out.push(*arg);
                out.extend(default);
            }
            out
        }
        _ => kind.field_children(),
    }
}

/// Pre-order walk over a subtree, children in source order.
pub struct WalkInOrder<'a> {
    ast: &'a Ast,
    stack: Vec<NodeId>,
}

impl Iterator for WalkInOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = child_nodes_in_order(self.ast, id);
        self.stack.extend(children.into_iter().rev());
        Some(id)
    }
}

/// Walk `root` and its descendants in source order.
pub fn walk_in_order(ast: &Ast, root: NodeId) -> WalkInOrder<'_> {
    WalkInOrder {
        ast,
        stack: vec![root],
    }
}
