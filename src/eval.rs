use crate::ast::{Expr, Node};
use crate::error::{Error, Result};
use crate::value::{Context, Kwargs, Value};
use std::cmp::Ordering;
use std::fmt::{self, Write};

/// Prefix that resolves a name against the context enclosing the current loop.
pub const SCOPE_ESCAPE: &str = "..";

/// Name the current item is bound to inside a loop body.
pub const LOOP_ITEM: &str = "iter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
    Ne,
}

const OPERATORS: [(&str, CompareOp); 6] = [
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
    ("==", CompareOp::Eq),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    ("!=", CompareOp::Ne),
];

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        OPERATORS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, op)| *op)
    }

    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool> {
        let ordering = |lhs: &Value, rhs: &Value| {
            lhs.compare(rhs).ok_or_else(|| {
                Error::template(format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                ))
            })
        };
        Ok(match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Gt => ordering(lhs, rhs)? == Ordering::Greater,
            CompareOp::Lt => ordering(lhs, rhs)? == Ordering::Less,
            CompareOp::Ge => ordering(lhs, rhs)? != Ordering::Less,
            CompareOp::Le => ordering(lhs, rhs)? != Ordering::Greater,
        })
    }
}

/// The variables visible at one point of a render.
///
/// A loop body sees only `iter` and, through the `..` escape, the scope the
/// loop itself was rendered in. Frames borrow their parent, so entering a
/// loop never copies the caller's context.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Root(&'a Context),
    Loop {
        parent: &'a Scope<'a>,
        item: &'a Value,
    },
}

impl<'a> Scope<'a> {
    fn lookup(&self, key: &str) -> Option<&'a Value> {
        match *self {
            Scope::Root(context) => context.get(key),
            Scope::Loop { item, .. } => (key == LOOP_ITEM).then_some(item),
        }
    }

    /// Looks `key` up one scope out. At the root that is the context's own
    /// `..` entry, if the caller supplied one.
    fn lookup_enclosing(&self, key: &str) -> Option<&'a Value> {
        match *self {
            Scope::Root(context) => context.get(SCOPE_ESCAPE)?.get_attr(key),
            Scope::Loop { parent, .. } => parent.lookup(key),
        }
    }
}

/// Resolves a dotted path, failing with the full `name` on the first missing segment.
pub fn resolve<'a>(name: &str, scope: &Scope<'a>) -> Result<&'a Value> {
    let (escaped, path) = match name.strip_prefix(SCOPE_ESCAPE) {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();
    let mut current = if escaped {
        scope.lookup_enclosing(head)
    } else {
        scope.lookup(head)
    }
    .ok_or_else(|| Error::context(name))?;

    for segment in segments {
        current = current
            .get_attr(segment)
            .ok_or_else(|| Error::context(name))?;
    }
    Ok(current)
}

fn resolve_expr<'a>(expr: &'a Expr, scope: &Scope<'a>) -> Result<&'a Value> {
    match expr {
        Expr::Literal(value) => Ok(value),
        Expr::Name(name) => resolve(name, scope),
    }
}

/// Renders a compiled tree against one context.
pub struct Evaluator<'c> {
    context: &'c Context,
}

impl<'c> Evaluator<'c> {
    pub fn new(context: &'c Context) -> Self {
        Self { context }
    }

    pub fn render(&self, node: &Node) -> Result<String> {
        let mut output = String::new();
        self.render_to(node, &mut output)?;
        Ok(output)
    }

    pub fn render_to<W: Write + ?Sized>(&self, node: &Node, out: &mut W) -> Result<()> {
        render_node(node, &Scope::Root(self.context), out)
    }
}

fn render_nodes<W: Write + ?Sized>(nodes: &[Node], scope: &Scope<'_>, out: &mut W) -> Result<()> {
    for node in nodes {
        render_node(node, scope, out)?;
    }
    Ok(())
}

fn render_node<W: Write + ?Sized>(node: &Node, scope: &Scope<'_>, out: &mut W) -> Result<()> {
    match node {
        Node::Root(children) => render_nodes(children, scope, out),
        Node::Text(text) => out.write_str(text).map_err(write_failed),
        Node::Var(expr) => {
            let value = resolve_expr(expr, scope)?;
            write!(out, "{value}").map_err(write_failed)
        }
        Node::Each { iterable, body } => render_each(iterable, body, scope, out),
        Node::If {
            lhs,
            comparison,
            if_branch,
            else_branch,
        } => {
            let lhs = resolve_expr(lhs, scope)?;
            let take_if = match comparison {
                Some((symbol, rhs)) => {
                    let op = CompareOp::from_symbol(symbol).ok_or_else(|| Error::operator(symbol))?;
                    let rhs = resolve_expr(rhs, scope)?;
                    op.apply(lhs, rhs)?
                }
                None => lhs.is_truthy(),
            };
            let branch = if take_if { if_branch } else { else_branch };
            render_nodes(branch, scope, out)
        }
        Node::Else => Ok(()),
        Node::Call {
            callee,
            args,
            kwargs,
        } => {
            let args = args
                .iter()
                .map(|arg| resolve_expr(arg, scope).cloned())
                .collect::<Result<Vec<_>>>()?;
            let kwargs = kwargs
                .iter()
                .map(|(key, arg)| -> Result<(String, Value)> {
                    Ok((key.clone(), resolve_expr(arg, scope)?.clone()))
                })
                .collect::<Result<Kwargs>>()?;

            let Value::Function(function) = resolve(callee, scope)? else {
                return Err(Error::template(format!("'{callee}' is not callable")));
            };
            let result = function.call(&args, &kwargs)?;
            write!(out, "{result}").map_err(write_failed)
        }
    }
}

fn render_each<W: Write + ?Sized>(
    iterable: &Expr,
    body: &[Node],
    scope: &Scope<'_>,
    out: &mut W,
) -> Result<()> {
    match resolve_expr(iterable, scope)? {
        Value::Array(items) => {
            for item in items {
                render_nodes(body, &Scope::Loop { parent: scope, item }, out)?;
            }
        }
        Value::Map(map) => {
            for key in map.keys() {
                let item = Value::String(key.clone());
                render_nodes(body, &Scope::Loop { parent: scope, item: &item }, out)?;
            }
        }
        Value::String(s) => {
            for c in s.chars() {
                let item = Value::String(c.to_string());
                render_nodes(body, &Scope::Loop { parent: scope, item: &item }, out)?;
            }
        }
        other => {
            let source = match iterable {
                Expr::Name(name) => name.clone(),
                Expr::Literal(value) => value.to_string(),
            };
            return Err(Error::template(format!(
                "'{source}' ({}) is not iterable",
                other.type_name()
            )));
        }
    }
    Ok(())
}

fn write_failed(_: fmt::Error) -> Error {
    Error::template("failed to write rendered output")
}
