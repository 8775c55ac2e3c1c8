use crate::error::{Error, Result};
use crate::literal::parse_literal;
use crate::value::Value;

/// An expression classified once, at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted path, possibly prefixed with the `..` scope escape.
    Name(String),
}

/// Classifies `expr` as a literal or a name. Never fails.
pub fn eval_expr(expr: &str) -> Expr {
    match parse_literal(expr) {
        Some(value) => Expr::Literal(value),
        None => Expr::Name(expr.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Vec<Node>),
    Text(String),
    Var(Expr),
    Each {
        iterable: Expr,
        body: Vec<Node>,
    },
    If {
        lhs: Expr,
        /// Operator symbol and right-hand side; the symbol is checked when rendering.
        comparison: Option<(String, Expr)>,
        if_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    /// Branch separator inside `If`; renders nothing.
    Else,
    Call {
        callee: String,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
}

impl Node {
    pub fn root() -> Self {
        Node::Root(Vec::new())
    }

    pub fn text(text: &str) -> Self {
        Node::Text(text.to_string())
    }

    pub fn var(clean: &str) -> Self {
        Node::Var(eval_expr(clean))
    }

    /// `each <expr>`: everything after the keyword is the iterable.
    pub fn each(clean: &str) -> Result<Self> {
        let iterable = match clean.split_once(char::is_whitespace) {
            Some((_, rest)) if !rest.trim().is_empty() => rest.trim(),
            _ => return Err(Error::syntax(clean, "each expects an iterable")),
        };
        Ok(Node::Each {
            iterable: eval_expr(iterable),
            body: Vec::new(),
        })
    }

    /// `if <lhs> [<op> <rhs>]`.
    pub fn if_block(clean: &str) -> Result<Self> {
        let bits: Vec<&str> = clean.split_whitespace().skip(1).collect();
        let (lhs, comparison) = match bits.as_slice() {
            [lhs] => (eval_expr(lhs), None),
            [lhs, op, rhs] => (eval_expr(lhs), Some((op.to_string(), eval_expr(rhs)))),
            _ => {
                return Err(Error::syntax(
                    clean,
                    "if expects one operand or `lhs op rhs`",
                ))
            }
        };
        Ok(Node::If {
            lhs,
            comparison,
            if_branch: Vec::new(),
            else_branch: Vec::new(),
        })
    }

    /// `call <name> [args...]`; `key=value` tokens become keyword arguments.
    pub fn call(clean: &str) -> Result<Self> {
        let mut bits = clean.split_whitespace().skip(1);
        let callee = bits
            .next()
            .ok_or_else(|| Error::syntax(clean, "call expects a callable name"))?
            .to_string();

        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        for bit in bits {
            match bit.split_once('=') {
                Some(("", _)) => {
                    return Err(Error::syntax(clean, "keyword argument without a name"))
                }
                Some((key, value)) => kwargs.push((key.to_string(), eval_expr(value))),
                None => args.push(eval_expr(bit)),
            }
        }

        Ok(Node::Call {
            callee,
            args,
            kwargs,
        })
    }

    /// Whether the node owns the siblings that follow it until a matching `end`.
    pub fn creates_scope(&self) -> bool {
        matches!(self, Node::Root(_) | Node::Each { .. } | Node::If { .. })
    }

    /// Children being collected while the node is the innermost open scope.
    /// For `If` this holds both branches, separated by `Else`, until [`Node::exit_scope`].
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(children) => Some(children),
            Node::Each { body, .. } => Some(body),
            Node::If { if_branch, .. } => Some(if_branch),
            _ => None,
        }
    }

    /// Runs when the node's matching `end` is reached.
    pub fn exit_scope(&mut self) {
        if let Node::If {
            if_branch,
            else_branch,
            ..
        } = self
        {
            if let Some(split) = if_branch.iter().position(|n| matches!(n, Node::Else)) {
                *else_branch = if_branch.split_off(split + 1);
                if_branch.truncate(split);
            }
        }
    }
}
