use crate::ast::Node;
use crate::error::{Error, Result};
use crate::lexer::{tokenize, Fragment, FragmentKind, BLOCK_TOKEN_START, VAR_TOKEN_START};

/// Most blocks that may be open at once, not counting the root.
pub const MAX_BLOCK_DEPTH: usize = 128;

/// A node that is still collecting children, with the text that opened it.
struct OpenScope<'a> {
    node: Node,
    opened_by: &'a str,
}

/// Builds the node tree from a template in a single pass over its fragments.
pub struct Compiler<'a> {
    source: &'a str,
    scopes: Vec<OpenScope<'a>>,
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            scopes: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<Node> {
        self.scopes.push(OpenScope {
            node: Node::root(),
            opened_by: "",
        });

        for fragment in tokenize(self.source) {
            if fragment.kind == FragmentKind::BlockEnd {
                self.close_scope(&fragment)?;
                continue;
            }

            let node = create_node(&fragment)?;
            if matches!(node, Node::Else) {
                self.check_else(&fragment)?;
            }

            if node.creates_scope() {
                if self.scopes.len() > MAX_BLOCK_DEPTH {
                    return Err(Error::syntax(fragment.raw, "blocks nested too deeply"));
                }
                self.scopes.push(OpenScope {
                    node,
                    opened_by: fragment.raw,
                });
            } else {
                self.attach(node)?;
            }
        }

        if self.scopes.len() > 1 {
            let innermost = self.scopes.last().map_or("", |s| s.opened_by);
            return Err(Error::syntax(innermost, "block is never closed"));
        }

        self.scopes
            .pop()
            .map(|scope| scope.node)
            .ok_or_else(|| Error::template("nesting issues"))
    }

    fn close_scope(&mut self, fragment: &Fragment<'a>) -> Result<()> {
        if self.scopes.len() <= 1 {
            return Err(Error::syntax(fragment.raw, "end without an open block"));
        }
        let Some(OpenScope { mut node, .. }) = self.scopes.pop() else {
            return Err(Error::template("nesting issues"));
        };
        node.exit_scope();
        self.attach(node)
    }

    /// Appends `node` as the last child of the innermost open scope.
    fn attach(&mut self, node: Node) -> Result<()> {
        self.scopes
            .last_mut()
            .and_then(|scope| scope.node.children_mut())
            .map(|children| children.push(node))
            .ok_or_else(|| Error::template("nesting issues"))
    }

    /// `else` must sit directly inside an `if` that has no `else` yet.
    fn check_else(&self, fragment: &Fragment<'a>) -> Result<()> {
        let Some(OpenScope {
            node: Node::If { if_branch, .. },
            ..
        }) = self.scopes.last()
        else {
            return Err(Error::syntax(fragment.raw, "else outside of an if block"));
        };
        if if_branch.iter().any(|n| matches!(n, Node::Else)) {
            return Err(Error::syntax(fragment.raw, "if has more than one else"));
        }
        Ok(())
    }
}

fn create_node(fragment: &Fragment<'_>) -> Result<Node> {
    match fragment.kind {
        FragmentKind::Text => {
            if fragment.raw.contains(VAR_TOKEN_START) || fragment.raw.contains(BLOCK_TOKEN_START) {
                return Err(Error::syntax(fragment.raw, "unterminated tag"));
            }
            Ok(Node::text(fragment.clean))
        }
        FragmentKind::Variable => Ok(Node::var(fragment.clean)),
        FragmentKind::BlockStart => {
            let command = fragment.clean.split_whitespace().next().unwrap_or_default();
            match command {
                "each" => Node::each(fragment.clean),
                "if" => Node::if_block(fragment.clean),
                "else" => Ok(Node::Else),
                "call" => Node::call(fragment.clean),
                _ => Err(Error::syntax(fragment.raw, "unknown block command")),
            }
        }
        FragmentKind::BlockEnd => Err(Error::syntax(fragment.raw, "unexpected end")),
    }
}
