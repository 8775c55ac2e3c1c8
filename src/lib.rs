//! minitmpl: a minimal template-expansion engine.
//!
//! A template is compiled once into a tree of nodes and can then be rendered
//! any number of times against different contexts. Compilation never looks at
//! a context, and rendering never re-parses the template.
//!
//! Syntax:
//! - `{{ name }}`, `{{ user.name }}`, `{{ 42 }}`: interpolation of a dotted
//!   path or a literal.
//! - `{% each items %} ... {% end %}`: inside the body `iter` is the current
//!   item and `..name` reaches the context the loop was rendered in.
//! - `{% if x %}`, `{% if x > 1 %} ... {% else %} ... {% end %}`, with the
//!   operators `> < == >= <= !=`.
//! - `{% call name arg key=value %}`: invokes a [`Function`] from the context.
//!   Calls are self-closing.
//!
//! Literals are numbers, quoted strings, `true`/`false`/`null` (or the
//! capitalised `True`/`False`/`None`), and `[...]`, `(...)`, `{k: v}`
//! aggregates of those. Anything else is a name looked up at render time.
//!
//! Text conversion: `null` renders as nothing; strings verbatim; containers
//! as `[1, "a"]` / `{"k": 1}`.
//!
//! Truthiness for `{% if x %}`: `null`, `false`, `0`, `0.0` and empty
//! strings, arrays and maps are false; everything else is true.
//!
//! Not supported: inheritance and includes, filters, escaping, whitespace
//! control, and defining functions inside templates.
//!
//! ```
//! use minitmpl::{Context, Template};
//!
//! let template = Template::new("{% each people %}<li>{{ iter }}</li>{% end %}").unwrap();
//! let context = Context::new().with("people", vec!["jack", "rose"]);
//! assert_eq!(template.render(&context).unwrap(), "<li>jack</li><li>rose</li>");
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod value;

use std::fmt;
use std::str::FromStr;

pub use ast::{Expr, Node};
pub use error::{Error, ErrorKind, Result};
pub use eval::{CompareOp, Evaluator};
pub use value::{Context, Function, Kwargs, Value};

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    root: Node,
}

impl Template {
    /// Compiles `source`, failing with [`Error::Syntax`] on malformed markup.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = parser::Compiler::new(&source).compile()?;
        Ok(Self { source, root })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn render(&self, context: &Context) -> Result<String> {
        Evaluator::new(context).render(&self.root)
    }

    /// Like [`Template::render`], writing into an existing buffer.
    pub fn render_to<W: fmt::Write + ?Sized>(&self, context: &Context, out: &mut W) -> Result<()> {
        Evaluator::new(context).render_to(&self.root, out)
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Template::new(source)
    }
}

/// Compiles and renders in one step.
pub fn render(source: &str, context: &Context) -> Result<String> {
    Template::new(source)?.render(context)
}
