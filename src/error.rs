//! Error types for compiling and rendering templates.

use thiserror::Error;

/// Everything that can go wrong while compiling or rendering a template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed or unrecognised markup, raised while compiling.
    #[error("'{fragment}' seems like invalid syntax ({reason})")]
    Syntax {
        fragment: String,
        reason: &'static str,
    },

    /// A variable path that does not resolve against the render context.
    #[error("Cannot resolve '{name}'.")]
    Context { name: String },

    /// A comparison symbol inside `if` that is not in the operator table.
    #[error("'{symbol}' is an invalid operator.")]
    Operator { symbol: String },

    /// Catch-all render failure (non-callable target, non-iterable loop source, ...).
    #[error("{message}")]
    Template { message: String },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Context,
    Operator,
    Template,
}

impl Error {
    pub fn syntax(fragment: impl Into<String>, reason: &'static str) -> Self {
        Error::Syntax {
            fragment: fragment.into(),
            reason,
        }
    }

    pub fn context(name: impl Into<String>) -> Self {
        Error::Context { name: name.into() }
    }

    pub fn operator(symbol: impl Into<String>) -> Self {
        Error::Operator {
            symbol: symbol.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Error::Template {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::Context { .. } => ErrorKind::Context,
            Error::Operator { .. } => ErrorKind::Operator,
            Error::Template { .. } => ErrorKind::Template,
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
