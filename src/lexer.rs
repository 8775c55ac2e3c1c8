use regex_lite::Regex;
use std::sync::LazyLock;

pub const VAR_TOKEN_START: &str = "{{";
pub const VAR_TOKEN_END: &str = "}}";
pub const BLOCK_TOKEN_START: &str = "{%";
pub const BLOCK_TOKEN_END: &str = "%}";

/// Matches either delimiter pair, shortest first, across newlines.
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("tag pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Text,
    Variable,
    BlockStart,
    BlockEnd,
}

/// One lexical unit of a template, borrowed from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub raw: &'a str,
    pub kind: FragmentKind,
    /// Inner content with delimiters and surrounding whitespace removed.
    /// Text fragments keep their raw text untouched.
    pub clean: &'a str,
}

impl<'a> Fragment<'a> {
    pub fn new(raw: &'a str) -> Self {
        let inner = |start: &str, end: &str| raw.strip_prefix(start)?.strip_suffix(end);

        if let Some(inner) = inner(VAR_TOKEN_START, VAR_TOKEN_END) {
            return Self {
                raw,
                kind: FragmentKind::Variable,
                clean: inner.trim(),
            };
        }
        if let Some(inner) = inner(BLOCK_TOKEN_START, BLOCK_TOKEN_END) {
            let clean = inner.trim();
            let kind = if clean.starts_with("end") {
                FragmentKind::BlockEnd
            } else {
                FragmentKind::BlockStart
            };
            return Self { raw, kind, clean };
        }

        Self {
            raw,
            kind: FragmentKind::Text,
            clean: raw,
        }
    }
}

/// Splits a template into fragments. Cloning the tokenizer restarts
/// from the clone's position, so the sequence can be replayed.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance_to(&mut self, end: usize) -> &'a str {
        let slice = &self.input[self.cursor..end];
        self.cursor = end;
        slice
    }

    pub fn next_fragment(&mut self) -> Option<Fragment<'a>> {
        if self.remaining().is_empty() {
            return None;
        }

        let raw = match TAG_REGEX.find_at(self.input, self.cursor) {
            // Tag right at the cursor.
            Some(m) if m.start() == self.cursor => self.advance_to(m.end()),
            // Text up to the next tag.
            Some(m) => self.advance_to(m.start()),
            None => self.advance_to(self.input.len()),
        };

        Some(Fragment::new(raw))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_fragment()
    }
}

/// Convenience entry point: `tokenize(src)` is `Tokenizer::new(src)`.
pub fn tokenize(input: &str) -> Tokenizer<'_> {
    Tokenizer::new(input)
}
