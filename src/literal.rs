//! Safe literal parsing.
//!
//! Accepts numbers, quoted strings, booleans, null, and `[...]`, `(...)`
//! and `{...}` aggregates built from those. Nothing is ever evaluated: any
//! input outside that grammar is simply rejected.

use crate::value::Value;
use std::collections::BTreeMap;

/// Deepest aggregate nesting accepted; anything deeper is treated as a name.
pub const MAX_NESTING: usize = 64;

/// Parses `input` as a single literal, or returns `None`.
pub fn parse_literal(input: &str) -> Option<Value> {
    let mut parser = LiteralParser::new(input);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.is_done() {
        Some(value)
    } else {
        None
    }
}

struct LiteralParser<'a> {
    input: &'a str,
    cursor: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            depth: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn is_done(&self) -> bool {
        self.cursor >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        self.advance(rest.len() - rest.trim_start().len());
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.advance(c.len_utf8());
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = self.parse_item();
        self.depth -= 1;
        value
    }

    fn parse_item(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            '\'' | '"' => self.parse_string().map(Value::String),
            '[' => {
                self.advance(1);
                self.parse_sequence(']').map(|(items, _)| Value::Array(items))
            }
            '(' => {
                self.advance(1);
                let (mut items, trailing_comma) = self.parse_sequence(')')?;
                // `(x)` is a parenthesised value, `(x,)` a one-element tuple.
                if items.len() == 1 && !trailing_comma {
                    items.pop()
                } else {
                    Some(Value::Array(items))
                }
            }
            '{' => {
                self.advance(1);
                self.parse_map()
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            _ => self.parse_keyword(),
        }
    }

    /// Items up to `close`; also reports whether the last item had a trailing comma.
    fn parse_sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.eat(close) {
                return Some((items, trailing_comma));
            }
            items.push(self.parse_value()?);
            trailing_comma = self.eat(',');
            if !trailing_comma {
                return self.eat(close).then_some((items, false));
            }
        }
    }

    fn parse_map(&mut self) -> Option<Value> {
        let mut map = BTreeMap::new();
        loop {
            if self.eat('}') {
                return Some(Value::Map(map));
            }
            let key = match self.parse_value()? {
                Value::String(s) => s,
                k @ (Value::Int(_) | Value::Float(_) | Value::Bool(_)) => k.to_string(),
                _ => return None,
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            map.insert(key, value);
            if !self.eat(',') {
                return self.eat('}').then_some(Value::Map(map));
            }
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.advance(1);
        let mut out = String::new();
        let mut chars = self.remaining().char_indices();
        while let Some((idx, c)) = chars.next() {
            if c == quote {
                self.advance(idx + 1);
                return Some(out);
            }
            if c == '\\' {
                let (_, esc) = chars.next()?;
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    '\\' | '\'' | '"' => out.push(esc),
                    // Unknown escapes keep the backslash.
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            } else {
                out.push(c);
            }
        }
        // Unterminated string.
        None
    }

    fn parse_number(&mut self) -> Option<Value> {
        let rest = self.remaining();
        let len = rest
            .char_indices()
            .take_while(|&(i, c)| {
                c.is_ascii_digit()
                    || c == '.'
                    || c == '_'
                    || c == 'e'
                    || c == 'E'
                    || ((c == '-' || c == '+')
                        && (i == 0 || matches!(rest.as_bytes()[i - 1], b'e' | b'E')))
            })
            .count();
        let text = &rest[..len];
        if text.starts_with('_') || text.ends_with('_') {
            return None;
        }
        let digits = text.replace('_', "");

        let value = if let Ok(i) = digits.parse::<i64>() {
            Value::Int(i)
        } else if digits.chars().any(|c| c.is_ascii_digit()) {
            Value::Float(digits.parse::<f64>().ok()?)
        } else {
            return None;
        };
        self.advance(len);
        Some(value)
    }

    fn parse_keyword(&mut self) -> Option<Value> {
        let rest = self.remaining();
        let len = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum::<usize>();
        let value = match &rest[..len] {
            "True" | "true" => Value::Bool(true),
            "False" | "false" => Value::Bool(false),
            "None" | "null" => Value::Null,
            _ => return None,
        };
        self.advance(len);
        Some(value)
    }
}
