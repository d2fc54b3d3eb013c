use alloc::string::{String, ToString};
use alloc::vec::Vec;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use crate::{Element, Result, Value, ValueError};

/// Parses every top-level value of `text`.
///
/// # Examples
///
/// ```
/// use vc_value::{Value, text::parse};
///
/// let elements = parse("Point::{x: 1, y: -2} [a, 'b c']").unwrap();
/// assert_eq!(elements.len(), 2);
/// assert_eq!(elements[0].annotations(), ["Point"]);
/// assert_eq!(elements[0].field("y").unwrap().value(), &Value::Int(-2));
/// ```
pub fn parse(text: &str) -> Result<Vec<Element>> {
    let mut parser = Parser { text, pos: 0, depth: 0 };
    let mut elements = Vec::new();
    loop {
        parser.skip_trivia();
        if parser.at_end() {
            return Ok(elements);
        }
        elements.push(parser.element()?);
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ValueError {
        let before = &self.text[..pos.min(self.text.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before, |newline| &before[newline + 1..])
            .chars()
            .count()
            + 1;
        ValueError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ValueError {
        self.error_at(self.pos, message)
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                let line_len = trimmed.find('\n').unwrap_or(trimmed.len());
                self.pos += line_len;
            } else {
                return;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_trivia();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(alloc::format!("expected `{expected}`, found `{c}`"))),
            None => Err(self.error(alloc::format!("expected `{expected}`, found end of input"))),
        }
    }

    fn identifier(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn quoted(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, "unterminated quoted text")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escape_at = self.pos - 1;
                    let c = match self.bump() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some(c @ ('\\' | '"' | '\'' | '/')) => c,
                        Some('x') => self.hex_escape(2, escape_at)?,
                        Some('u') => self.hex_escape(4, escape_at)?,
                        _ => return Err(self.error_at(escape_at, "invalid escape sequence")),
                    };
                    out.push(c);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, escape_at: usize) -> Result<char> {
        let hex = self
            .rest()
            .get(..digits)
            .ok_or_else(|| self.error_at(escape_at, "truncated escape sequence"))?;
        let code = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error_at(escape_at, "invalid escape sequence"))?;
        self.pos += digits;
        Ok(code)
    }

    /// A bare or quoted symbol used as a field name or annotation.
    fn symbol_text(&mut self) -> Result<Option<String>> {
        match self.peek() {
            Some('\'') => self.quoted('\'').map(Some),
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                Ok(Some(self.identifier().to_string()))
            }
            _ => Ok(None),
        }
    }

    fn element(&mut self) -> Result<Element> {
        let mut annotations = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(text) = self.symbol_text()? else {
                break;
            };
            let quoted = self.text[start..].starts_with('\'');
            self.skip_trivia();
            if self.rest().starts_with("::") {
                self.pos += 2;
                annotations.push(text);
                continue;
            }
            let value = match text.as_str() {
                "null" if !quoted => Value::Null,
                "true" if !quoted => Value::Bool(true),
                "false" if !quoted => Value::Bool(false),
                "nan" if !quoted => Value::Float(f64::NAN),
                _ => Value::Symbol(text),
            };
            return Ok(Element::annotated(annotations, value));
        }

        let value = self.value()?;
        Ok(Element::annotated(annotations, value))
    }

    fn value(&mut self) -> Result<Value> {
        let rest = self.rest();
        if rest.starts_with("{{") {
            return self.blob();
        }
        if rest.starts_with("+inf") {
            self.pos += 4;
            return Ok(Value::Float(f64::INFINITY));
        }
        if rest.starts_with("-inf") {
            self.pos += 4;
            return Ok(Value::Float(f64::NEG_INFINITY));
        }
        match self.peek() {
            Some('{') => self.nested(Self::structure),
            Some('[') => self.nested(Self::list),
            Some('"') => self.quoted('"').map(Value::String),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(c) => Err(self.error(alloc::format!("unexpected character `{c}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(&mut self, container: fn(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= crate::MAX_DEPTH {
            return Err(ValueError::too_deep());
        }
        self.depth += 1;
        let value = container(self);
        self.depth -= 1;
        value
    }

    fn blob(&mut self) -> Result<Value> {
        let start = self.pos;
        self.pos += 2;
        let rest = self.rest();
        let end = rest
            .find("}}")
            .ok_or_else(|| self.error_at(start, "unterminated blob"))?;
        let encoded: String = rest[..end].chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|error| self.error_at(start, alloc::format!("invalid base64: {error}")))?;
        self.pos += end + 2;
        Ok(Value::Blob(bytes))
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | ':')))
            .unwrap_or(rest.len());
        let token = &rest[..len];
        self.pos += len;

        let is_timestamp = token.len() >= 10 && token.as_bytes().get(4) == Some(&b'-');
        if is_timestamp {
            return DateTime::parse_from_rfc3339(token)
                .map(|value| Value::Timestamp(value.with_timezone(&Utc)))
                .map_err(|error| self.error_at(start, alloc::format!("invalid timestamp: {error}")));
        }
        if token.contains(['.', 'e', 'E']) {
            return token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error_at(start, alloc::format!("invalid float `{token}`")));
        }
        token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| self.error_at(start, alloc::format!("invalid integer `{token}`")))
    }

    fn structure(&mut self) -> Result<Value> {
        self.bump();
        let mut fields = Vec::new();
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Struct(fields));
        }
        loop {
            self.skip_trivia();
            let name = match self.peek() {
                Some('"') => self.quoted('"')?,
                _ => self
                    .symbol_text()?
                    .ok_or_else(|| self.error("expected a field name"))?,
            };
            self.expect(':')?;
            let element = self.element()?;
            fields.push((name, element));

            self.skip_trivia();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(Value::Struct(fields)),
                _ => return Err(self.error_at(self.pos.saturating_sub(1), "expected `,` or `}`")),
            }
        }
    }

    fn list(&mut self) -> Result<Value> {
        self.bump();
        let mut members = Vec::new();
        self.skip_trivia();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::List(members));
        }
        loop {
            members.push(self.element()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(Value::List(members)),
                _ => return Err(self.error_at(self.pos.saturating_sub(1), "expected `,` or `]`")),
            }
        }
    }
}
