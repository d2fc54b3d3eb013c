use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;
use core::mem;
use std::io;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};

use super::is_identifier;
use crate::{ContainerKind, Result, ValueError, ValueWriter};

struct Scope {
    kind: ContainerKind,
    members: usize,
}

/// Writer for the [text encoding](super).
///
/// The pretty layout puts every member on its own line, indented by two
/// spaces per level. The compact layout keeps a value on one line.
///
/// # Examples
///
/// ```
/// use vc_value::{ContainerKind, ValueWriter};
/// use vc_value::text::TextWriter;
///
/// let mut writer = TextWriter::compact(Vec::new());
/// writer.add_type_annotation("Point");
/// writer.step_in(ContainerKind::Struct).unwrap();
/// writer.set_field_name("x");
/// writer.write_int(1).unwrap();
/// writer.step_out().unwrap();
///
/// let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(text, "Point::{x: 1}");
/// ```
pub struct TextWriter<W: io::Write> {
    sink: W,
    out: String,
    pretty: bool,
    scopes: Vec<Scope>,
    top_level: usize,
    field_name: Option<String>,
    annotations: Vec<String>,
}

impl<W: io::Write> TextWriter<W> {
    /// One member per line.
    pub fn pretty(sink: W) -> Self {
        Self::with_layout(sink, true)
    }

    /// Single line output.
    pub fn compact(sink: W) -> Self {
        Self::with_layout(sink, false)
    }

    fn with_layout(sink: W, pretty: bool) -> Self {
        Self {
            sink,
            out: String::new(),
            pretty,
            scopes: Vec::new(),
            top_level: 0,
            field_name: None,
            annotations: Vec::new(),
        }
    }

    /// Finishes the output and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.sink)
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn begin_value(&mut self) -> Result<()> {
        let depth = self.scopes.len();
        let field_name = self.field_name.take();
        let (in_struct, first) = match self.scopes.last_mut() {
            Some(scope) => {
                scope.members += 1;
                (scope.kind == ContainerKind::Struct, scope.members == 1)
            }
            None => {
                self.top_level += 1;
                (false, self.top_level == 1)
            }
        };

        if depth == 0 {
            if !first {
                self.out.push(if self.pretty { '\n' } else { ' ' });
            }
        } else {
            if !first {
                self.out.push(',');
            }
            if self.pretty {
                self.newline(depth);
            } else if !first {
                self.out.push(' ');
            }
        }

        if in_struct {
            let name = field_name.ok_or(ValueError::InvalidState(
                "struct member written without a field name",
            ))?;
            write_symbol_text(&mut self.out, &name);
            self.out.push_str(": ");
        }
        for annotation in mem::take(&mut self.annotations) {
            write_symbol_text(&mut self.out, &annotation);
            self.out.push_str("::");
        }
        Ok(())
    }

    fn scalar(&mut self, text: &str) -> Result<()> {
        self.begin_value()?;
        self.out.push_str(text);
        Ok(())
    }
}

fn write_escaped(out: &mut String, text: &str, quote: char) {
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() && (c as u32) < 0x100 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

fn write_symbol_text(out: &mut String, text: &str) {
    if is_identifier(text) {
        out.push_str(text);
    } else {
        write_escaped(out, text, '\'');
    }
}

fn float_text(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "+inf" } else { "-inf" };
        text.to_string()
    } else {
        alloc::format!("{value:e}")
    }
}

impl<W: io::Write> ValueWriter for TextWriter<W> {
    #[inline]
    fn set_field_name(&mut self, name: &str) {
        self.field_name = Some(name.to_string());
    }

    #[inline]
    fn add_type_annotation(&mut self, annotation: &str) {
        self.annotations.push(annotation.to_string());
    }

    fn write_null(&mut self) -> Result<()> {
        self.scalar("null")
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.scalar(if value { "true" } else { "false" })
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.begin_value()?;
        let _ = write!(self.out, "{value}");
        Ok(())
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.scalar(&float_text(value))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.begin_value()?;
        write_escaped(&mut self.out, value, '"');
        Ok(())
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.begin_value()?;
        write_symbol_text(&mut self.out, value);
        Ok(())
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.begin_value()?;
        self.out.push_str("{{");
        STANDARD.encode_string(value, &mut self.out);
        self.out.push_str("}}");
        Ok(())
    }

    fn write_timestamp(&mut self, value: &DateTime<Utc>) -> Result<()> {
        self.scalar(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn step_in(&mut self, kind: ContainerKind) -> Result<()> {
        self.begin_value()?;
        self.out.push(match kind {
            ContainerKind::Struct => '{',
            ContainerKind::List => '[',
        });
        self.scopes.push(Scope { kind, members: 0 });
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        let scope = self
            .scopes
            .pop()
            .ok_or(ValueError::InvalidState("step_out without an open container"))?;
        self.field_name = None;
        self.annotations.clear();
        if self.pretty && scope.members > 0 {
            self.newline(self.scopes.len());
        }
        self.out.push(match scope.kind {
            ContainerKind::Struct => '}',
            ContainerKind::List => ']',
        });
        Ok(())
    }

    #[inline]
    fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn finish(&mut self) -> Result<()> {
        if !self.scopes.is_empty() {
            return Err(ValueError::InvalidState("finish with open containers"));
        }
        if self.pretty && !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.sink.write_all(self.out.as_bytes())?;
        self.out.clear();
        self.sink.flush()?;
        Ok(())
    }
}
