use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::ops::Range;
use core::str;

use chrono::{DateTime, Utc};

use super::varint::{read_u64, unzigzag};
use super::{MAGIC, tag};
use crate::{ContainerKind, Result, TypeAnnotations, ValueError, ValueKind, ValueReader};

#[derive(Debug, Clone)]
enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Range<usize>),
    Symbol(usize),
    Timestamp(DateTime<Utc>),
    Blob(Range<usize>),
    Container(ContainerKind),
}

impl Payload {
    fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Blob(_) => ValueKind::Blob,
            Self::Container(kind) => (*kind).into(),
        }
    }
}

/// Cursor over a [binary](super) stream held in memory.
///
/// Scalars are decoded when the cursor reaches them. Container bodies are
/// only walked when entered or skipped, skipping still registers the
/// symbols they define so later references resolve.
pub struct BinaryReader<'a> {
    input: &'a [u8],
    pos: usize,
    symbols: Vec<String>,
    scopes: Vec<ContainerKind>,
    current: Option<Payload>,
    /// The current value is a container whose body has not been consumed.
    body_pending: bool,
    field_name: Option<usize>,
    annotations: Vec<String>,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader, checking the stream magic.
    pub fn new(input: &'a [u8]) -> Result<Self> {
        if !input.starts_with(MAGIC) {
            return Err(ValueError::BadMagic);
        }
        Ok(Self {
            input,
            pos: MAGIC.len(),
            symbols: Vec::new(),
            scopes: Vec::new(),
            current: None,
            body_pending: false,
            field_name: None,
            annotations: Vec::new(),
        })
    }

    /// Byte offset of the cursor.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn eof(&self) -> ValueError {
        ValueError::UnexpectedEof { offset: self.pos }
    }

    fn peek(&self) -> Result<u8> {
        self.input.get(self.pos).copied().ok_or_else(|| self.eof())
    }

    fn byte(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<Range<usize>> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| self.eof())?;
        let range = self.pos..end;
        self.pos = end;
        Ok(range)
    }

    fn varint(&mut self) -> Result<u64> {
        let offset = self.pos;
        match read_u64(self.input, &mut self.pos) {
            Some(Ok(value)) => Ok(value),
            Some(Err(())) => Err(ValueError::VarintOverflow { offset }),
            None => Err(ValueError::UnexpectedEof { offset: self.input.len() }),
        }
    }

    fn length(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.varint()?;
        usize::try_from(len).map_err(|_| ValueError::VarintOverflow { offset })
    }

    fn utf8(&self, range: Range<usize>) -> Result<&'a str> {
        let input: &'a [u8] = self.input;
        str::from_utf8(&input[range.clone()])
            .map_err(|_| ValueError::InvalidUtf8 { offset: range.start })
    }

    /// Reads a symbol token, defining a new symbol when needed.
    fn symbol_token(&mut self) -> Result<usize> {
        let token = self.varint()?;
        if token & 1 == 1 {
            let len = usize::try_from(token >> 1)
                .map_err(|_| ValueError::VarintOverflow { offset: self.pos })?;
            let range = self.take(len)?;
            let text = self.utf8(range)?;
            self.symbols.push(text.to_string());
            Ok(self.symbols.len() - 1)
        } else {
            let id = token >> 1;
            usize::try_from(id)
                .ok()
                .filter(|id| *id < self.symbols.len())
                .ok_or(ValueError::UnknownSymbol { id })
        }
    }

    fn payload(&mut self, tag: u8, offset: usize) -> Result<Payload> {
        Ok(match tag {
            tag::NULL => Payload::Null,
            tag::FALSE => Payload::Bool(false),
            tag::TRUE => Payload::Bool(true),
            tag::INT => Payload::Int(unzigzag(self.varint()?)),
            tag::FLOAT => {
                let range = self.take(8)?;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&self.input[range]);
                Payload::Float(f64::from_le_bytes(bytes))
            }
            tag::STRING => {
                let len = self.length()?;
                let range = self.take(len)?;
                self.utf8(range.clone())?;
                Payload::String(range)
            }
            tag::SYMBOL => Payload::Symbol(self.symbol_token()?),
            tag::TIMESTAMP => {
                let secs = unzigzag(self.varint()?);
                let nanos = u32::try_from(self.varint()?)
                    .map_err(|_| ValueError::InvalidTimestamp)?;
                let value =
                    DateTime::from_timestamp(secs, nanos).ok_or(ValueError::InvalidTimestamp)?;
                Payload::Timestamp(value)
            }
            tag::BLOB => {
                let len = self.length()?;
                Payload::Blob(self.take(len)?)
            }
            tag::STRUCT => Payload::Container(ContainerKind::Struct),
            tag::LIST => Payload::Container(ContainerKind::List),
            tag => return Err(ValueError::InvalidTag { tag, offset }),
        })
    }

    /// Consumes members up to and including the `END` of a container.
    fn skip_body(&mut self, kind: ContainerKind, depth: usize) -> Result<()> {
        if depth > crate::MAX_DEPTH {
            return Err(ValueError::too_deep());
        }
        loop {
            let offset = self.pos;
            let mut tag = self.byte()?;
            if tag == tag::END {
                return Ok(());
            }
            if tag == tag::ANNOTATED {
                let count = self.varint()?;
                for _ in 0..count {
                    self.symbol_token()?;
                }
                tag = self.byte()?;
            }
            if kind == ContainerKind::Struct {
                self.symbol_token()?;
            }
            if let Payload::Container(inner) = self.payload(tag, offset)? {
                self.skip_body(inner, depth + 1)?;
            }
        }
    }

    fn finish_current(&mut self) -> Result<()> {
        if self.body_pending {
            self.body_pending = false;
            if let Some(Payload::Container(kind)) = self.current {
                self.skip_body(kind, self.scopes.len() + 1)?;
            }
        }
        self.current = None;
        self.field_name = None;
        self.annotations.clear();
        Ok(())
    }

    fn mismatch(&self, expected: ValueKind) -> ValueError {
        match &self.current {
            Some(payload) => ValueError::mismatch(expected, payload.kind()),
            None => ValueError::InvalidState("no current value"),
        }
    }
}

impl ValueReader for BinaryReader<'_> {
    fn next(&mut self) -> Result<Option<ValueKind>> {
        self.finish_current()?;

        match self.scopes.last() {
            None if self.pos >= self.input.len() => return Ok(None),
            Some(_) if self.peek()? == tag::END => return Ok(None),
            _ => {}
        }

        let offset = self.pos;
        let mut tag = self.byte()?;
        if tag == tag::ANNOTATED {
            let count = self.varint()?;
            for _ in 0..count {
                let id = self.symbol_token()?;
                let annotation = self.symbols[id].clone();
                self.annotations.push(annotation);
            }
            tag = self.byte()?;
        }
        if self.scopes.last() == Some(&ContainerKind::Struct) {
            self.field_name = Some(self.symbol_token()?);
        }

        let payload = self.payload(tag, offset)?;
        let kind = payload.kind();
        self.body_pending = matches!(payload, Payload::Container(_));
        self.current = Some(payload);
        Ok(Some(kind))
    }

    #[inline]
    fn kind(&self) -> Option<ValueKind> {
        self.current.as_ref().map(Payload::kind)
    }

    fn field_name(&self) -> Option<&str> {
        self.field_name
            .and_then(|id| self.symbols.get(id))
            .map(String::as_str)
    }

    #[inline]
    fn type_annotations(&self) -> TypeAnnotations<'_> {
        TypeAnnotations::new(&self.annotations)
    }

    fn step_in(&mut self) -> Result<()> {
        match self.current {
            Some(Payload::Container(_)) if self.scopes.len() >= crate::MAX_DEPTH => {
                Err(ValueError::too_deep())
            }
            Some(Payload::Container(kind)) if self.body_pending => {
                self.body_pending = false;
                self.current = None;
                self.field_name = None;
                self.annotations.clear();
                self.scopes.push(kind);
                Ok(())
            }
            _ => Err(ValueError::InvalidState("step_in outside a container value")),
        }
    }

    fn step_out(&mut self) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(ValueError::InvalidState("step_out at top level"));
        }
        while self.next()?.is_some() {}
        // `next` stopped in front of the closing tag.
        self.pos += 1;
        self.scopes.pop();
        Ok(())
    }

    #[inline]
    fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn bool_value(&self) -> Result<bool> {
        match &self.current {
            Some(Payload::Bool(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Bool)),
        }
    }

    fn int_value(&self) -> Result<i64> {
        match &self.current {
            Some(Payload::Int(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Int)),
        }
    }

    fn float_value(&self) -> Result<f64> {
        match &self.current {
            Some(Payload::Float(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Float)),
        }
    }

    fn string_value(&self) -> Result<&str> {
        match &self.current {
            Some(Payload::String(range)) => self.utf8(range.clone()),
            Some(Payload::Symbol(id)) => Ok(&self.symbols[*id]),
            _ => Err(self.mismatch(ValueKind::String)),
        }
    }

    fn blob_value(&self) -> Result<&[u8]> {
        match &self.current {
            Some(Payload::Blob(range)) => Ok(&self.input[range.clone()]),
            _ => Err(self.mismatch(ValueKind::Blob)),
        }
    }

    fn timestamp_value(&self) -> Result<DateTime<Utc>> {
        match &self.current {
            Some(Payload::Timestamp(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Timestamp)),
        }
    }
}
