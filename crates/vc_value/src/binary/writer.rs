use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::mem;
use std::io;

use chrono::{DateTime, Utc};
use foldhash::fast::FixedState;
use hashbrown::HashMap;

use super::varint::{write_u64, zigzag};
use super::{MAGIC, tag};
use crate::{ContainerKind, Result, ValueError, ValueWriter};

const SYMBOL_STATE: FixedState = FixedState::with_seed(0x5EED_0F_5E_12A1_1CED);

/// Buffered output is handed to the sink once it grows past this size.
const FLUSH_THRESHOLD: usize = 16 * 1024;

/// Streaming writer for the [binary encoding](super).
///
/// # Examples
///
/// ```
/// use vc_value::ValueWriter;
/// use vc_value::binary::{BinaryWriter, is_binary};
///
/// let mut writer = BinaryWriter::new(Vec::new());
/// writer.write_int(7).unwrap();
/// let bytes = writer.into_inner().unwrap();
/// assert!(is_binary(&bytes));
/// ```
pub struct BinaryWriter<W: io::Write> {
    sink: W,
    buf: Vec<u8>,
    symbols: HashMap<String, u64, FixedState>,
    scopes: Vec<ContainerKind>,
    field_name: Option<String>,
    annotations: Vec<String>,
}

impl<W: io::Write> BinaryWriter<W> {
    /// Creates a writer; the magic is emitted immediately.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: MAGIC.to_vec(),
            symbols: HashMap::with_hasher(SYMBOL_STATE),
            scopes: Vec::new(),
            field_name: None,
            annotations: Vec::new(),
        }
    }

    /// Finishes the stream and returns the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.sink)
    }

    fn symbol_token(&mut self, text: &str) -> u64 {
        if let Some(&id) = self.symbols.get(text) {
            write_u64(&mut self.buf, id << 1);
            return id;
        }
        let id = self.symbols.len() as u64;
        self.symbols.insert(text.to_string(), id);
        write_u64(&mut self.buf, ((text.len() as u64) << 1) | 1);
        self.buf.extend_from_slice(text.as_bytes());
        id
    }

    /// Emits annotations, the tag and the field name of the next value.
    fn begin_value(&mut self, tag: u8) -> Result<()> {
        let in_struct = self.scopes.last() == Some(&ContainerKind::Struct);
        let field_name = self.field_name.take();
        if in_struct && field_name.is_none() {
            return Err(ValueError::InvalidState(
                "struct member written without a field name",
            ));
        }

        let annotations = mem::take(&mut self.annotations);
        if !annotations.is_empty() {
            self.buf.push(tag::ANNOTATED);
            write_u64(&mut self.buf, annotations.len() as u64);
            for annotation in &annotations {
                self.symbol_token(annotation);
            }
        }

        self.buf.push(tag);
        if let Some(name) = field_name.filter(|_| in_struct) {
            self.symbol_token(&name);
        }
        Ok(())
    }

    fn end_value(&mut self) -> Result<()> {
        if self.buf.len() >= FLUSH_THRESHOLD {
            self.sink.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    fn write_bytes(&mut self, tag: u8, bytes: &[u8]) -> Result<()> {
        self.begin_value(tag)?;
        write_u64(&mut self.buf, bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self.end_value()
    }
}

impl<W: io::Write> ValueWriter for BinaryWriter<W> {
    #[inline]
    fn set_field_name(&mut self, name: &str) {
        self.field_name = Some(name.to_string());
    }

    #[inline]
    fn add_type_annotation(&mut self, annotation: &str) {
        self.annotations.push(annotation.to_string());
    }

    fn write_null(&mut self) -> Result<()> {
        self.begin_value(tag::NULL)?;
        self.end_value()
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.begin_value(if value { tag::TRUE } else { tag::FALSE })?;
        self.end_value()
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.begin_value(tag::INT)?;
        write_u64(&mut self.buf, zigzag(value));
        self.end_value()
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.begin_value(tag::FLOAT)?;
        self.buf.extend_from_slice(&value.to_le_bytes());
        self.end_value()
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(tag::STRING, value.as_bytes())
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.begin_value(tag::SYMBOL)?;
        self.symbol_token(value);
        self.end_value()
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.write_bytes(tag::BLOB, value)
    }

    fn write_timestamp(&mut self, value: &DateTime<Utc>) -> Result<()> {
        self.begin_value(tag::TIMESTAMP)?;
        write_u64(&mut self.buf, zigzag(value.timestamp()));
        write_u64(&mut self.buf, u64::from(value.timestamp_subsec_nanos()));
        self.end_value()
    }

    fn step_in(&mut self, kind: ContainerKind) -> Result<()> {
        let tag = match kind {
            ContainerKind::Struct => tag::STRUCT,
            ContainerKind::List => tag::LIST,
        };
        self.begin_value(tag)?;
        self.scopes.push(kind);
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        if self.scopes.pop().is_none() {
            return Err(ValueError::InvalidState("step_out without an open container"));
        }
        self.field_name = None;
        self.annotations.clear();
        self.buf.push(tag::END);
        self.end_value()
    }

    #[inline]
    fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn finish(&mut self) -> Result<()> {
        if !self.scopes.is_empty() {
            return Err(ValueError::InvalidState("finish with open containers"));
        }
        self.sink.write_all(&self.buf)?;
        self.buf.clear();
        self.sink.flush()?;
        Ok(())
    }
}
