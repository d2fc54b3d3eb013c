//! Per-call state handed to bindings.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use vc_value::{ValueKind, ValueReader, ValueWriter};

use crate::identity::{ObjectIdReader, ObjectIdWriter};
use crate::{BindingProducer, ReadConfiguration, Result, SerializationError, WriteConfiguration};

// -----------------------------------------------------------------------------
// WriteContext

/// State of one write call.
pub struct WriteContext<'a> {
    writer: &'a mut dyn ValueWriter,
    config: &'a WriteConfiguration,
    producer: &'a BindingProducer,
    ids: ObjectIdWriter,
}

impl<'a> WriteContext<'a> {
    pub fn new(
        writer: &'a mut dyn ValueWriter,
        config: &'a WriteConfiguration,
        producer: &'a BindingProducer,
    ) -> Self {
        Self {
            writer,
            config,
            producer,
            ids: ObjectIdWriter::new(),
        }
    }

    #[inline]
    pub fn writer(&mut self) -> &mut dyn ValueWriter {
        &mut *self.writer
    }

    #[inline]
    pub fn config(&self) -> &'a WriteConfiguration {
        self.config
    }

    #[inline]
    pub fn producer(&self) -> &'a BindingProducer {
        self.producer
    }

    #[inline]
    pub fn object_ids(&mut self) -> &mut ObjectIdWriter {
        &mut self.ids
    }
}

// -----------------------------------------------------------------------------
// ReadReport

/// A struct field that no property matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    /// Type path of the bean being read.
    pub type_name: &'static str,
    pub field: String,
}

/// Non-fatal findings of a read call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadReport {
    pub unknown_fields: Vec<UnknownField>,
}

impl ReadReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.unknown_fields.is_empty()
    }
}

// -----------------------------------------------------------------------------
// ReadSession

/// State of one read call, shared by every [`ReadContext`] of the call.
pub struct ReadSession<'s> {
    config: &'s ReadConfiguration,
    producer: &'s BindingProducer,
    ids: ObjectIdReader,
    report: ReadReport,
}

impl<'s> ReadSession<'s> {
    pub fn new(config: &'s ReadConfiguration, producer: &'s BindingProducer) -> Self {
        Self {
            config,
            producer,
            ids: ObjectIdReader::new(),
            report: ReadReport::default(),
        }
    }

    /// Starts reading from `reader`.
    #[inline]
    pub fn context<'r>(&'r mut self, reader: &'r mut dyn ValueReader) -> ReadContext<'r, 's> {
        ReadContext {
            reader,
            session: self,
        }
    }

    #[inline]
    pub fn into_report(self) -> ReadReport {
        self.report
    }
}

// -----------------------------------------------------------------------------
// ReadContext

/// A reader positioned on the value to decode, plus the call state.
///
/// By convention a binding is entered with the reader positioned on its
/// value (`next` already returned its kind) and leaves it there.
pub struct ReadContext<'r, 's> {
    reader: &'r mut dyn ValueReader,
    session: &'r mut ReadSession<'s>,
}

impl<'r, 's> ReadContext<'r, 's> {
    #[inline]
    pub fn reader(&mut self) -> &mut dyn ValueReader {
        &mut *self.reader
    }

    #[inline]
    pub fn config(&self) -> &'s ReadConfiguration {
        self.session.config
    }

    #[inline]
    pub fn producer(&self) -> &'s BindingProducer {
        self.session.producer
    }

    #[inline]
    pub fn object_ids(&mut self) -> &mut ObjectIdReader {
        &mut self.session.ids
    }

    /// Kind of the current value, `None` past the end of the scope.
    #[inline]
    pub fn kind(&self) -> Option<ValueKind> {
        self.reader.kind()
    }

    /// Fails with a shape error unless the current value is `expected`.
    pub fn expect_kind(&self, expected: ValueKind, type_name: &str) -> Result<()> {
        match self.reader.kind() {
            Some(kind) if kind == expected => Ok(()),
            found => Err(SerializationError::shape(expected.name(), found, type_name)),
        }
    }

    /// Records a field of `type_name` that was ignored.
    pub fn report_unknown_field(&mut self, type_name: &'static str, field: &str) {
        log::debug!("ignoring unknown field `{field}` of {type_name}");
        self.session.report.unknown_fields.push(UnknownField {
            type_name,
            field: field.to_string(),
        });
    }

    /// Continues the same call on another reader.
    #[inline]
    pub fn with_reader<'b>(&'b mut self, reader: &'b mut dyn ValueReader) -> ReadContext<'b, 's> {
        ReadContext {
            reader,
            session: &mut *self.session,
        }
    }
}
