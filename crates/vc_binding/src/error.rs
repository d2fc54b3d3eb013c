use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use thiserror::Error;
use vc_value::{ValueError, ValueKind};

/// Boxed cause carried by a [`SerializationError`].
pub type BoxedError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// What went wrong, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The wire value has the wrong kind for the binding reading it.
    Shape,
    /// A back-reference names an object that was never registered.
    UnknownReference,
    /// A bean has no default constructor and no usable parameter mapping.
    ConstructorResolution,
    /// A constructor or a property setter failed.
    Construction,
    /// Missing, unknown or disallowed polymorphic subtype.
    Polymorphism,
    /// The type cannot be bound at all.
    Unsupported,
    /// There is no root value to read.
    EmptyInput,
    /// The value layer rejected the stream.
    Value,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shape => "shape",
            Self::UnknownReference => "unknown reference",
            Self::ConstructorResolution => "constructor resolution",
            Self::Construction => "construction",
            Self::Polymorphism => "polymorphism",
            Self::Unsupported => "unsupported",
            Self::EmptyInput => "empty input",
            Self::Value => "value",
        })
    }
}

/// The single error type raised by bindings and the serializer.
///
/// Every fatal condition aborts the whole read or write call. The message
/// is meant for humans; match on [`kind`](SerializationError::kind)
/// instead.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SerializationError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl SerializationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefixes the message with where the error happened.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = alloc::format!("{context}: {}", self.message);
        self
    }

    pub(crate) fn shape(expected: &str, found: Option<ValueKind>, type_name: &str) -> Self {
        let found = found.map_or("end of scope", ValueKind::name);
        Self::new(
            ErrorKind::Shape,
            alloc::format!("expected {expected} for {type_name}, found {found}"),
        )
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    pub(crate) fn polymorphism(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Polymorphism, message)
    }

    /// A binding handed back a value of an unexpected type.
    pub(crate) fn type_mismatch(expected: &str) -> Self {
        Self::new(
            ErrorKind::Shape,
            alloc::format!("binding produced a value that is not a `{expected}`"),
        )
    }

    /// `init` has not run on this binding.
    pub(crate) fn uninitialized(type_name: &str) -> Self {
        Self::unsupported(alloc::format!("binding for `{type_name}` used before init"))
    }
}

impl From<ValueError> for SerializationError {
    fn from(error: ValueError) -> Self {
        Self::new(ErrorKind::Value, alloc::format!("{error}")).with_source(error)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(error: std::io::Error) -> Self {
        ValueError::from(error).into()
    }
}

#[cfg(test)]
mod tests {
    use core::error::Error;

    use vc_value::{ValueError, ValueKind};

    use super::{ErrorKind, SerializationError};

    #[test]
    fn context_prefixes_message() {
        let error = SerializationError::shape("STRUCT", Some(ValueKind::Symbol), "Point")
            .context("property `origin` of Shape");
        assert_eq!(error.kind(), ErrorKind::Shape);
        assert_eq!(
            error.to_string(),
            "property `origin` of Shape: expected STRUCT for Point, found SYMBOL"
        );
    }

    #[test]
    fn value_errors_keep_their_source() {
        let error = SerializationError::from(ValueError::BadMagic);
        assert_eq!(error.kind(), ErrorKind::Value);
        assert!(error.source().is_some());
    }
}
