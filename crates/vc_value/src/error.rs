use alloc::string::String;
use thiserror::Error;

use crate::ValueKind;

/// Errors raised by value readers and writers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValueError {
    /// The underlying sink failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    /// The input ended in the middle of a value.
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },
    /// The binary stream does not start with the expected magic.
    #[error("input is not a binary value stream")]
    BadMagic,
    /// An unknown type tag was found.
    #[error("invalid type tag 0x{tag:02x} at byte {offset}")]
    InvalidTag { tag: u8, offset: usize },
    /// A string payload is not valid UTF-8.
    #[error("invalid utf-8 in string payload at byte {offset}")]
    InvalidUtf8 { offset: usize },
    /// A symbol reference points past the symbol table.
    #[error("unknown symbol id {id}")]
    UnknownSymbol { id: u64 },
    /// A variable length integer does not fit in 64 bits.
    #[error("variable length integer overflow at byte {offset}")]
    VarintOverflow { offset: usize },
    /// A timestamp payload is out of range.
    #[error("timestamp out of range")]
    InvalidTimestamp,
    /// The text encoding could not be parsed.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    /// A scalar accessor was called on a value of another kind.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    /// The cursor was used out of order, e.g. a field without a name.
    #[error("invalid cursor state: {0}")]
    InvalidState(&'static str),
    /// Containers nest deeper than [`MAX_DEPTH`](crate::MAX_DEPTH).
    #[error("containers nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

impl ValueError {
    #[inline]
    pub(crate) fn mismatch(expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    #[inline]
    pub(crate) fn too_deep() -> Self {
        Self::TooDeep { limit: crate::MAX_DEPTH }
    }
}
