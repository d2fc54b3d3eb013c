use alloc::string::String;
use core::iter::FusedIterator;
use core::slice;

use chrono::{DateTime, Utc};

use crate::{Result, ValueKind};

/// A forward-only cursor over a value stream.
///
/// [`next`](ValueReader::next) moves to the next value of the current
/// scope and returns its kind, or `None` once the scope is exhausted.
/// Containers are entered with [`step_in`](ValueReader::step_in); calling
/// [`step_out`](ValueReader::step_out) skips whatever is left of the
/// container.
///
/// Scalar accessors apply to the current value. `string_value` accepts
/// both `STRING` and `SYMBOL`.
pub trait ValueReader {
    /// Advances to the next value in the current scope.
    fn next(&mut self) -> Result<Option<ValueKind>>;

    /// Kind of the current value, if positioned on one.
    fn kind(&self) -> Option<ValueKind>;

    /// Field name of the current value inside a struct.
    fn field_name(&self) -> Option<&str>;

    /// Type annotations of the current value, in wire order.
    fn type_annotations(&self) -> TypeAnnotations<'_>;

    fn step_in(&mut self) -> Result<()>;

    fn step_out(&mut self) -> Result<()>;

    /// Number of entered containers.
    fn depth(&self) -> usize;

    fn bool_value(&self) -> Result<bool>;

    fn int_value(&self) -> Result<i64>;

    fn float_value(&self) -> Result<f64>;

    fn string_value(&self) -> Result<&str>;

    fn blob_value(&self) -> Result<&[u8]>;

    fn timestamp_value(&self) -> Result<DateTime<Utc>>;

    /// Whether the current value is `NULL`.
    #[inline]
    fn is_null(&self) -> bool {
        self.kind() == Some(ValueKind::Null)
    }
}

/// Iterator over the annotations of the current value.
///
/// Created by [`ValueReader::type_annotations`]. It borrows the reader, so
/// it cannot outlive a call to `next`.
#[derive(Debug, Clone)]
pub struct TypeAnnotations<'a> {
    inner: slice::Iter<'a, String>,
}

impl<'a> TypeAnnotations<'a> {
    #[inline]
    pub fn new(annotations: &'a [String]) -> Self {
        Self {
            inner: annotations.iter(),
        }
    }

    #[inline]
    pub fn empty() -> Self {
        Self::new(&[])
    }
}

impl<'a> Iterator for TypeAnnotations<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(String::as_str)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TypeAnnotations<'_> {}

impl FusedIterator for TypeAnnotations<'_> {}
