use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use chrono::{DateTime, Utc};

use crate::ValueKind;

/// An owned value of the abstract data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    /// Fields in wire order.
    Struct(Vec<(String, Element)>),
    List(Vec<Element>),
}

impl Value {
    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Blob(_) => ValueKind::Blob,
            Self::Struct(_) => ValueKind::Struct,
            Self::List(_) => ValueKind::List,
        }
    }
}

/// A [`Value`] together with its type annotations.
///
/// Elements are the in-memory form of a value stream. They back the
/// rewindable [`ElementReader`](crate::tree::ElementReader) and are what the
/// text parser produces.
///
/// # Examples
///
/// ```
/// use vc_value::{Element, Value, ValueKind};
///
/// let circle = Element::new(Value::Struct(vec![
///     ("radius".into(), Element::new(Value::Float(1.5))),
/// ]))
/// .with_annotation("Circle");
///
/// assert_eq!(circle.kind(), ValueKind::Struct);
/// assert_eq!(circle.annotations(), ["Circle"]);
/// assert_eq!(circle.field("radius").unwrap().value(), &Value::Float(1.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    annotations: Vec<String>,
    value: Value,
}

impl Element {
    /// Creates an element without annotations.
    #[inline]
    pub const fn new(value: Value) -> Self {
        Self {
            annotations: Vec::new(),
            value,
        }
    }

    /// Creates an element with the given annotations.
    #[inline]
    pub const fn annotated(annotations: Vec<String>, value: Value) -> Self {
        Self { annotations, value }
    }

    /// Appends a type annotation.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    #[inline]
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> Value {
        self.value
    }

    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Looks up the first field named `name` of a struct element.
    pub fn field(&self, name: &str) -> Option<&Element> {
        match &self.value {
            Value::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, element)| element),
            _ => None,
        }
    }

    /// Returns the members of a list element.
    pub fn elements(&self) -> Option<&[Element]> {
        match &self.value {
            Value::List(elements) => Some(elements),
            _ => None,
        }
    }
}

impl From<Value> for Element {
    #[inline]
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Element {
    /// Formats the element on a single line using the text encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = crate::text::to_compact_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
