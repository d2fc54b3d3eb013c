use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};

use crate::{Element, Result, TypeAnnotations, Value, ValueError, ValueKind, ValueReader};

#[derive(Clone, Copy)]
enum Scope<'a> {
    List(&'a [Element]),
    Struct(&'a [(String, Element)]),
}

impl<'a> Scope<'a> {
    fn len(self) -> usize {
        match self {
            Self::List(members) => members.len(),
            Self::Struct(fields) => fields.len(),
        }
    }

    fn get(self, index: usize) -> Option<(Option<&'a str>, &'a Element)> {
        match self {
            Self::List(members) => members.get(index).map(|member| (None, member)),
            Self::Struct(fields) => fields
                .get(index)
                .map(|(name, field)| (Some(name.as_str()), field)),
        }
    }
}

/// A rewindable [`ValueReader`] over owned [`Element`]s.
///
/// # Examples
///
/// ```
/// use vc_value::{Element, Value, ValueKind, ValueReader};
/// use vc_value::tree::ElementReader;
///
/// let mut reader = ElementReader::new(vec![Element::new(Value::Int(3))]);
/// assert_eq!(reader.next().unwrap(), Some(ValueKind::Int));
/// assert_eq!(reader.next().unwrap(), None);
///
/// reader.rewind();
/// assert_eq!(reader.next().unwrap(), Some(ValueKind::Int));
/// assert_eq!(reader.int_value().unwrap(), 3);
/// ```
pub struct ElementReader {
    roots: Vec<Element>,
    /// Position inside every entered scope, the top level first.
    frames: Vec<Option<usize>>,
}

impl ElementReader {
    pub fn new(roots: Vec<Element>) -> Self {
        Self {
            roots,
            frames: vec![None],
        }
    }

    /// Creates a reader over a single top-level element.
    #[inline]
    pub fn single(root: Element) -> Self {
        Self::new(vec![root])
    }

    /// Moves the cursor back in front of the first top-level element.
    pub fn rewind(&mut self) {
        self.frames.clear();
        self.frames.push(None);
    }

    /// Returns the elements this reader walks.
    #[inline]
    pub fn into_elements(self) -> Vec<Element> {
        self.roots
    }

    fn scope(&self) -> Option<Scope<'_>> {
        let (_, entered) = self.frames.split_last()?;
        let mut scope = Scope::List(&self.roots);
        for position in entered {
            let (_, element) = scope.get((*position)?)?;
            scope = match element.value() {
                Value::List(members) => Scope::List(members),
                Value::Struct(fields) => Scope::Struct(fields),
                _ => return None,
            };
        }
        Some(scope)
    }

    fn current(&self) -> Option<(Option<&str>, &Element)> {
        let position = (*self.frames.last()?)?;
        self.scope()?.get(position)
    }

    fn value(&self) -> Option<&Value> {
        self.current().map(|(_, element)| element.value())
    }

    fn mismatch(&self, expected: ValueKind) -> ValueError {
        match self.value() {
            Some(value) => ValueError::mismatch(expected, value.kind()),
            None => ValueError::InvalidState("no current value"),
        }
    }
}

impl ValueReader for ElementReader {
    fn next(&mut self) -> Result<Option<ValueKind>> {
        let len = self.scope().map_or(0, Scope::len);
        let Some(frame) = self.frames.last_mut() else {
            return Ok(None);
        };
        let next = frame.map_or(0, |position| position + 1);
        *frame = Some(next.min(len));
        Ok(self.kind())
    }

    fn kind(&self) -> Option<ValueKind> {
        self.value().map(Value::kind)
    }

    fn field_name(&self) -> Option<&str> {
        self.current().and_then(|(name, _)| name)
    }

    fn type_annotations(&self) -> TypeAnnotations<'_> {
        match self.current() {
            Some((_, element)) => TypeAnnotations::new(element.annotations()),
            None => TypeAnnotations::empty(),
        }
    }

    fn step_in(&mut self) -> Result<()> {
        match self.kind() {
            Some(ValueKind::Struct | ValueKind::List) => {
                self.frames.push(None);
                Ok(())
            }
            _ => Err(ValueError::InvalidState("step_in outside a container value")),
        }
    }

    fn step_out(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(ValueError::InvalidState("step_out at top level"));
        }
        self.frames.pop();
        Ok(())
    }

    #[inline]
    fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    fn bool_value(&self) -> Result<bool> {
        match self.value() {
            Some(Value::Bool(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Bool)),
        }
    }

    fn int_value(&self) -> Result<i64> {
        match self.value() {
            Some(Value::Int(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Int)),
        }
    }

    fn float_value(&self) -> Result<f64> {
        match self.value() {
            Some(Value::Float(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Float)),
        }
    }

    fn string_value(&self) -> Result<&str> {
        match self.value() {
            Some(Value::String(value) | Value::Symbol(value)) => Ok(value),
            _ => Err(self.mismatch(ValueKind::String)),
        }
    }

    fn blob_value(&self) -> Result<&[u8]> {
        match self.value() {
            Some(Value::Blob(value)) => Ok(value),
            _ => Err(self.mismatch(ValueKind::Blob)),
        }
    }

    fn timestamp_value(&self) -> Result<DateTime<Utc>> {
        match self.value() {
            Some(Value::Timestamp(value)) => Ok(*value),
            _ => Err(self.mismatch(ValueKind::Timestamp)),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::ElementReader;
    use crate::tree::capture;
    use crate::{Element, Value, ValueKind, ValueReader};

    fn sample() -> Element {
        Element::new(Value::Struct(vec![
            ("id".to_string(), Element::new(Value::Int(7))),
            (
                "tags".to_string(),
                Element::new(Value::List(vec![
                    Element::new(Value::Symbol("a".to_string())),
                    Element::new(Value::Null),
                ])),
            ),
            ("name".to_string(), Element::new(Value::String("x".to_string()))),
        ]))
        .with_annotation("Record")
    }

    #[test]
    fn walks_nested_scopes() {
        let mut reader = ElementReader::single(sample());
        assert_eq!(reader.next().unwrap(), Some(ValueKind::Struct));
        assert_eq!(reader.type_annotations().collect::<Vec<_>>(), ["Record"]);
        reader.step_in().unwrap();

        assert_eq!(reader.next().unwrap(), Some(ValueKind::Int));
        assert_eq!(reader.field_name(), Some("id"));
        assert_eq!(reader.next().unwrap(), Some(ValueKind::List));
        reader.step_in().unwrap();
        assert_eq!(reader.depth(), 2);
        assert_eq!(reader.next().unwrap(), Some(ValueKind::Symbol));
        assert_eq!(reader.field_name(), None);
        assert_eq!(reader.string_value().unwrap(), "a");
        reader.step_out().unwrap();

        assert_eq!(reader.next().unwrap(), Some(ValueKind::String));
        assert_eq!(reader.field_name(), Some("name"));
        assert_eq!(reader.next().unwrap(), None);
        assert_eq!(reader.next().unwrap(), None);
        reader.step_out().unwrap();
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn rewind_replays_the_same_struct() {
        let mut reader = ElementReader::single(sample());
        for _ in 0..2 {
            reader.next().unwrap();
            reader.step_in().unwrap();
            reader.next().unwrap();
            assert_eq!(reader.int_value().unwrap(), 7);
            reader.rewind();
        }
    }

    #[test]
    fn capture_copies_a_reader_value() {
        let mut reader = ElementReader::new(vec![sample(), Element::new(Value::Bool(true))]);
        reader.next().unwrap();
        let copy = capture(&mut reader).unwrap();
        assert_eq!(copy, sample());
        assert_eq!(reader.next().unwrap(), Some(ValueKind::Bool));
    }

    #[test]
    fn capture_stops_at_the_nesting_limit() {
        let nested = |levels: usize| {
            (0..levels).fold(Element::new(Value::Null), |inner, _| {
                Element::new(Value::List(vec![inner]))
            })
        };

        let mut reader = ElementReader::single(nested(crate::MAX_DEPTH));
        reader.next().unwrap();
        assert!(capture(&mut reader).is_ok());

        let mut reader = ElementReader::single(nested(crate::MAX_DEPTH + 1));
        reader.next().unwrap();
        assert!(matches!(
            capture(&mut reader),
            Err(crate::ValueError::TooDeep { .. })
        ));
    }

    #[test]
    fn scalar_accessors_check_kind() {
        let mut reader = ElementReader::single(Element::new(Value::Int(1)));
        reader.next().unwrap();
        assert!(reader.string_value().is_err());
        assert!(reader.step_in().is_err());
    }
}
