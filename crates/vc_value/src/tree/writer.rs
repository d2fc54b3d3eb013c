use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::mem;

use chrono::{DateTime, Utc};

use crate::{ContainerKind, Element, Result, Value, ValueError, ValueWriter};

enum Members {
    Struct(Vec<(String, Element)>),
    List(Vec<Element>),
}

struct Frame {
    field_name: Option<String>,
    annotations: Vec<String>,
    members: Members,
}

/// A [`ValueWriter`] that builds [`Element`]s in memory.
///
/// # Examples
///
/// ```
/// use vc_value::{ContainerKind, Value, ValueWriter};
/// use vc_value::tree::ElementWriter;
///
/// let mut writer = ElementWriter::new();
/// writer.step_in(ContainerKind::List).unwrap();
/// writer.write_int(1).unwrap();
/// writer.step_out().unwrap();
///
/// let roots = writer.into_elements().unwrap();
/// assert_eq!(roots[0].elements().unwrap()[0].value(), &Value::Int(1));
/// ```
#[derive(Default)]
pub struct ElementWriter {
    roots: Vec<Element>,
    frames: Vec<Frame>,
    field_name: Option<String>,
    annotations: Vec<String>,
}

impl ElementWriter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the written top-level elements.
    pub fn into_elements(mut self) -> Result<Vec<Element>> {
        self.finish()?;
        Ok(self.roots)
    }

    fn in_struct(&self) -> bool {
        matches!(
            self.frames.last(),
            Some(Frame {
                members: Members::Struct(_),
                ..
            })
        )
    }

    fn member_name(&mut self) -> Result<Option<String>> {
        let name = self.field_name.take();
        if self.in_struct() && name.is_none() {
            return Err(ValueError::InvalidState(
                "struct member written without a field name",
            ));
        }
        Ok(name)
    }

    fn attach(&mut self, name: Option<String>, element: Element) {
        match self.frames.last_mut() {
            None => self.roots.push(element),
            Some(frame) => match &mut frame.members {
                Members::Struct(fields) => fields.push((name.unwrap_or_default(), element)),
                Members::List(members) => members.push(element),
            },
        }
    }

    fn push(&mut self, value: Value) -> Result<()> {
        let name = self.member_name()?;
        let element = Element::annotated(mem::take(&mut self.annotations), value);
        self.attach(name, element);
        Ok(())
    }
}

impl ValueWriter for ElementWriter {
    fn set_field_name(&mut self, name: &str) {
        self.field_name = Some(name.to_string());
    }

    fn add_type_annotation(&mut self, annotation: &str) {
        self.annotations.push(annotation.to_string());
    }

    fn write_null(&mut self) -> Result<()> {
        self.push(Value::Null)
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.push(Value::Bool(value))
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.push(Value::Int(value))
    }

    fn write_float(&mut self, value: f64) -> Result<()> {
        self.push(Value::Float(value))
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.push(Value::String(value.to_string()))
    }

    fn write_symbol(&mut self, value: &str) -> Result<()> {
        self.push(Value::Symbol(value.to_string()))
    }

    fn write_blob(&mut self, value: &[u8]) -> Result<()> {
        self.push(Value::Blob(value.to_vec()))
    }

    fn write_timestamp(&mut self, value: &DateTime<Utc>) -> Result<()> {
        self.push(Value::Timestamp(*value))
    }

    fn step_in(&mut self, kind: ContainerKind) -> Result<()> {
        let field_name = self.member_name()?;
        let members = match kind {
            ContainerKind::Struct => Members::Struct(Vec::new()),
            ContainerKind::List => Members::List(Vec::new()),
        };
        self.frames.push(Frame {
            field_name,
            annotations: mem::take(&mut self.annotations),
            members,
        });
        Ok(())
    }

    fn step_out(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or(ValueError::InvalidState("step_out without an open container"))?;
        let value = match frame.members {
            Members::Struct(fields) => Value::Struct(fields),
            Members::List(members) => Value::List(members),
        };
        self.field_name = None;
        self.annotations.clear();
        self.attach(frame.field_name, Element::annotated(frame.annotations, value));
        Ok(())
    }

    #[inline]
    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn finish(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            Ok(())
        } else {
            Err(ValueError::InvalidState("finish with open containers"))
        }
    }
}
