use chrono::{DateTime, Utc};

use crate::{ContainerKind, Element, Result, Value};

/// A forward-only cursor that emits values.
///
/// Inside a `STRUCT`, [`set_field_name`](ValueWriter::set_field_name) must
/// precede every value; annotations added with
/// [`add_type_annotation`](ValueWriter::add_type_annotation) attach to the
/// next value written, scalar or container.
///
/// The trait is object safe, bindings receive a `&mut dyn ValueWriter`.
pub trait ValueWriter {
    /// Names the next value written inside the current struct.
    fn set_field_name(&mut self, name: &str);

    /// Tags the next value written with a type annotation.
    fn add_type_annotation(&mut self, annotation: &str);

    fn write_null(&mut self) -> Result<()>;

    fn write_bool(&mut self, value: bool) -> Result<()>;

    fn write_int(&mut self, value: i64) -> Result<()>;

    /// Floats are always written with 64-bit precision.
    fn write_float(&mut self, value: f64) -> Result<()>;

    fn write_string(&mut self, value: &str) -> Result<()>;

    /// Writes an interned text value.
    fn write_symbol(&mut self, value: &str) -> Result<()>;

    fn write_blob(&mut self, value: &[u8]) -> Result<()>;

    fn write_timestamp(&mut self, value: &DateTime<Utc>) -> Result<()>;

    /// Opens a container; the following values are its members.
    fn step_in(&mut self, kind: ContainerKind) -> Result<()>;

    /// Closes the innermost open container.
    fn step_out(&mut self) -> Result<()>;

    /// Number of open containers.
    fn depth(&self) -> usize;

    /// Flushes buffered output. All containers must be closed.
    fn finish(&mut self) -> Result<()>;

    /// Writes a whole element tree, annotations included.
    fn write_element(&mut self, element: &Element) -> Result<()> {
        for annotation in element.annotations() {
            self.add_type_annotation(annotation);
        }
        match element.value() {
            Value::Null => self.write_null(),
            Value::Bool(v) => self.write_bool(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Float(v) => self.write_float(*v),
            Value::String(v) => self.write_string(v),
            Value::Symbol(v) => self.write_symbol(v),
            Value::Timestamp(v) => self.write_timestamp(v),
            Value::Blob(v) => self.write_blob(v),
            Value::Struct(fields) => {
                self.step_in(ContainerKind::Struct)?;
                for (name, field) in fields {
                    self.set_field_name(name);
                    self.write_element(field)?;
                }
                self.step_out()
            }
            Value::List(elements) => {
                self.step_in(ContainerKind::List)?;
                for member in elements {
                    self.write_element(member)?;
                }
                self.step_out()
            }
        }
    }
}
