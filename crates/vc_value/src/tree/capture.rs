use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{Element, Result, Value, ValueError, ValueKind, ValueReader};

/// Copies the current value of `reader`, including nested members.
///
/// A container value is consumed: the reader is left positioned on it with
/// its body already walked, so the next call to `next` moves past it.
///
/// # Examples
///
/// ```
/// use vc_value::{ContainerKind, ValueReader, ValueWriter, Value};
/// use vc_value::binary::{BinaryReader, BinaryWriter};
/// use vc_value::tree::capture;
///
/// let mut writer = BinaryWriter::new(Vec::new());
/// writer.step_in(ContainerKind::List).unwrap();
/// writer.write_int(1).unwrap();
/// writer.step_out().unwrap();
/// let bytes = writer.into_inner().unwrap();
///
/// let mut reader = BinaryReader::new(&bytes).unwrap();
/// reader.next().unwrap();
/// let element = capture(&mut reader).unwrap();
/// assert_eq!(element.elements().unwrap()[0].value(), &Value::Int(1));
/// assert_eq!(reader.next().unwrap(), None);
/// ```
pub fn capture<R: ValueReader + ?Sized>(reader: &mut R) -> Result<Element> {
    let kind = reader
        .kind()
        .ok_or(ValueError::InvalidState("no current value to capture"))?;
    let annotations: Vec<String> = reader.type_annotations().map(str::to_string).collect();

    let value = match kind {
        ValueKind::Null => Value::Null,
        ValueKind::Bool => Value::Bool(reader.bool_value()?),
        ValueKind::Int => Value::Int(reader.int_value()?),
        ValueKind::Float => Value::Float(reader.float_value()?),
        ValueKind::String => Value::String(reader.string_value()?.to_string()),
        ValueKind::Symbol => Value::Symbol(reader.string_value()?.to_string()),
        ValueKind::Timestamp => Value::Timestamp(reader.timestamp_value()?),
        ValueKind::Blob => Value::Blob(reader.blob_value()?.to_vec()),
        ValueKind::Struct | ValueKind::List if reader.depth() >= crate::MAX_DEPTH => {
            return Err(ValueError::too_deep());
        }
        ValueKind::Struct => {
            let mut fields = Vec::new();
            reader.step_in()?;
            while reader.next()?.is_some() {
                let name = reader
                    .field_name()
                    .ok_or(ValueError::InvalidState("struct member without a field name"))?
                    .to_string();
                fields.push((name, capture(reader)?));
            }
            reader.step_out()?;
            Value::Struct(fields)
        }
        ValueKind::List => {
            let mut members = Vec::new();
            reader.step_in()?;
            while reader.next()?.is_some() {
                members.push(capture(reader)?);
            }
            reader.step_out()?;
            Value::List(members)
        }
    };

    Ok(Element::annotated(annotations, value))
}
