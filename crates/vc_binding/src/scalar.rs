//! Bindings of primitive values.
//!
//! Each scalar maps to exactly one wire kind (integers and floats accept
//! each other on read). Scalars bypass the producer when nested: their
//! nested binding is built directly.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::cmp::Ordering;
use core::marker::PhantomData;

use vc_value::{DateTime, Utc, ValueKind, ValueReader, ValueWriter};

use crate::binding::{replace_with, value_ref};
use crate::{
    Bind, BindingInitContext, NestedBinding, Presence, PrimitiveKind, ReadContext, Result,
    RootBinding, SerializationError, TypeKey, WriteContext,
};

/// Strings shorter than this many characters are written as symbols, so
/// the binary encoding interns them.
const SYMBOL_LIMIT: usize = 64;

// -----------------------------------------------------------------------------
// Scalar

/// A value written as a single wire scalar.
pub trait Scalar: Any + Clone + Send + Sync {
    const KIND: PrimitiveKind;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()>;

    /// Reads the current value; `NULL` is a shape error.
    fn read_value(reader: &dyn ValueReader) -> Result<Self>;

    fn presence(&self) -> Presence {
        Presence::Value
    }

    /// The value a filter may omit as empty, stood in for a missing
    /// constructor argument.
    fn empty() -> Option<Self> {
        None
    }

    fn compare(&self, other: &Self) -> Option<Ordering>;
}

#[inline]
fn expect(reader: &dyn ValueReader, accepted: &[ValueKind], expected: ValueKind, ty: &str) -> Result<()> {
    match reader.kind() {
        Some(kind) if accepted.contains(&kind) => Ok(()),
        found => Err(SerializationError::shape(expected.name(), found, ty)),
    }
}

macro_rules! impl_int_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;

            #[inline]
            fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
                Ok(writer.write_int(*self as i64)?)
            }

            fn read_value(reader: &dyn ValueReader) -> Result<Self> {
                expect(reader, &[ValueKind::Int], ValueKind::Int, type_name::<$ty>())?;
                Ok(reader.int_value()? as $ty)
            }

            #[inline]
            fn compare(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
    )*};
}

impl_int_scalar!(
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
);

macro_rules! impl_float_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;

            #[inline]
            fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
                Ok(writer.write_float(f64::from(*self))?)
            }

            fn read_value(reader: &dyn ValueReader) -> Result<Self> {
                let accepted = [ValueKind::Float, ValueKind::Int];
                expect(reader, &accepted, ValueKind::Float, type_name::<$ty>())?;
                let value = match reader.kind() {
                    Some(ValueKind::Int) => reader.int_value()? as f64,
                    _ => reader.float_value()?,
                };
                Ok(value as $ty)
            }

            #[inline]
            fn compare(&self, other: &Self) -> Option<Ordering> {
                self.partial_cmp(other)
            }
        }
    )*};
}

impl_float_scalar!(f32 => F32, f64 => F64);

impl Scalar for bool {
    const KIND: PrimitiveKind = PrimitiveKind::Bool;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
        Ok(writer.write_bool(*self)?)
    }

    fn read_value(reader: &dyn ValueReader) -> Result<Self> {
        expect(reader, &[ValueKind::Bool], ValueKind::Bool, "bool")?;
        Ok(reader.bool_value()?)
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Scalar for String {
    const KIND: PrimitiveKind = PrimitiveKind::String;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
        if self.chars().count() < SYMBOL_LIMIT {
            writer.write_symbol(self)?;
        } else {
            writer.write_string(self)?;
        }
        Ok(())
    }

    fn read_value(reader: &dyn ValueReader) -> Result<Self> {
        let accepted = [ValueKind::String, ValueKind::Symbol];
        expect(reader, &accepted, ValueKind::String, "String")?;
        Ok(reader.string_value()?.to_string())
    }

    fn presence(&self) -> Presence {
        if self.is_empty() {
            Presence::EmptyString
        } else {
            Presence::Value
        }
    }

    fn empty() -> Option<Self> {
        Some(String::new())
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Scalar for DateTime<Utc> {
    const KIND: PrimitiveKind = PrimitiveKind::Timestamp;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
        Ok(writer.write_timestamp(self)?)
    }

    fn read_value(reader: &dyn ValueReader) -> Result<Self> {
        expect(reader, &[ValueKind::Timestamp], ValueKind::Timestamp, "DateTime<Utc>")?;
        Ok(reader.timestamp_value()?)
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte buffers, reached through `Vec<u8>`.
impl Scalar for Vec<u8> {
    const KIND: PrimitiveKind = PrimitiveKind::Bytes;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
        Ok(writer.write_blob(self)?)
    }

    fn read_value(reader: &dyn ValueReader) -> Result<Self> {
        expect(reader, &[ValueKind::Blob], ValueKind::Blob, "Vec<u8>")?;
        Ok(reader.blob_value()?.to_vec())
    }

    fn presence(&self) -> Presence {
        if self.is_empty() {
            Presence::EmptyCollection
        } else {
            Presence::Value
        }
    }

    fn empty() -> Option<Self> {
        Some(Self::default())
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte buffers, reached through `Box<[u8]>`.
impl Scalar for Box<[u8]> {
    const KIND: PrimitiveKind = PrimitiveKind::Bytes;

    fn write_value(&self, writer: &mut dyn ValueWriter) -> Result<()> {
        Ok(writer.write_blob(self)?)
    }

    fn read_value(reader: &dyn ValueReader) -> Result<Self> {
        expect(reader, &[ValueKind::Blob], ValueKind::Blob, "Box<[u8]>")?;
        Ok(reader.blob_value()?.into())
    }

    fn presence(&self) -> Presence {
        if self.is_empty() {
            Presence::EmptyCollection
        } else {
            Presence::Value
        }
    }

    fn empty() -> Option<Self> {
        Some(Self::default())
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// -----------------------------------------------------------------------------
// ScalarBinding

/// Root and nested binding of a [`Scalar`].
pub struct ScalarBinding<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S: Scalar> ScalarBinding<S> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn read_boxed(ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        Ok(Box::new(S::read_value(ctx.reader())?))
    }

    /// `NULL` leaves the target unchanged.
    fn read_into(target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        if ctx.reader().is_null() {
            return Ok(());
        }
        let value = Self::read_boxed(ctx)?;
        replace_with::<S>(target, value)
    }

    fn presence_of(value: &dyn Any) -> Presence {
        value.downcast_ref::<S>().map_or(Presence::Value, S::presence)
    }

    fn compare_any(a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        S::compare(a.downcast_ref::<S>()?, b.downcast_ref::<S>()?)
    }

    fn empty_boxed() -> Option<Box<dyn Any>> {
        S::empty().map(|value| Box::new(value) as Box<dyn Any>)
    }
}

impl<S: Scalar> RootBinding for ScalarBinding<S> {
    fn type_name(&self) -> &'static str {
        S::KIND.name()
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        value_ref::<S>(value)?.write_value(ctx.writer())
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        Self::read_boxed(ctx)
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        Self::read_into(target, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        Self::presence_of(value)
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Self::empty_boxed()
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        Self::compare_any(a, b)
    }
}

impl<S: Scalar> NestedBinding for ScalarBinding<S> {
    fn binding_name(&self) -> &'static str {
        S::KIND.name()
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        value_ref::<S>(value)?.write_value(ctx.writer())
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        Self::read_boxed(ctx)
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        Self::read_into(target, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        Self::presence_of(value)
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Self::empty_boxed()
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        Self::compare_any(a, b)
    }
}

// -----------------------------------------------------------------------------
// Bind

macro_rules! impl_scalar_bind {
    ($($ty:ty),* $(,)?) => {$(
        impl Bind for $ty {
            #[inline]
            fn type_key() -> TypeKey {
                TypeKey::Primitive(<$ty as Scalar>::KIND)
            }

            fn create_binding() -> Result<Arc<dyn RootBinding>> {
                Ok(Arc::new(ScalarBinding::<$ty>::new()))
            }

            fn nested_binding(_: &mut BindingInitContext<'_>) -> Result<Arc<dyn NestedBinding>> {
                Ok(Arc::new(ScalarBinding::<$ty>::new()))
            }
        }
    )*};
}

impl_scalar_bind!(bool, i16, i32, i64, u16, u32, u64, f32, f64, String, DateTime<Utc>);

macro_rules! impl_unsupported_bind {
    ($($ty:ty => $why:literal),* $(,)?) => {$(
        impl Bind for $ty {
            #[inline]
            fn type_key() -> TypeKey {
                TypeKey::named::<$ty>()
            }

            fn create_binding() -> Result<Arc<dyn RootBinding>> {
                Err(unsupported(stringify!($ty), $why))
            }

            fn nested_binding(_: &mut BindingInitContext<'_>) -> Result<Arc<dyn NestedBinding>> {
                Err(unsupported(stringify!($ty), $why))
            }
        }
    )*};
}

impl_unsupported_bind!(
    char => "use a `String`",
    u8 => "use `i16` or a `Vec<u8>` blob",
    i8 => "use `i16`",
);

#[cold]
fn unsupported(ty: &str, why: &str) -> SerializationError {
    SerializationError::unsupported(alloc::format!("`{ty}` cannot be serialized, {why}"))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use vc_value::ValueWriter;
    use vc_value::binary::{BinaryReader, BinaryWriter};
    use vc_value::{ValueKind, ValueReader};

    use super::Scalar;
    use crate::{ErrorKind, Presence};

    fn encode<S: Scalar>(value: &S) -> Vec<u8> {
        let mut writer = BinaryWriter::new(Vec::new());
        value.write_value(&mut writer).unwrap();
        writer.into_inner().unwrap()
    }

    fn decode<S: Scalar>(bytes: &[u8]) -> crate::Result<S> {
        let mut reader = BinaryReader::new(bytes).unwrap();
        reader.next().unwrap();
        S::read_value(&reader)
    }

    #[test]
    fn unsigned_values_keep_their_bits() {
        let bytes = encode(&u64::MAX);
        assert_eq!(decode::<u64>(&bytes).unwrap(), u64::MAX);
    }

    #[test]
    fn short_strings_are_symbols() {
        let short = encode(&String::from("abc"));
        let mut reader = BinaryReader::new(&short).unwrap();
        assert_eq!(reader.next().unwrap(), Some(ValueKind::Symbol));

        let long = encode(&"x".repeat(64));
        let mut reader = BinaryReader::new(&long).unwrap();
        assert_eq!(reader.next().unwrap(), Some(ValueKind::String));
        assert_eq!(decode::<String>(&long).unwrap().len(), 64);
    }

    #[test]
    fn floats_accept_ints() {
        let bytes = encode(&3_i32);
        assert_eq!(decode::<f64>(&bytes).unwrap(), 3.0);
        let error = decode::<bool>(&bytes).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Shape);
        assert_eq!(error.to_string(), "expected BOOL for bool, found INT");
    }

    #[test]
    fn null_is_a_shape_error() {
        let mut writer = BinaryWriter::new(Vec::new());
        writer.write_null().unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(decode::<i32>(&bytes).err().unwrap().kind(), ErrorKind::Shape);
    }

    #[test]
    fn empty_string_presence() {
        assert_eq!(String::new().presence(), Presence::EmptyString);
        assert_eq!(String::from("a").presence(), Presence::Value);
    }
}
