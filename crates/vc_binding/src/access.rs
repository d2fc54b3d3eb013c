//! Property handles.

use alloc::boxed::Box;
use core::any::{Any, type_name};
use core::fmt;
use core::marker::PhantomData;

use crate::Result;
use crate::binding::{unbox, value_mut, value_ref};

/// Type-erased access to one property of a host type.
///
/// The name is the wire field name.
pub trait Accessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Type name of the property value.
    fn value_type_name(&self) -> &'static str;

    fn read<'a>(&self, host: &'a dyn Any) -> Result<&'a dyn Any>;

    fn read_mut<'a>(&self, host: &'a mut dyn Any) -> Result<&'a mut dyn Any>;

    fn set(&self, host: &mut dyn Any, value: Box<dyn Any>) -> Result<()>;
}

impl dyn Accessor + '_ {
    /// Typed read, e.g. `accessor.read_as::<i32>(&point)`.
    pub fn read_as<'a, F: Any>(&self, host: &'a dyn Any) -> Result<&'a F> {
        value_ref::<F>(self.read(host)?)
    }

    /// Typed write.
    pub fn set_as<F: Any>(&self, host: &mut dyn Any, value: F) -> Result<()> {
        *value_mut::<F>(self.read_mut(host)?)? = value;
        Ok(())
    }
}

impl fmt::Debug for dyn Accessor + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name())
            .field("type", &self.value_type_name())
            .finish()
    }
}

/// An [`Accessor`] over a struct field, built from two projections.
///
/// # Examples
///
/// ```
/// use vc_binding::access::{Accessor, FieldAccessor};
///
/// struct Point { x: i32 }
///
/// let accessor: &dyn Accessor = &FieldAccessor::new("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x);
/// let mut point = Point { x: 1 };
/// accessor.set_as(&mut point, 5).unwrap();
/// assert_eq!(*accessor.read_as::<i32>(&point).unwrap(), 5);
/// ```
pub struct FieldAccessor<H, F> {
    name: &'static str,
    get: fn(&H) -> &F,
    get_mut: fn(&mut H) -> &mut F,
    _marker: PhantomData<fn() -> (H, F)>,
}

impl<H: Any, F: Any> FieldAccessor<H, F> {
    pub const fn new(name: &'static str, get: fn(&H) -> &F, get_mut: fn(&mut H) -> &mut F) -> Self {
        Self {
            name,
            get,
            get_mut,
            _marker: PhantomData,
        }
    }
}

impl<H: Any, F: Any> Accessor for FieldAccessor<H, F> {
    #[inline]
    fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn value_type_name(&self) -> &'static str {
        type_name::<F>()
    }

    fn read<'a>(&self, host: &'a dyn Any) -> Result<&'a dyn Any> {
        let host = value_ref::<H>(host)?;
        Ok((self.get)(host))
    }

    fn read_mut<'a>(&self, host: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let host = value_mut::<H>(host)?;
        Ok((self.get_mut)(host))
    }

    fn set(&self, host: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        let host = value_mut::<H>(host)?;
        *(self.get_mut)(host) = unbox::<F>(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;

    use super::{Accessor, FieldAccessor};

    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn reads_and_writes_through_any() {
        let name: &dyn Accessor =
            &FieldAccessor::new("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name);
        let age: &dyn Accessor =
            &FieldAccessor::new("age", |p: &Person| &p.age, |p: &mut Person| &mut p.age);

        let mut person = Person {
            name: String::from("Ada"),
            age: 36,
        };
        assert_eq!(name.read_as::<String>(&person).unwrap(), "Ada");

        age.set(&mut person, Box::new(37u32)).unwrap();
        assert_eq!(person.age, 37);

        assert!(age.set(&mut person, Box::new("wrong")).is_err());
        assert!(name.read(&37u32).is_err());
    }
}
