use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::fmt;

use thiserror::Error;

use crate::BoxedError;

/// Builds a bean from its arguments, in parameter order.
pub type Invoke = fn(ConstructorArgs) -> Result<Box<dyn Any>, ConstructError>;

/// How the parameter names of a constructor are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorKind {
    /// Names declared next to the constructor.
    Declared,
    /// Only the arity is known; names come from
    /// [`ReadConfiguration::resolve_property_mapping`](crate::ReadConfiguration::resolve_property_mapping).
    Positional,
    /// The struct literal taking every property in declaration order.
    Primary,
}

/// A non-default way to build a bean.
pub struct ConstructorInfo {
    kind: ConstructorKind,
    params: &'static [&'static str],
    arity: usize,
    invoke: Invoke,
}

impl ConstructorInfo {
    pub const fn declared(params: &'static [&'static str], invoke: Invoke) -> Self {
        Self {
            kind: ConstructorKind::Declared,
            params,
            arity: params.len(),
            invoke,
        }
    }

    pub const fn positional(arity: usize, invoke: Invoke) -> Self {
        Self {
            kind: ConstructorKind::Positional,
            params: &[],
            arity,
            invoke,
        }
    }

    pub const fn primary(params: &'static [&'static str], invoke: Invoke) -> Self {
        Self {
            kind: ConstructorKind::Primary,
            params,
            arity: params.len(),
            invoke,
        }
    }

    #[inline]
    pub fn kind(&self) -> ConstructorKind {
        self.kind
    }

    /// Property names of the parameters; empty for positional constructors.
    #[inline]
    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    #[inline]
    pub fn invoke(&self) -> Invoke {
        self.invoke
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("arity", &self.arity)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ConstructorArgs

/// Decoded arguments handed to an [`Invoke`].
pub struct ConstructorArgs {
    names: Vec<&'static str>,
    values: Vec<Option<Box<dyn Any>>>,
}

impl ConstructorArgs {
    pub fn new(names: Vec<&'static str>, values: Vec<Option<Box<dyn Any>>>) -> Self {
        Self { names, values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Moves argument `index` out.
    pub fn take<A: Any>(&mut self, index: usize) -> Result<A, ConstructError> {
        let name = self.names.get(index).copied().unwrap_or("?");
        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ConstructError::MissingArgument { index, name })?;
        value
            .downcast::<A>()
            .map(|value| *value)
            .map_err(|_| ConstructError::ArgumentType {
                index,
                name,
                expected: type_name::<A>(),
            })
    }
}

/// Failure of a constructor call.
#[derive(Debug, Error)]
pub enum ConstructError {
    #[error("missing argument {index} `{name}`")]
    MissingArgument { index: usize, name: &'static str },
    #[error("argument {index} `{name}` is not a `{expected}`")]
    ArgumentType {
        index: usize,
        name: &'static str,
        expected: &'static str,
    },
    /// Raised by the constructor itself.
    #[error("{0}")]
    Custom(#[source] BoxedError),
}

impl ConstructError {
    pub fn custom(error: impl Into<BoxedError>) -> Self {
        Self::Custom(error.into())
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::string::String;
    use alloc::vec;
    use core::any::Any;

    use super::{ConstructError, ConstructorArgs};

    #[test]
    fn take_checks_presence_and_type() {
        let mut args = ConstructorArgs::new(
            vec!["id", "name"],
            vec![
                Some(Box::new(7_i32) as Box<dyn Any>),
                Some(Box::new(String::from("a")) as Box<dyn Any>),
            ],
        );
        assert_eq!(args.take::<i32>(0).unwrap(), 7);
        assert!(matches!(
            args.take::<i32>(0),
            Err(ConstructError::MissingArgument { index: 0, name: "id" })
        ));
        let error = args.take::<i64>(1).err().unwrap();
        assert_eq!(error.to_string(), "argument 1 `name` is not a `i64`");
    }
}
