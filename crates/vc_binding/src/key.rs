use alloc::boxed::Box;
use core::any::{Any, TypeId, type_name};
use core::fmt;
use core::hash::{Hash, Hasher};

/// Scalar types with a dedicated binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I16,
    I32,
    I64,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Timestamp,
    Bytes,
}

impl PrimitiveKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
            Self::Timestamp => "DateTime<Utc>",
            Self::Bytes => "bytes",
        }
    }
}

/// Generic type constructors that keep their arguments in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawType {
    Option,
    Vec,
    VecDeque,
    HashSet,
    BTreeSet,
    /// `Box<[T]>`
    Array,
    HashMap,
    BTreeMap,
    Rc,
    Arc,
    Shared,
}

impl RawType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Option => "Option",
            Self::Vec => "Vec",
            Self::VecDeque => "VecDeque",
            Self::HashSet => "HashSet",
            Self::BTreeSet => "BTreeSet",
            Self::Array => "Box<[]>",
            Self::HashMap => "HashMap",
            Self::BTreeMap => "BTreeMap",
            Self::Rc => "Rc",
            Self::Arc => "Arc",
            Self::Shared => "Shared",
        }
    }
}

/// Identity of a bound type, used as the binding cache key.
///
/// Plain types are keyed by their [`TypeId`] alone. Parameterized
/// containers keep their raw constructor and the keys of their arguments,
/// so `Vec<i32>` and `Vec<String>` get distinct bindings while
/// sharing one binding implementation.
///
/// # Examples
///
/// ```
/// use vc_binding::{TypeKey, RawType, PrimitiveKind};
///
/// let ints = TypeKey::parameterized(RawType::Vec, [TypeKey::Primitive(PrimitiveKind::I32)]);
/// let strings = TypeKey::parameterized(RawType::Vec, [TypeKey::Primitive(PrimitiveKind::String)]);
///
/// assert_ne!(ints, strings);
/// assert_eq!(ints.to_string(), "Vec<i32>");
/// ```
#[derive(Debug, Clone)]
pub enum TypeKey {
    Primitive(PrimitiveKind),
    Named {
        id: TypeId,
        path: &'static str,
    },
    Parameterized {
        raw: RawType,
        args: Box<[TypeKey]>,
    },
}

impl TypeKey {
    /// Key of a non-generic (or fully opaque) type.
    #[inline]
    pub fn named<T: Any + ?Sized>() -> Self {
        Self::Named {
            id: TypeId::of::<T>(),
            path: type_name::<T>(),
        }
    }

    #[inline]
    pub fn parameterized(raw: RawType, args: impl Into<Box<[TypeKey]>>) -> Self {
        Self::Parameterized {
            raw,
            args: args.into(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Named { id: a, .. }, Self::Named { id: b, .. }) => a == b,
            (
                Self::Parameterized { raw: a, args: x },
                Self::Parameterized { raw: b, args: y },
            ) => a == b && x == y,
            _ => false,
        }
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Primitive(kind) => kind.hash(state),
            // The path is informational, identity is the `TypeId`.
            Self::Named { id, .. } => id.hash(state),
            Self::Parameterized { raw, args } => {
                raw.hash(state);
                args.hash(state);
            }
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.name()),
            Self::Named { path, .. } => f.write_str(path),
            Self::Parameterized {
                raw: RawType::Array,
                args,
            } => {
                f.write_str("Box<[")?;
                write_args(f, args)?;
                f.write_str("]>")
            }
            Self::Parameterized { raw, args } => {
                f.write_str(raw.name())?;
                f.write_str("<")?;
                write_args(f, args)?;
                f.write_str(">")
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypeKey]) -> fmt::Result {
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        fmt::Display::fmt(arg, f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use core::hash::BuildHasher;

    use super::{PrimitiveKind, RawType, TypeKey};
    use crate::hash::FixedHashState;

    struct Marker;

    #[test]
    fn parameterized_keys_compare_argument_wise() {
        let a = TypeKey::parameterized(
            RawType::HashMap,
            [TypeKey::Primitive(PrimitiveKind::String), TypeKey::named::<Marker>()],
        );
        let b = TypeKey::parameterized(
            RawType::HashMap,
            [TypeKey::Primitive(PrimitiveKind::String), TypeKey::named::<Marker>()],
        );
        let c = TypeKey::parameterized(
            RawType::BTreeMap,
            [TypeKey::Primitive(PrimitiveKind::String), TypeKey::named::<Marker>()],
        );

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(FixedHashState.hash_one(&a), FixedHashState.hash_one(&b));
    }

    #[test]
    fn named_keys_ignore_the_path() {
        let real = TypeKey::named::<Marker>();
        let TypeKey::Named { id, .. } = real.clone() else {
            unreachable!()
        };
        assert_eq!(real, TypeKey::Named { id, path: "renamed" });
        assert_ne!(real, TypeKey::named::<u8>());
    }

    #[test]
    fn display_is_readable() {
        let key = TypeKey::parameterized(
            RawType::Array,
            [TypeKey::parameterized(RawType::Option, [TypeKey::Primitive(PrimitiveKind::F64)])],
        );
        assert_eq!(key.to_string(), "Box<[Option<f64>]>");
    }
}
