use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use crate::access::{Accessor, FieldAccessor};
use crate::bean::ConstructorInfo;
use crate::{Bind, BindingInitContext, NestedBinding, Result};

/// A struct serialized property by property.
///
/// Usually derived:
///
/// ```
/// use vc_binding::Bean;
///
/// #[derive(Bean, Default)]
/// #[bean(default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let info = Point::bean_info();
/// assert_eq!(info.name(), "Point");
/// assert_eq!(info.properties().len(), 2);
/// assert!(info.default_constructor().is_some());
/// ```
pub trait Bean: Bind {
    /// Fully qualified path, used as the open polymorphism discriminator.
    const TYPE_PATH: &'static str;

    fn bean_info() -> BeanInfo;
}

/// Resolves the nested binding of a property type.
pub type ResolveNested = fn(&mut BindingInitContext<'_>) -> Result<Arc<dyn NestedBinding>>;

// -----------------------------------------------------------------------------
// PropertyInfo

/// One serialized field of a bean.
pub struct PropertyInfo {
    name: &'static str,
    accessor: Box<dyn Accessor>,
    resolve: ResolveNested,
}

impl PropertyInfo {
    /// Describes the field reached by `get` / `get_mut`, written as `name`.
    pub fn new<H: Any, F: Bind>(
        name: &'static str,
        get: fn(&H) -> &F,
        get_mut: fn(&mut H) -> &mut F,
    ) -> Self {
        Self {
            name,
            accessor: Box::new(FieldAccessor::new(name, get, get_mut)),
            resolve: F::nested_binding,
        }
    }

    /// Wire field name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn accessor(&self) -> &dyn Accessor {
        &*self.accessor
    }

    #[inline]
    pub fn value_type_name(&self) -> &'static str {
        self.accessor.value_type_name()
    }

    #[inline]
    pub(crate) fn resolve(&self) -> ResolveNested {
        self.resolve
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("type", &self.value_type_name())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// BeanInfo

/// Description of a bean type.
#[derive(Debug)]
pub struct BeanInfo {
    type_path: &'static str,
    name: &'static str,
    properties: Vec<PropertyInfo>,
    default: Option<fn() -> Box<dyn Any>>,
    constructors: Vec<ConstructorInfo>,
}

impl BeanInfo {
    pub fn new(type_path: &'static str) -> Self {
        Self {
            type_path,
            name: simple_name(type_path),
            properties: Vec::new(),
            default: None,
            constructors: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyInfo) -> Self {
        self.properties.push(property);
        self
    }

    /// Sets the no-argument constructor.
    pub fn with_default(mut self, create: fn() -> Box<dyn Any>) -> Self {
        self.default = Some(create);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// Last segment of the type path.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|property| property.name == name)
    }

    #[inline]
    pub fn default_constructor(&self) -> Option<fn() -> Box<dyn Any>> {
        self.default
    }

    #[inline]
    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }
}

/// `a::b::Name<T>` to `Name`.
pub(crate) fn simple_name(path: &'static str) -> &'static str {
    let path = path.split('<').next().unwrap_or(path);
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::simple_name;

    #[test]
    fn simple_names() {
        assert_eq!(simple_name("app::shapes::Circle"), "Circle");
        assert_eq!(simple_name("Circle"), "Circle");
        assert_eq!(simple_name("app::Wrapper<app::Inner>"), "Wrapper");
    }
}
