use core::fmt;

/// The kind of a value in the abstract data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Symbol,
    Timestamp,
    Blob,
    Struct,
    List,
}

impl ValueKind {
    /// Returns the upper-case name used in diagnostics, e.g. `"STRUCT"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::String => "STRING",
            Self::Symbol => "SYMBOL",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob => "BLOB",
            Self::Struct => "STRUCT",
            Self::List => "LIST",
        }
    }

    /// Returns the container kind for `STRUCT` and `LIST`.
    #[inline]
    pub const fn container(self) -> Option<ContainerKind> {
        match self {
            Self::Struct => Some(ContainerKind::Struct),
            Self::List => Some(ContainerKind::List),
            _ => None,
        }
    }

    /// `STRING` and `SYMBOL` both carry text.
    #[inline]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::String | Self::Symbol)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value that can be stepped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered fields with unique names.
    Struct,
    /// Ordered values.
    List,
}

impl From<ContainerKind> for ValueKind {
    #[inline]
    fn from(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Struct => Self::Struct,
            ContainerKind::List => Self::List,
        }
    }
}
