#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod element;
mod error;
mod kind;
mod reader;
mod writer;

pub mod binary;
pub mod text;
pub mod tree;

// -----------------------------------------------------------------------------
// Exports

pub use element::{Element, Value};
pub use error::ValueError;
pub use kind::{ContainerKind, ValueKind};
pub use reader::{TypeAnnotations, ValueReader};
pub use writer::ValueWriter;

pub use chrono::{DateTime, Utc};

/// Deepest container nesting the readers and the text parser accept.
pub const MAX_DEPTH: usize = 512;

/// Result alias used across the value layer.
pub type Result<T, E = ValueError> = core::result::Result<T, E>;
