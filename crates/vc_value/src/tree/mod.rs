//! Owned element trees and cursors over them.
//!
//! [`capture`] copies the current value of any reader into an [`Element`];
//! an [`ElementReader`] replays it as often as needed through
//! [`rewind`](ElementReader::rewind). This is how a struct is read twice
//! without touching the underlying source again.

// -----------------------------------------------------------------------------
// Modules

mod capture;
mod reader;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use capture::capture;
pub use reader::ElementReader;
pub use writer::ElementWriter;
