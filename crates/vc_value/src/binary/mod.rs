//! Compact binary encoding.
//!
//! A stream starts with [`MAGIC`] followed by any number of top-level
//! values. Every value is laid out as
//!
//! ```text
//! [ANNOTATED count symbol*] tag [field-symbol] payload
//! ```
//!
//! where the field symbol is present only for struct members. Containers
//! have no length prefix; their members follow the tag and the container
//! ends with [`tag::END`].
//!
//! Text that repeats (field names, annotations and `SYMBOL` values) goes
//! through an inline symbol table. A symbol token is a varint `n`:
//! an even `n` refers to symbol `n >> 1`, an odd `n` defines the next
//! symbol with `n >> 1` bytes of UTF-8 following.

// -----------------------------------------------------------------------------
// Modules

mod reader;
mod varint;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// First bytes of every binary stream.
pub const MAGIC: &[u8; 4] = b"VCO\x01";

/// Returns `true` if `input` starts with [`MAGIC`].
#[inline]
pub fn is_binary(input: &[u8]) -> bool {
    input.starts_with(MAGIC)
}

/// Type tags.
pub mod tag {
    pub const NULL: u8 = 0x00;
    pub const FALSE: u8 = 0x01;
    pub const TRUE: u8 = 0x02;
    /// Zigzag varint.
    pub const INT: u8 = 0x03;
    /// Little endian `f64`.
    pub const FLOAT: u8 = 0x04;
    /// Varint length and UTF-8 bytes.
    pub const STRING: u8 = 0x05;
    /// Symbol token.
    pub const SYMBOL: u8 = 0x06;
    /// Zigzag varint seconds and varint nanoseconds since the Unix epoch.
    pub const TIMESTAMP: u8 = 0x08;
    /// Varint length and raw bytes.
    pub const BLOB: u8 = 0x09;
    pub const STRUCT: u8 = 0x0A;
    pub const LIST: u8 = 0x0B;
    /// Annotation prefix: varint count and symbol tokens.
    pub const ANNOTATED: u8 = 0x0C;
    /// Closes the innermost container.
    pub const END: u8 = 0x0F;
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{BinaryReader, BinaryWriter, MAGIC, is_binary};
    use crate::{ContainerKind, DateTime, ValueError, ValueKind, ValueReader, ValueWriter};

    fn encode(f: impl FnOnce(&mut BinaryWriter<Vec<u8>>)) -> Vec<u8> {
        let mut writer = BinaryWriter::new(Vec::new());
        f(&mut writer);
        writer.into_inner().unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        let ts = DateTime::from_timestamp(1_700_000_000, 42).unwrap();
        let bytes = encode(|w| {
            w.write_null().unwrap();
            w.write_bool(true).unwrap();
            w.write_int(-300).unwrap();
            w.write_float(2.5).unwrap();
            w.write_string("hello").unwrap();
            w.write_symbol("sym").unwrap();
            w.write_blob(&[1, 2, 3]).unwrap();
            w.write_timestamp(&ts).unwrap();
        });
        assert!(is_binary(&bytes));

        let mut r = BinaryReader::new(&bytes).unwrap();
        assert_eq!(r.next().unwrap(), Some(ValueKind::Null));
        assert!(r.is_null());
        assert_eq!(r.next().unwrap(), Some(ValueKind::Bool));
        assert!(r.bool_value().unwrap());
        assert_eq!(r.next().unwrap(), Some(ValueKind::Int));
        assert_eq!(r.int_value().unwrap(), -300);
        assert_eq!(r.next().unwrap(), Some(ValueKind::Float));
        assert_eq!(r.float_value().unwrap(), 2.5);
        assert_eq!(r.next().unwrap(), Some(ValueKind::String));
        assert_eq!(r.string_value().unwrap(), "hello");
        assert_eq!(r.next().unwrap(), Some(ValueKind::Symbol));
        assert_eq!(r.string_value().unwrap(), "sym");
        assert_eq!(r.next().unwrap(), Some(ValueKind::Blob));
        assert_eq!(r.blob_value().unwrap(), &[1, 2, 3]);
        assert_eq!(r.next().unwrap(), Some(ValueKind::Timestamp));
        assert_eq!(r.timestamp_value().unwrap(), ts);
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn skipped_containers_keep_symbols_in_sync() {
        let bytes = encode(|w| {
            w.step_in(ContainerKind::Struct).unwrap();
            w.set_field_name("inner");
            w.step_in(ContainerKind::List).unwrap();
            w.write_symbol("shared").unwrap();
            w.step_out().unwrap();
            w.set_field_name("after");
            w.write_symbol("shared").unwrap();
            w.step_out().unwrap();
        });

        let mut r = BinaryReader::new(&bytes).unwrap();
        assert_eq!(r.next().unwrap(), Some(ValueKind::Struct));
        r.step_in().unwrap();
        assert_eq!(r.next().unwrap(), Some(ValueKind::List));
        assert_eq!(r.field_name(), Some("inner"));
        // Not entered: the list body is skipped by the next call.
        assert_eq!(r.next().unwrap(), Some(ValueKind::Symbol));
        assert_eq!(r.field_name(), Some("after"));
        assert_eq!(r.string_value().unwrap(), "shared");
        assert_eq!(r.next().unwrap(), None);
        r.step_out().unwrap();
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn annotations_attach_to_next_value() {
        let bytes = encode(|w| {
            w.add_type_annotation("Circle");
            w.add_type_annotation("Shape");
            w.step_in(ContainerKind::Struct).unwrap();
            w.step_out().unwrap();
            w.write_int(1).unwrap();
        });

        let mut r = BinaryReader::new(&bytes).unwrap();
        r.next().unwrap();
        let annotations: Vec<&str> = r.type_annotations().collect();
        assert_eq!(annotations, ["Circle", "Shape"]);
        r.next().unwrap();
        assert_eq!(r.type_annotations().count(), 0);
    }

    #[test]
    fn step_out_skips_remaining_members() {
        let bytes = encode(|w| {
            w.step_in(ContainerKind::List).unwrap();
            for i in 0..4 {
                w.write_int(i).unwrap();
            }
            w.step_out().unwrap();
            w.write_string("tail").unwrap();
        });

        let mut r = BinaryReader::new(&bytes).unwrap();
        r.next().unwrap();
        r.step_in().unwrap();
        r.next().unwrap();
        assert_eq!(r.int_value().unwrap(), 0);
        r.step_out().unwrap();
        assert_eq!(r.next().unwrap(), Some(ValueKind::String));
        assert_eq!(r.string_value().unwrap(), "tail");
    }

    #[test]
    fn struct_member_requires_field_name() {
        let mut w = BinaryWriter::new(Vec::new());
        w.step_in(ContainerKind::Struct).unwrap();
        assert!(matches!(w.write_int(1), Err(ValueError::InvalidState(_))));
    }

    #[test]
    fn rejects_truncated_and_foreign_input() {
        assert!(matches!(
            BinaryReader::new(b"{}"),
            Err(ValueError::BadMagic)
        ));

        let mut bytes = encode(|w| w.write_string("truncated").unwrap());
        bytes.truncate(bytes.len() - 3);
        let mut r = BinaryReader::new(&bytes).unwrap();
        assert!(matches!(
            r.next(),
            Err(ValueError::UnexpectedEof { .. })
        ));

        let foreign = [MAGIC[0], MAGIC[1], MAGIC[2], MAGIC[3], 0x7F];
        let mut r = BinaryReader::new(&foreign).unwrap();
        assert!(matches!(r.next(), Err(ValueError::InvalidTag { tag: 0x7F, .. })));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |levels: usize| {
            encode(|w| {
                for _ in 0..levels {
                    w.step_in(ContainerKind::List).unwrap();
                }
                for _ in 0..levels {
                    w.step_out().unwrap();
                }
            })
        };

        let bytes = nested(crate::MAX_DEPTH);
        let mut r = BinaryReader::new(&bytes).unwrap();
        for _ in 0..crate::MAX_DEPTH {
            assert_eq!(r.next().unwrap(), Some(ValueKind::List));
            r.step_in().unwrap();
        }
        assert_eq!(r.next().unwrap(), None);

        let bytes = nested(crate::MAX_DEPTH + 1);
        let mut r = BinaryReader::new(&bytes).unwrap();
        for _ in 0..crate::MAX_DEPTH {
            r.next().unwrap();
            r.step_in().unwrap();
        }
        assert_eq!(r.next().unwrap(), Some(ValueKind::List));
        assert!(matches!(r.step_in(), Err(ValueError::TooDeep { .. })));

        // Skipping walks the same bodies and stops at the same limit.
        let mut r = BinaryReader::new(&bytes).unwrap();
        r.next().unwrap();
        assert!(matches!(r.next(), Err(ValueError::TooDeep { .. })));

        let bytes = nested(crate::MAX_DEPTH);
        let mut r = BinaryReader::new(&bytes).unwrap();
        r.next().unwrap();
        assert_eq!(r.next().unwrap(), None);
    }

    #[test]
    fn repeated_symbols_are_interned() {
        let once = encode(|w| w.write_symbol("a-fairly-long-symbol").unwrap());
        let twice = encode(|w| {
            w.write_symbol("a-fairly-long-symbol").unwrap();
            w.write_symbol("a-fairly-long-symbol").unwrap();
        });
        // The second occurrence costs a tag and a one byte reference.
        assert_eq!(twice.len(), once.len() + 2);
    }
}
