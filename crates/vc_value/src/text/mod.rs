//! Human readable encoding.
//!
//! ```text
//! Circle::{
//!   '@id': 1,
//!   name: "unit",
//!   radius: 1e0,
//!   created: 2024-05-01T10:00:00Z,
//!   thumbnail: {{AAEC}},
//!   tags: [
//!     red,
//!     'two words'
//!   ]
//! }
//! ```
//!
//! Strings are double quoted. Symbols are bare identifiers or single
//! quoted. Floats always carry an exponent, `nan`, `+inf` and `-inf`
//! included. Blobs are base64 between `{{` and `}}`. Annotations prefix a
//! value with `name::`. `//` starts a comment.

// -----------------------------------------------------------------------------
// Modules

mod parser;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use parser::parse;
pub use writer::TextWriter;

use alloc::string::String;
use alloc::vec::Vec;

use crate::tree::ElementReader;
use crate::{Element, Result, ValueError, ValueWriter};

/// Parses `text` into a reader over its top-level values.
pub fn reader(text: &str) -> Result<ElementReader> {
    parse(text).map(ElementReader::new)
}

/// Formats an element on a single line.
pub fn to_compact_string(element: &Element) -> Result<String> {
    let mut writer = TextWriter::compact(Vec::new());
    writer.write_element(element)?;
    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|_| ValueError::InvalidState("text writer produced invalid utf-8"))
}

/// Returns `true` if `text` can be written as a bare symbol.
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !is_keyword(text)
}

pub(crate) fn is_keyword(text: &str) -> bool {
    matches!(text, "null" | "true" | "false" | "nan")
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{TextWriter, parse, to_compact_string};
    use crate::{ContainerKind, DateTime, Element, Value, ValueError, ValueWriter};

    fn sample() -> Element {
        let created = DateTime::from_timestamp(1_714_557_600, 0).unwrap();
        Element::new(Value::Struct(vec![
            ("@id".to_string(), Element::new(Value::Int(1))),
            ("name".to_string(), Element::new(Value::String("say \"hi\"\n".to_string()))),
            ("radius".to_string(), Element::new(Value::Float(1.0))),
            ("ratio".to_string(), Element::new(Value::Float(f64::NEG_INFINITY))),
            ("created".to_string(), Element::new(Value::Timestamp(created))),
            ("thumbnail".to_string(), Element::new(Value::Blob(vec![0, 1, 2]))),
            ("missing".to_string(), Element::new(Value::Null)),
            (
                "tags".to_string(),
                Element::new(Value::List(vec![
                    Element::new(Value::Symbol("red".to_string())),
                    Element::new(Value::Symbol("two words".to_string())),
                    Element::new(Value::Symbol("true".to_string())),
                    Element::new(Value::Int(-12)),
                    Element::new(Value::List(Vec::new())),
                ])),
            ),
        ]))
        .with_annotation("Circle")
    }

    #[test]
    fn pretty_output_parses_back() {
        let mut writer = TextWriter::pretty(Vec::new());
        writer.write_element(&sample()).unwrap();
        writer.write_element(&Element::new(Value::Bool(false))).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert!(text.starts_with("Circle::{\n  '@id': 1,\n  name: \"say \\\"hi\\\"\\n\","));
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, vec![sample(), Element::new(Value::Bool(false))]);
    }

    #[test]
    fn compact_form() {
        let element = Element::new(Value::Struct(vec![
            ("a".to_string(), Element::new(Value::Int(1))),
            ("b".to_string(), Element::new(Value::List(vec![Element::new(Value::Float(2.5))]))),
            ("c".to_string(), Element::new(Value::Struct(Vec::new()))),
        ]));
        assert_eq!(to_compact_string(&element).unwrap(), "{a: 1, b: [2.5e0], c: {}}");
        assert_eq!(element.to_string(), "{a: 1, b: [2.5e0], c: {}}");
    }

    #[test]
    fn nan_round_trips() {
        let parsed = parse("[nan, +inf, 1.5, 2E3]").unwrap();
        let members = parsed[0].elements().unwrap();
        assert!(matches!(members[0].value(), Value::Float(v) if v.is_nan()));
        assert_eq!(members[1].value(), &Value::Float(f64::INFINITY));
        assert_eq!(members[2].value(), &Value::Float(1.5));
        assert_eq!(members[3].value(), &Value::Float(2000.0));
    }

    #[test]
    fn comments_and_quoted_names() {
        let parsed = parse("// header\n{ 'odd name': 'sym', \"quoted\": null }").unwrap();
        assert_eq!(
            parsed[0].field("odd name").unwrap().value(),
            &Value::Symbol("sym".to_string())
        );
        assert_eq!(parsed[0].field("quoted").unwrap().value(), &Value::Null);
    }

    #[test]
    fn syntax_errors_carry_positions() {
        let error = parse("{\n  a: 1,\n  b: ]\n}").unwrap_err();
        assert!(matches!(error, ValueError::Syntax { line: 3, column: 6, .. }));
        assert!(parse("[1, 2").is_err());
        assert!(parse("{a 1}").is_err());
        assert!(parse("{{not base64!}}").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |levels: usize| "[".repeat(levels) + &"]".repeat(levels);
        assert_eq!(parse(&nested(crate::MAX_DEPTH)).unwrap().len(), 1);
        assert!(matches!(
            parse(&nested(crate::MAX_DEPTH + 1)),
            Err(ValueError::TooDeep { .. })
        ));
        // Unterminated input fails at the limit rather than at the end.
        let open = "{a:".repeat(crate::MAX_DEPTH * 4);
        assert!(matches!(parse(&open), Err(ValueError::TooDeep { .. })));
    }

    #[test]
    fn writer_rejects_unnamed_struct_members() {
        let mut writer = TextWriter::compact(Vec::new());
        writer.step_in(ContainerKind::Struct).unwrap();
        assert!(writer.write_int(1).is_err());
    }
}
