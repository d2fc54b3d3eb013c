//! The entry point: write and read whole object graphs.

use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::str;
use std::io;
use std::sync::LazyLock;

use vc_value::binary::{BinaryReader, BinaryWriter, is_binary};
use vc_value::text::TextWriter;
use vc_value::{ValueError, ValueKind, ValueReader, ValueWriter};

use crate::binding::unbox;
use crate::collection::CollectionBinding;
use crate::{
    Bind, BindingProducer, ErrorKind, ReadConfiguration, ReadContext, ReadReport, ReadSession, Result,
    SerializationError, WriteConfiguration, WriteContext,
};

static SHARED: LazyLock<ObjectSerializer> = LazyLock::new(ObjectSerializer::new);

/// Writes values through their bindings and reads them back.
///
/// Every serializer owns a [`BindingProducer`], so bindings are built once
/// per type and reused by every call. A serializer can be shared between
/// threads; each call keeps its own identity maps.
///
/// # Examples
///
/// ```
/// use vc_binding::{Bean, ObjectSerializer, WriteConfiguration};
///
/// #[derive(Bean, Default, Debug, PartialEq)]
/// #[bean(default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let serializer = ObjectSerializer::new();
/// let config = WriteConfiguration::default().with_binary(false);
/// let text = serializer.to_text(&Point { x: 1, y: 2 }, &config).unwrap();
/// assert!(text.contains("x: 1"));
///
/// let point: Point = serializer.read_text(&text, &Default::default()).unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
pub struct ObjectSerializer {
    producer: BindingProducer,
}

impl Default for ObjectSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSerializer {
    pub fn new() -> Self {
        Self {
            producer: BindingProducer::new(),
        }
    }

    /// A process-wide serializer, created on first use.
    #[inline]
    pub fn shared() -> &'static ObjectSerializer {
        &SHARED
    }

    #[inline]
    pub fn producer(&self) -> &BindingProducer {
        &self.producer
    }

    // -------------------------------------------------------------------------
    // Write

    /// Writes `value` to `out`, binary or pretty text per `config.binary`.
    pub fn write<T: Bind>(&self, value: &T, out: impl io::Write, config: &WriteConfiguration) -> Result<()> {
        let binding = self.producer.root_binding::<T>()?;
        self.write_with(out, config.binary, config, |ctx| binding.serialize(value, ctx))
    }

    /// Writes `value` into a new buffer.
    pub fn to_bytes<T: Bind>(&self, value: &T, config: &WriteConfiguration) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(value, &mut out, config)?;
        Ok(out)
    }

    /// Writes `value` as pretty text, whatever `config.binary` says.
    pub fn to_text<T: Bind>(&self, value: &T, config: &WriteConfiguration) -> Result<String> {
        let binding = self.producer.root_binding::<T>()?;
        let mut out = Vec::new();
        self.write_with(&mut out, false, config, |ctx| binding.serialize(value, ctx))?;
        String::from_utf8(out).map_err(|error| {
            ValueError::InvalidUtf8 {
                offset: error.utf8_error().valid_up_to(),
            }
            .into()
        })
    }

    /// Writes `value` as the next value of `writer`.
    ///
    /// The writer is not finished, more values may follow.
    pub fn write_to<T: Bind>(
        &self,
        value: &T,
        writer: &mut dyn ValueWriter,
        config: &WriteConfiguration,
    ) -> Result<()> {
        let binding = self.producer.root_binding::<T>()?;
        let mut ctx = WriteContext::new(writer, config, &self.producer);
        binding.serialize(value, &mut ctx)
    }

    /// Writes `items` as a `LIST`, readable as a `Vec<T>`.
    pub fn write_list<T: Bind>(&self, items: &[T], out: impl io::Write, config: &WriteConfiguration) -> Result<()> {
        let binding = self.producer.root_binding::<Vec<T>>()?;
        let binding: &dyn Any = &*binding;
        let Some(list) = binding.downcast_ref::<CollectionBinding<Vec<T>>>() else {
            return Err(SerializationError::unsupported(alloc::format!(
                "`{}` is not written as a list",
                type_name::<Vec<T>>()
            )));
        };
        self.write_with(out, config.binary, config, |ctx| list.write_items(items, ctx))
    }

    /// Runs `body` against a fresh writer over `out` and finishes it.
    pub(crate) fn write_with(
        &self,
        out: impl io::Write,
        binary: bool,
        config: &WriteConfiguration,
        body: impl FnOnce(&mut WriteContext<'_>) -> Result<()>,
    ) -> Result<()> {
        if binary {
            let mut writer = BinaryWriter::new(out);
            self.run_writer(&mut writer, config, body)
        } else {
            let mut writer = TextWriter::pretty(out);
            self.run_writer(&mut writer, config, body)
        }
    }

    fn run_writer(
        &self,
        writer: &mut dyn ValueWriter,
        config: &WriteConfiguration,
        body: impl FnOnce(&mut WriteContext<'_>) -> Result<()>,
    ) -> Result<()> {
        {
            let mut ctx = WriteContext::new(&mut *writer, config, &self.producer);
            body(&mut ctx)?;
        }
        writer.finish()?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read

    /// Reads the root value of `input`, binary or text.
    pub fn read<T: Bind>(&self, input: &[u8], config: &ReadConfiguration) -> Result<T> {
        self.read_with_report(input, config).map(|(value, _)| value)
    }

    /// Reads the root value of a text document.
    pub fn read_text<T: Bind>(&self, text: &str, config: &ReadConfiguration) -> Result<T> {
        let binding = self.producer.root_binding::<T>()?;
        let mut reader = vc_value::text::reader(text)?;
        let (value, _) = self.read_from_with(&mut reader, config, |ctx| unbox::<T>(binding.deserialize(ctx)?))?;
        Ok(value)
    }

    /// Reads the next value of `reader`.
    pub fn read_from<T: Bind>(&self, reader: &mut dyn ValueReader, config: &ReadConfiguration) -> Result<T> {
        let binding = self.producer.root_binding::<T>()?;
        let (value, _) = self.read_from_with(reader, config, |ctx| unbox::<T>(binding.deserialize(ctx)?))?;
        Ok(value)
    }

    /// Like [`read`](Self::read), also returning the ignored fields.
    pub fn read_with_report<T: Bind>(&self, input: &[u8], config: &ReadConfiguration) -> Result<(T, ReadReport)> {
        let binding = self.producer.root_binding::<T>()?;
        self.read_with(input, config, |ctx| unbox::<T>(binding.deserialize(ctx)?))
    }

    /// Reads the root value of `input` into an existing value.
    ///
    /// Collections and maps are cleared and refilled in place.
    pub fn read_into<T: Bind>(&self, target: &mut T, input: &[u8], config: &ReadConfiguration) -> Result<()> {
        let binding = self.producer.root_binding::<T>()?;
        self.read_with(input, config, |ctx| binding.deserialize_into(target, ctx))?;
        Ok(())
    }

    /// Reads a root `LIST`, see [`write_list`](Self::write_list).
    #[inline]
    pub fn read_list<T: Bind>(&self, input: &[u8], config: &ReadConfiguration) -> Result<Vec<T>> {
        self.read::<Vec<T>>(input, config)
    }

    /// Opens a reader over `input`, detecting the encoding, and runs `body`
    /// on its root value.
    pub(crate) fn read_with<R>(
        &self,
        input: &[u8],
        config: &ReadConfiguration,
        body: impl FnOnce(&mut ReadContext<'_, '_>) -> Result<R>,
    ) -> Result<(R, ReadReport)> {
        if is_binary(input) {
            let mut reader = BinaryReader::new(input)?;
            return self.read_from_with(&mut reader, config, body);
        }
        let text = str::from_utf8(input).map_err(|error| ValueError::InvalidUtf8 {
            offset: error.valid_up_to(),
        })?;
        let mut reader = vc_value::text::reader(text)?;
        self.read_from_with(&mut reader, config, body)
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn read_from_with<R>(
        &self,
        reader: &mut dyn ValueReader,
        config: &ReadConfiguration,
        body: impl FnOnce(&mut ReadContext<'_, '_>) -> Result<R>,
    ) -> Result<(R, ReadReport)> {
        let mut session = ReadSession::new(config, &self.producer);
        let value = {
            let mut ctx = session.context(reader);
            match ctx.reader().next()? {
                None | Some(ValueKind::Null) => {
                    return Err(SerializationError::new(ErrorKind::EmptyInput, "no root value to read"));
                }
                Some(_) => body(&mut ctx)?,
            }
        };
        Ok((value, session.into_report()))
    }
}

impl core::fmt::Debug for ObjectSerializer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectSerializer")
            .field("producer", &self.producer)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use core::any::Any;
    use std::collections::HashMap;

    use vc_value::{DateTime, Utc};

    use super::ObjectSerializer;
    use crate::{
        Bean, ConstructError, ErrorKind, ReadConfiguration, Shared, WriteConfiguration, impl_closed_polymorphic,
    };

    fn binary() -> WriteConfiguration {
        WriteConfiguration::default()
    }

    fn text() -> WriteConfiguration {
        WriteConfiguration::default().with_binary(false)
    }

    fn read_config() -> ReadConfiguration {
        ReadConfiguration::default()
    }

    #[derive(Bean, Default, Debug, Clone, PartialEq)]
    #[bean(default)]
    struct Record {
        id: i64,
        name: String,
        tags: Vec<String>,
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct RecordWithExtra {
        id: i64,
        name: String,
        tags: Vec<String>,
        extra: i32,
    }

    fn record() -> Record {
        Record {
            id: 7,
            name: "seven".to_string(),
            tags: vec!["odd".to_string(), "prime".to_string()],
        }
    }

    #[test]
    fn record_round_trips_in_both_encodings() {
        let serializer = ObjectSerializer::new();
        for config in [binary(), text()] {
            let bytes = serializer.to_bytes(&record(), &config).unwrap();
            let back: Record = serializer.read(&bytes, &read_config()).unwrap();
            assert_eq!(back, record());
        }
    }

    #[test]
    fn binary_output_is_detected() {
        let serializer = ObjectSerializer::new();
        let bytes = serializer.to_bytes(&record(), &binary()).unwrap();
        assert!(vc_value::binary::is_binary(&bytes));

        let text = serializer.to_text(&record(), &binary()).unwrap();
        assert!(text.contains("name: seven"));
        let back: Record = serializer.read_text(&text, &read_config()).unwrap();
        assert_eq!(back, record());
    }

    #[test]
    fn empty_tags_are_compacted() {
        let serializer = ObjectSerializer::new();
        let config = binary().with_skip_null_and_empty();
        let empty = Record {
            id: 1,
            name: String::new(),
            tags: Vec::new(),
        };

        let compact = serializer.to_bytes(&empty, &config).unwrap();
        let populated = serializer.to_bytes(&record(), &config).unwrap();
        assert!(compact.len() < populated.len());

        let text = serializer.to_text(&empty, &config).unwrap();
        assert!(!text.contains("name"));
        assert!(text.contains("tags: 0"));

        let back: Record = serializer.read(&compact, &read_config()).unwrap();
        assert_eq!(back, empty);
    }

    #[test]
    fn unknown_fields_are_reported_once() {
        let serializer = ObjectSerializer::new();
        let newer = RecordWithExtra {
            id: 3,
            extra: 9,
            ..Default::default()
        };
        let bytes = serializer.to_bytes(&newer, &binary()).unwrap();

        let (back, report) = serializer.read_with_report::<Record>(&bytes, &read_config()).unwrap();
        assert_eq!(back.id, 3);
        assert_eq!(report.unknown_fields.len(), 1);
        assert_eq!(report.unknown_fields[0].field, "extra");
        assert_eq!(report.unknown_fields[0].type_name, Record::TYPE_PATH);
    }

    #[test]
    fn read_into_reuses_the_target() {
        let serializer = ObjectSerializer::new();
        let bytes = serializer.to_bytes(&vec![1, 2], &binary()).unwrap();
        let mut target = vec![9, 9, 9];
        serializer.read_into(&mut target, &bytes, &read_config()).unwrap();
        assert_eq!(target, [1, 2]);
    }

    #[test]
    fn lists_of_beans() {
        let serializer = ObjectSerializer::new();
        let items = [record(), Record::default()];
        let mut out = Vec::new();
        serializer.write_list(&items, &mut out, &binary()).unwrap();

        let back: Vec<Record> = serializer.read_list(&out, &read_config()).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn empty_or_null_input() {
        let serializer = ObjectSerializer::new();
        let error = serializer.read::<i32>(b"", &read_config()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmptyInput);
        let error = serializer.read::<i32>(b"null", &read_config()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmptyInput);
        let error = serializer.read::<i32>(&[0xff, 0xfe], &read_config()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[test]
    fn unsupported_primitives() {
        let serializer = ObjectSerializer::new();
        let error = serializer.to_bytes(&'c', &binary()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        let error = serializer.to_bytes(&vec![1i8], &binary()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert_eq!(serializer.producer().cached_len(), 0);
    }

    // -------------------------------------------------------------------------
    // Identity

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Node {
        name: String,
        next: Option<Shared<Node>>,
    }

    #[test]
    fn cycles_through_shared() {
        let serializer = ObjectSerializer::new();
        let a = Shared::new(Node {
            name: "a".to_string(),
            next: None,
        });
        let b = Shared::new(Node {
            name: "b".to_string(),
            next: Some(a.clone()),
        });
        a.borrow_mut().next = Some(b.clone());

        let bytes = serializer.to_bytes(&a, &binary()).unwrap();
        let back: Shared<Node> = serializer.read(&bytes, &read_config()).unwrap();

        let second = back.borrow().next.clone().unwrap();
        assert_eq!(second.borrow().name, "b");
        let third = second.borrow().next.clone().unwrap();
        assert!(Shared::ptr_eq(&third, &back));

        // Break the cycles.
        a.borrow_mut().next = None;
        back.borrow_mut().next = None;
    }

    #[derive(Bean, Default, Debug, PartialEq)]
    #[bean(default)]
    struct Leaf {
        value: i32,
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Diamond {
        left: Option<Rc<Leaf>>,
        right: Option<Rc<Leaf>>,
    }

    #[test]
    fn diamonds_keep_identity() {
        let serializer = ObjectSerializer::new();
        let leaf = Rc::new(Leaf { value: 4 });
        let diamond = Diamond {
            left: Some(leaf.clone()),
            right: Some(leaf),
        };

        let text = serializer.to_text(&diamond, &text()).unwrap();
        assert!(text.contains("right: 1"));

        let back: Diamond = serializer.read_text(&text, &read_config()).unwrap();
        let (left, right) = (back.left.unwrap(), back.right.unwrap());
        assert!(Rc::ptr_eq(&left, &right));
        assert_eq!(*left, Leaf { value: 4 });
    }

    #[test]
    fn owned_beans_have_no_identity() {
        let serializer = ObjectSerializer::new();
        let text = serializer.to_text(&Leaf { value: 1 }, &text()).unwrap();
        assert!(!text.contains("@id"));
    }

    #[derive(Bean)]
    #[bean(constructor = Chain::new, params = "id")]
    struct Chain {
        id: u32,
        next: Option<Shared<Chain>>,
    }

    impl Chain {
        fn new(id: u32) -> Self {
            Self { id, next: None }
        }
    }

    #[test]
    fn constructed_shared_beans_may_refer_to_themselves() {
        let serializer = ObjectSerializer::new();
        let link = Shared::new(Chain::new(5));
        link.borrow_mut().next = Some(link.clone());

        let text = serializer.to_text(&link, &text()).unwrap();
        assert!(text.contains("next: 1"));

        let back: Shared<Chain> = serializer.read_text(&text, &read_config()).unwrap();
        assert_eq!(back.borrow().id, 5);
        let next = back.borrow().next.clone().unwrap();
        assert!(Shared::ptr_eq(&next, &back));

        link.borrow_mut().next = None;
        back.borrow_mut().next = None;
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Tree {
        child: Option<Rc<Tree>>,
    }

    #[test]
    fn rc_cannot_refer_to_itself() {
        let serializer = ObjectSerializer::new();
        let error = serializer
            .read_text::<Rc<Tree>>("{ '@id': 1, child: 1 }", &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::UnknownReference);

        let back: Rc<Tree> = serializer
            .read_text("{ '@id': 1, child: { '@id': 2 } }", &read_config())
            .unwrap();
        assert!(back.child.as_ref().unwrap().child.is_none());
    }

    // -------------------------------------------------------------------------
    // Polymorphism

    trait Shape: Any {
        fn area(&self) -> f64;
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Square {
        side: f64,
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Circle {
        radius: f64,
    }

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.side * self.side
        }
    }

    impl Shape for Circle {
        fn area(&self) -> f64 {
            3.0 * self.radius * self.radius
        }
    }

    impl_closed_polymorphic!(dyn Shape => [Square, Circle]);

    #[test]
    fn closed_subtypes_are_annotated_by_simple_name() {
        let serializer = ObjectSerializer::new();
        let shapes: Vec<Box<dyn Shape>> = vec![Box::new(Square { side: 2.0 }), Box::new(Circle { radius: 1.0 })];

        let text = serializer.to_text(&shapes, &text()).unwrap();
        assert!(text.contains("Square::{"));
        assert!(text.contains("Circle::{"));

        let back: Vec<Box<dyn Shape>> = serializer.read_text(&text, &read_config()).unwrap();
        let areas: Vec<f64> = back.iter().map(|shape| shape.area()).collect();
        assert_eq!(areas, [4.0, 3.0]);
        assert!((&*back[1] as &dyn Any).is::<Circle>());
    }

    #[test]
    fn closed_subtypes_reject_unknown_annotations() {
        let serializer = ObjectSerializer::new();
        let error = serializer
            .read_text::<Box<dyn Shape>>("Hexagon::{ side: 1e0 }", &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
        assert!(error.message().contains("Square"));

        let error = serializer
            .read_text::<Box<dyn Shape>>("{ side: 1e0 }", &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
    }

    // -------------------------------------------------------------------------
    // Constructors

    #[derive(Bean, Debug, PartialEq)]
    #[bean(constructor = Point::new, params = "y, x")]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Point {
        fn new(y: i32, x: i32) -> Self {
            Self { x, y }
        }
    }

    #[derive(Bean, Debug, PartialEq)]
    struct Attachment {
        created: DateTime<Utc>,
        data: Vec<u8>,
        note: Option<String>,
    }

    #[derive(Bean, Debug, PartialEq)]
    #[bean(constructor = Span::new, arity = 2, primary = false)]
    struct Span {
        start: i64,
        end: i64,
    }

    impl Span {
        fn new(start: i64, end: i64) -> Self {
            Self { start, end }
        }
    }

    #[derive(Bean, Debug)]
    #[bean(constructor = Percent::new, params = "value", fallible)]
    struct Percent {
        value: u16,
    }

    impl Percent {
        fn new(value: u16) -> Result<Self, String> {
            if value > 100 {
                return Err(alloc::format!("{value} is above 100"));
            }
            Ok(Self { value })
        }
    }

    #[derive(Bean, Debug, PartialEq)]
    #[bean(constructor = Labeled::new, params = "id")]
    struct Labeled {
        id: u32,
        label: String,
    }

    impl Labeled {
        fn new(id: u32) -> Self {
            Self {
                id,
                label: String::new(),
            }
        }
    }

    #[derive(Bean, Debug, PartialEq)]
    struct Named {
        id: i64,
        name: String,
        alias: Vec<u8>,
    }

    #[test]
    fn skipped_empty_values_still_construct() {
        let serializer = ObjectSerializer::new();
        let value = Named {
            id: 4,
            name: String::new(),
            alias: Vec::new(),
        };
        let config = text().with_skip_null_and_empty();

        let text = serializer.to_text(&value, &config).unwrap();
        assert!(!text.contains("name"));
        let back: Named = serializer.read_text(&text, &read_config()).unwrap();
        assert_eq!(back, value);

        let back: Named = serializer.read_text("{ id: 4 }", &read_config()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn declared_parameter_names() {
        let serializer = ObjectSerializer::new();
        let bytes = serializer.to_bytes(&Point { x: 1, y: 2 }, &binary()).unwrap();
        let back: Point = serializer.read(&bytes, &read_config()).unwrap();
        assert_eq!(back, Point { x: 1, y: 2 });
    }

    #[test]
    fn primary_constructor_fills_missing_options() {
        let serializer = ObjectSerializer::new();
        let created = DateTime::from_timestamp(1_714_557_600, 0).unwrap();
        let value = Attachment {
            created,
            data: vec![0, 1, 2],
            note: None,
        };

        let text = serializer.to_text(&value, &text().with_skip_null_and_empty()).unwrap();
        assert!(!text.contains("note"));
        let back: Attachment = serializer.read_text(&text, &read_config()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn positional_constructor_needs_a_mapping() {
        let serializer = ObjectSerializer::new();
        let bytes = serializer.to_bytes(&Span { start: 2, end: 5 }, &binary()).unwrap();

        let error = serializer.read::<Span>(&bytes, &read_config()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ConstructorResolution);

        let config = ReadConfiguration::default().with_property_mapping(|info, arity| {
            (info.name() == "Span" && arity == 2).then(|| vec!["start".to_string(), "end".to_string()])
        });
        let back: Span = serializer.read(&bytes, &config).unwrap();
        assert_eq!(back, Span { start: 2, end: 5 });
    }

    #[test]
    fn constructor_failures_name_the_arguments() {
        let serializer = ObjectSerializer::new();
        let error = serializer
            .read_text::<Percent>("{ value: 150 }", &read_config())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Construction);
        assert!(error.message().contains("value: u16"));
        assert!(error.message().contains("150 is above 100"));

        let percent: Percent = serializer.read_text("{ value: 40 }", &read_config()).unwrap();
        assert_eq!(percent.value, 40);
        assert_eq!(ConstructError::custom("x").to_string(), "x");
    }

    #[test]
    fn remaining_properties_are_set_after_construction() {
        let serializer = ObjectSerializer::new();
        let text = "{ label: first, unknown: 1, id: 8 }";
        let bytes = text.as_bytes();

        let (back, report) = serializer.read_with_report::<Labeled>(bytes, &read_config()).unwrap();
        assert_eq!(
            back,
            Labeled {
                id: 8,
                label: "first".to_string()
            }
        );
        assert_eq!(report.unknown_fields.len(), 1);
    }

    #[test]
    fn beans_constructed_hook() {
        let serializer = ObjectSerializer::new();
        let config = ReadConfiguration::default().with_bean_constructed(|value| {
            if let Some(leaf) = value.downcast_mut::<Leaf>() {
                leaf.value += 100;
            }
        });
        let bytes = serializer.to_bytes(&Leaf { value: 1 }, &binary()).unwrap();
        let back: Leaf = serializer.read(&bytes, &config).unwrap();
        assert_eq!(back.value, 101);
    }

    // -------------------------------------------------------------------------
    // Maps

    #[test]
    fn ordered_maps_are_reproducible() {
        let serializer = ObjectSerializer::new();
        let config = binary().with_order_map_entries_by_keys(true);

        let mut first = HashMap::new();
        for (key, value) in [(3, "c"), (1, "a"), (2, "b")] {
            first.insert(key, value.to_string());
        }
        let mut second = HashMap::new();
        for (key, value) in [(2, "b"), (3, "c"), (1, "a")] {
            second.insert(key, value.to_string());
        }

        let a = serializer.to_bytes(&first, &config).unwrap();
        let b = serializer.to_bytes(&second, &config).unwrap();
        assert_eq!(a, b);

        let back: HashMap<i32, String> = serializer.read(&a, &read_config()).unwrap();
        assert_eq!(back, first);
    }

    #[test]
    fn int_maps() {
        let serializer = ObjectSerializer::new();
        let map: HashMap<i32, i32> = [(1, 10), (-2, 20)].into_iter().collect();
        let bytes = serializer.to_bytes(&map, &binary()).unwrap();
        let back: HashMap<i32, i32> = serializer.read(&bytes, &read_config()).unwrap();
        assert_eq!(back, map);

        let wide = "[4294967298, -4294967295]";
        let back: HashMap<i32, i32> = serializer.read_text(wide, &read_config()).unwrap();
        assert_eq!(back, HashMap::from([(2, 1)]));
    }

    #[test]
    fn shared_serializer_is_reused() {
        let first = ObjectSerializer::shared();
        let second = ObjectSerializer::shared();
        assert!(core::ptr::eq(first, second));
    }
}
