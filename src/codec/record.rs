//! The record codec and the machinery that binds a schema's fields to a
//! Rust struct's fields.
//!
//! The schema is in the driving seat: the codec walks the schema's fields
//! in order, decoding the ones the target type carries and skipping the
//! rest. Absence in the target type is the sole mechanism for reader-side
//! projection. Target types describe their fields through [`RecordBind`],
//! normally via the [`avro_record!`](crate::avro_record) macro.

use super::skip::Skipper;
use super::{BoxCodec, Codec};
use crate::bind::{Bind, CodecSet, Reset};
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};
use crate::schema::common::Name;
use crate::schema::{RecordSchema, Schema};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A type decodable as an Avro record. Implemented by the
/// [`avro_record!`](crate::avro_record) macro, which describes each field
/// as a wire name, an optional flag and a pair of typed accessors.
pub trait RecordBind: Default + Reset + Send + Sync + Sized + 'static {
    /// The record name used when synthesizing a schema.
    fn record_name() -> &'static str;

    /// The record namespace, normally derived from the defining module's
    /// path.
    fn record_namespace() -> String;

    /// The bindable fields, in declaration order.
    fn field_specs() -> Vec<FieldSpec<Self>>;
}

/// Describes one bindable field of a record type: its wire name, whether
/// zero values should be elided (`omitempty`), and typed accessors used to
/// build the field's codec.
pub struct FieldSpec<R> {
    pub(crate) name: &'static str,
    pub(crate) optional: bool,
    pub(crate) binder: Box<dyn FieldBinder<R>>,
}

impl<R: Send + Sync + 'static> FieldSpec<R> {
    /// Creates a spec binding a field of type `F` through the given
    /// accessors.
    pub fn new<F: Bind>(
        name: &'static str,
        optional: bool,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> FieldSpec<R> {
        FieldSpec {
            name,
            optional,
            binder: Box::new(Accessor { get, get_mut }),
        }
    }
}

/// Builds a typed field codec or a synthesized schema for one field. The
/// indirection erases the field's type from [`FieldSpec`].
pub(crate) trait FieldBinder<R>: Send + Sync {
    fn bind(&self, schema: &Schema, set: &CodecSet, optional: bool)
        -> Result<Box<dyn FieldCodec<R>>>;
    fn synthesize(&self, set: &CodecSet) -> Result<Schema>;
}

struct Accessor<R, F> {
    get: fn(&R) -> &F,
    get_mut: fn(&mut R) -> &mut F,
}

impl<R: Send + Sync + 'static, F: Bind> FieldBinder<R> for Accessor<R, F> {
    fn bind(
        &self,
        schema: &Schema,
        set: &CodecSet,
        optional: bool,
    ) -> Result<Box<dyn FieldCodec<R>>> {
        let codec = crate::bind::build::<F>(schema, set, optional)?;
        Ok(Box::new(BoundField {
            codec,
            get: self.get,
            get_mut: self.get_mut,
        }))
    }

    fn synthesize(&self, set: &CodecSet) -> Result<Schema> {
        crate::bind::synthesize::<F>(set)
    }
}

/// A field codec tied to its offset within the record type, expressed as a
/// pair of accessors rather than raw pointer arithmetic.
pub(crate) trait FieldCodec<R>: Send + Sync {
    fn read(&self, buf: &mut ReadBuf<'_>, record: &mut R) -> Result<()>;
    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()>;
    fn omit(&self, record: &R) -> bool;
    fn write(&self, buf: &mut WriteBuf, record: &R) -> Result<()>;
}

struct BoundField<R, F> {
    codec: BoxCodec<F>,
    get: fn(&R) -> &F,
    get_mut: fn(&mut R) -> &mut F,
}

impl<R: Send + Sync, F> FieldCodec<R> for BoundField<R, F> {
    fn read(&self, buf: &mut ReadBuf<'_>, record: &mut R) -> Result<()> {
        self.codec.read(buf, (self.get_mut)(record))
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        self.codec.skip(buf)
    }

    fn omit(&self, record: &R) -> bool {
        self.codec.omit((self.get)(record))
    }

    fn write(&self, buf: &mut WriteBuf, record: &R) -> Result<()> {
        self.codec.write(buf, (self.get)(record))
    }
}

enum RecordEntry<R> {
    /// The field exists in the target type.
    Bound {
        name: String,
        codec: Box<dyn FieldCodec<R>>,
    },
    /// The field exists only in the schema and is skipped on read. Writing
    /// a record through a codec with absent fields is impossible.
    Absent { name: String, skipper: Skipper },
}

/// Codec for `record` bound to a [`RecordBind`] type.
pub struct RecordCodec<R> {
    entries: Vec<RecordEntry<R>>,
}

impl<R: RecordBind> Codec for RecordCodec<R> {
    type Target = R;

    fn read(&self, buf: &mut ReadBuf<'_>, record: &mut R) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                RecordEntry::Bound { name, codec } => codec
                    .read(buf, record)
                    .map_err(|e| Error::field(index, name, e))?,
                RecordEntry::Absent { name, skipper } => skipper
                    .skip(buf)
                    .map_err(|e| Error::field(index, name, e))?,
            }
        }
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                RecordEntry::Bound { name, codec } => codec
                    .skip(buf)
                    .map_err(|e| Error::field(index, name, e))?,
                RecordEntry::Absent { name, skipper } => skipper
                    .skip(buf)
                    .map_err(|e| Error::field(index, name, e))?,
            }
        }
        Ok(())
    }

    fn new_value(&self) -> R {
        R::default()
    }

    fn write(&self, buf: &mut WriteBuf, record: &R) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                RecordEntry::Bound { name, codec } => codec
                    .write(buf, record)
                    .map_err(|e| Error::field(index, name, e))?,
                RecordEntry::Absent { name, .. } => {
                    return Err(Error::Unsupported(format!(
                        "encoding a record with unbound field {name:?}"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Builds a record codec for `R` against a record schema. Schema fields
/// with no counterpart in `R` are wired to skip.
pub(crate) fn build_record<R: RecordBind>(
    schema: &RecordSchema,
    set: &CodecSet,
) -> Result<BoxCodec<R>> {
    let mut by_name: HashMap<&'static str, FieldSpec<R>> = R::field_specs()
        .into_iter()
        .map(|spec| (spec.name, spec))
        .collect();

    let mut entries = Vec::with_capacity(schema.fields.len());
    for (index, (name, field_schema)) in schema.fields.iter().enumerate() {
        let entry = match by_name.remove(name.as_str()) {
            Some(spec) => RecordEntry::Bound {
                name: name.clone(),
                codec: spec
                    .binder
                    .bind(field_schema, set, spec.optional)
                    .map_err(|e| Error::field(index, name, e))?,
            },
            None => RecordEntry::Absent {
                name: name.clone(),
                skipper: Skipper::for_schema(field_schema)?,
            },
        };
        entries.push(entry);
    }

    Ok(Box::new(RecordCodec { entries }))
}

/// Entry point for the `Bind` impl generated by
/// [`avro_record!`](crate::avro_record).
#[doc(hidden)]
pub fn bind_record<R: RecordBind>(schema: &Schema, set: &CodecSet) -> Result<BoxCodec<R>> {
    match schema {
        Schema::Record(record) => build_record::<R>(record, set),
        other => Err(Error::Malformed(format!(
            "schema {} cannot be decoded into record type {}",
            other.kind_name(),
            R::record_name()
        ))),
    }
}

/// Synthesizes the record schema for `R`: fields in declaration order,
/// `omitempty` leaves promoted to `[null, T]`.
#[doc(hidden)]
pub fn record_bind_schema<R: RecordBind>(set: &CodecSet) -> Result<Schema> {
    let specs = R::field_specs();
    let mut fields = IndexMap::with_capacity(specs.len());
    for spec in specs {
        let mut schema = spec.binder.synthesize(set)?;
        if spec.optional && !matches!(schema, Schema::Union(_)) {
            schema = Schema::nullable(schema);
        }
        if fields.insert(spec.name.to_string(), schema).is_some() {
            return Err(Error::Malformed(format!(
                "record type {} declares field {:?} twice",
                R::record_name(),
                spec.name
            )));
        }
    }
    Ok(Schema::Record(RecordSchema {
        name: Name::with_namespace(R::record_name(), &R::record_namespace())?,
        fields,
    }))
}

/// Implements [`RecordBind`], [`Bind`](crate::Bind) and
/// [`Reset`](crate::Reset) for an existing struct, describing how its
/// fields map onto an Avro record.
///
/// Field forms:
///
/// - `field: Type`: the wire name is the field name;
/// - `field: Type as "wire_name"`: renamed on the wire;
/// - `field: Type [omitempty]`: zero values are written as the null
///   branch of a nullable union (combinable with a rename);
/// - `field: Type as skip`: not bound and not part of the synthesized
///   schema.
///
/// ```
/// use bqavro::{avro_record, Str};
///
/// #[derive(Debug, Default)]
/// struct Row {
///     name: Str,
///     hat: Str,
///     score: i64,
/// }
///
/// avro_record!(Row {
///     name: Str,
///     hat: Str as "hat_colour",
///     score: i64 [omitempty],
/// });
/// ```
#[macro_export]
macro_rules! avro_record {
    ($name:ident { $($field:ident : $ty:ty $(as $wire:tt)? $([$flag:ident])?),* $(,)? }) => {
        impl $crate::Reset for $name {
            fn reset(&mut self) {
                $( $crate::Reset::reset(&mut self.$field); )*
            }
        }

        impl $crate::RecordBind for $name {
            fn record_name() -> &'static str {
                stringify!($name)
            }

            fn record_namespace() -> String {
                module_path!().replace("::", ".").replace('-', "_")
            }

            fn field_specs() -> Vec<$crate::FieldSpec<Self>> {
                let mut specs = Vec::new();
                $( $crate::avro_record!(@spec specs, $name, $field, $ty $(, $wire)? $(, $flag)?); )*
                specs
            }
        }

        impl $crate::Bind for $name {
            fn bind(
                schema: &$crate::Schema,
                set: &$crate::CodecSet,
                _optional: bool,
            ) -> $crate::Result<$crate::BoxCodec<Self>> {
                $crate::codec::record::bind_record::<Self>(schema, set)
            }

            fn schema(set: &$crate::CodecSet) -> $crate::Result<$crate::Schema> {
                $crate::codec::record::record_bind_schema::<Self>(set)
            }
        }
    };

    (@spec $specs:ident, $R:ident, $field:ident, $ty:ty) => {
        $specs.push($crate::FieldSpec::new::<$ty>(
            stringify!($field),
            false,
            |r: &$R| &r.$field,
            |r: &mut $R| &mut r.$field,
        ));
    };
    (@spec $specs:ident, $R:ident, $field:ident, $ty:ty, skip) => {};
    (@spec $specs:ident, $R:ident, $field:ident, $ty:ty, $wire:literal) => {
        $specs.push($crate::FieldSpec::new::<$ty>(
            $wire,
            false,
            |r: &$R| &r.$field,
            |r: &mut $R| &mut r.$field,
        ));
    };
    (@spec $specs:ident, $R:ident, $field:ident, $ty:ty, omitempty) => {
        $specs.push($crate::FieldSpec::new::<$ty>(
            stringify!($field),
            true,
            |r: &$R| &r.$field,
            |r: &mut $R| &mut r.$field,
        ));
    };
    (@spec $specs:ident, $R:ident, $field:ident, $ty:ty, $wire:literal, omitempty) => {
        $specs.push($crate::FieldSpec::new::<$ty>(
            $wire,
            true,
            |r: &$R| &r.$field,
            |r: &mut $R| &mut r.$field,
        ));
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Str;
    use std::str::FromStr;

    #[derive(Debug, Default, PartialEq)]
    struct Hatted {
        name: Str,
        hat: Str,
        count: i64,
        internal: String,
    }

    avro_record!(Hatted {
        name: Str,
        hat: Str as "hat_colour",
        count: i64 [omitempty],
        internal: String as skip,
    });

    fn hatted_schema() -> Schema {
        Schema::from_str(
            r#"{
                "type": "record",
                "name": "Hatted",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "hat_colour", "type": "string"},
                    {"name": "count", "type": "long"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn reads_fields_in_schema_order() {
        let set = CodecSet::new();
        let codec = crate::bind::build::<Hatted>(&hatted_schema(), &set, false).unwrap();

        // "jim", "cat", 3
        let data = [
            0x06, b'j', b'i', b'm', 0x06, b'c', b'a', b't', 0x06,
        ];
        let mut buf = ReadBuf::new(&data);
        let mut record = Hatted::default();
        codec.read(&mut buf, &mut record).unwrap();
        assert_eq!(record.name, "jim");
        assert_eq!(record.hat, "cat");
        assert_eq!(record.count, 3);
        assert!(buf.is_empty());

        let mut buf = ReadBuf::new(&data);
        codec.skip(&mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn unbound_schema_fields_are_skipped() {
        // Same wire data decoded into a narrower type must agree with the
        // wide decode on the fields they share.
        #[derive(Debug, Default)]
        struct JustName {
            name: Str,
        }
        avro_record!(JustName { name: Str });

        let set = CodecSet::new();
        let codec = crate::bind::build::<JustName>(&hatted_schema(), &set, false).unwrap();
        let data = [
            0x06, b'j', b'i', b'm', 0x06, b'c', b'a', b't', 0x06,
        ];
        let mut buf = ReadBuf::new(&data);
        let mut record = JustName::default();
        codec.read(&mut buf, &mut record).unwrap();
        assert_eq!(record.name, "jim");
        assert!(buf.is_empty());
    }

    #[test]
    fn write_requires_full_coverage() {
        #[derive(Debug, Default)]
        struct JustHat {
            hat: Str,
        }
        avro_record!(JustHat { hat: Str as "hat_colour" });

        let set = CodecSet::new();
        let codec = crate::bind::build::<JustHat>(&hatted_schema(), &set, false).unwrap();
        let mut out = WriteBuf::new();
        let record = JustHat { hat: Str::from("cat") };
        assert!(matches!(
            codec.write(&mut out, &record),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn field_errors_carry_context() {
        let set = CodecSet::new();
        let codec = crate::bind::build::<Hatted>(&hatted_schema(), &set, false).unwrap();
        // Truncated inside the second field.
        let data = [0x06, b'j', b'i', b'm', 0x06, b'c'];
        let mut buf = ReadBuf::new(&data);
        let mut record = Hatted::default();
        let err = codec.read(&mut buf, &mut record).unwrap_err();
        match err {
            Error::Field { index, name, .. } => {
                assert_eq!(index, 1);
                assert_eq!(name, "hat_colour");
            }
            other => panic!("expected field context, got {other:?}"),
        }
    }

    #[test]
    fn synthesized_schema_follows_field_rules() {
        let set = CodecSet::new();
        let schema = crate::bind::synthesize::<Hatted>(&set).unwrap();
        let record = match &schema {
            Schema::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(record.name.simple(), "Hatted");
        assert!(record
            .name
            .namespace()
            .unwrap()
            .starts_with("bqavro.codec.record"));
        let names: Vec<&String> = record.fields.keys().collect();
        // The skip field is absent; omitempty promoted count to a union.
        assert_eq!(names, ["name", "hat_colour", "count"]);
        assert_eq!(record.fields["count"], Schema::nullable(Schema::long()));
        assert_eq!(record.fields["name"], Schema::String);
    }

    #[test]
    fn reset_clears_every_field() {
        let mut record = Hatted {
            name: Str::from("jim"),
            hat: Str::from("cat"),
            count: 9,
            internal: "scratch".into(),
        };
        record.reset();
        assert_eq!(record, Hatted::default());
    }
}
