//! Binding schemas to target types: the [`Bind`] and [`Reset`] traits, the
//! codec [`build`] entry point, schema synthesis and the [`CodecSet`]
//! registry.
//!
//! The builder's rules, in order: union schemas are recognized first (with
//! the nullable-of-T shape specialized), `null` binds the no-op codec for
//! any target, a user-registered builder for the target type wins next, and
//! finally the target type's own [`Bind`] impl dispatches by schema kind,
//! validating compatibility.

use crate::bank::Str;
use crate::codec::array::ArrayCodec;
use crate::codec::bytes::{BytesCodec, FixedCodec, StrCodec, StringCodec};
use crate::codec::map::MapCodec;
use crate::codec::pointer::PointerCodec;
use crate::codec::primitives::{
    BoolCodec, DoubleCodec, FloatAsDoubleCodec, FloatCodec, Int16Codec, Int32Codec, Int64Codec,
    NullCodec, Uint64Codec,
};
use crate::codec::union::{NullableCodec, UnionCodec};
use crate::codec::BoxCodec;
use crate::error::{Error, Result};
use crate::schema::Schema;
use bytes::Bytes;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Returns a value to its zero state while keeping any heap capacity it has
/// accumulated. The decoder resets the caller's record slot with this
/// before decoding each record.
pub trait Reset {
    /// Zeroes the value in place.
    fn reset(&mut self);
}

macro_rules! reset_by_zero {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(impl Reset for $ty {
            fn reset(&mut self) {
                *self = $zero;
            }
        })*
    };
}

reset_by_zero! {
    bool => false,
    i16 => 0,
    i32 => 0,
    i64 => 0,
    u64 => 0,
    f32 => 0.0,
    f64 => 0.0,
    Str => Str::new(),
    Bytes => Bytes::new(),
}

impl Reset for String {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Reset for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<K, V, S> Reset for HashMap<K, V, S> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Reset for Option<T> {
    fn reset(&mut self) {
        *self = None;
    }
}

impl<const N: usize> Reset for [u8; N] {
    fn reset(&mut self) {
        *self = [0; N];
    }
}

/// A type that can be bound to an Avro schema.
///
/// `bind` produces the codec for this type against a non-union schema node;
/// union handling, null handling and registry overrides happen in [`build`]
/// before `bind` is consulted. `schema` synthesizes the BigQuery-canonical
/// Avro schema for this type, used by the [`Encoder`](crate::Encoder).
pub trait Bind: Default + Reset + Send + Sync + Sized + 'static {
    /// Builds a codec for this type against `schema`.
    fn bind(schema: &Schema, set: &CodecSet, optional: bool) -> Result<BoxCodec<Self>>;

    /// Synthesizes the Avro schema this type encodes as.
    fn schema(set: &CodecSet) -> Result<Schema>;
}

/// Builds the codec binding `schema` to target type `T`.
///
/// `optional` marks the enclosing field as `omitempty`: the codec's
/// [`omit`](crate::Codec::omit) then reports zero values so nullable unions
/// write them as null.
pub fn build<T: Bind>(schema: &Schema, set: &CodecSet, optional: bool) -> Result<BoxCodec<T>> {
    match schema {
        Schema::Union(branches) => build_union::<T>(branches, set, optional),
        Schema::Null => Ok(Box::new(NullCodec::default())),
        Schema::Enum(_) => Err(Error::Unsupported("decoding enum values".into())),
        _ => {
            if let Some(codec) = set.build_custom::<T>(schema, optional)? {
                return Ok(codec);
            }
            T::bind(schema, set, optional)
        }
    }
}

fn build_union<T: Bind>(branches: &[Schema], set: &CodecSet, optional: bool) -> Result<BoxCodec<T>> {
    if let Some((non_null, inner)) = Schema::nullable_shape(branches) {
        // Nullable-of-string is common enough in BigQuery exports to earn a
        // statically dispatched codec.
        if matches!(inner, Schema::String) && TypeId::of::<T>() == TypeId::of::<Str>() {
            let codec: BoxCodec<Str> = Box::new(NullableCodec::new(
                StrCodec {
                    omit_empty: optional,
                },
                non_null,
            ));
            let mut slot = Some(codec);
            if let Some(slot) = (&mut slot as &mut dyn Any).downcast_mut::<Option<BoxCodec<T>>>() {
                if let Some(codec) = slot.take() {
                    return Ok(codec);
                }
            }
        }
        let inner = build::<T>(inner, set, optional)?;
        return Ok(Box::new(NullableCodec::new(inner, non_null)));
    }

    let codecs = branches
        .iter()
        .map(|branch| build::<T>(branch, set, optional))
        .collect::<Result<Vec<_>>>()?;
    Ok(Box::new(UnionCodec::new(codecs)))
}

/// Synthesizes the Avro schema for `T`, honoring any schema registered for
/// it in `set`.
pub fn synthesize<T: Bind>(set: &CodecSet) -> Result<Schema> {
    if let Some(schema) = set.schema_override::<T>() {
        return Ok(schema.clone());
    }
    T::schema(set)
}

fn mismatch<T>(schema: &Schema) -> Error {
    Error::Malformed(format!(
        "schema {} cannot be bound to {}",
        schema.kind_name(),
        std::any::type_name::<T>()
    ))
}

type ErasedBuilder =
    Box<dyn Fn(&Schema, &CodecSet, bool) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// An explicit registry of per-type codec builders and synthesized schemas.
///
/// A `CodecSet` is passed into [`build`] and [`synthesize`]; registrations
/// override the default [`Bind`] behavior for a type. The set is immutable
/// once readers and encoders have been constructed from it and can be
/// shared across threads.
#[derive(Default)]
pub struct CodecSet {
    builders: HashMap<TypeId, ErasedBuilder>,
    schemas: HashMap<TypeId, Schema>,
}

impl CodecSet {
    /// An empty set. The default bindings cover every [`Bind`] type, so an
    /// empty set is the normal starting point.
    pub fn new() -> CodecSet {
        CodecSet::default()
    }

    /// Registers a custom codec builder for target type `T`. The builder is
    /// consulted for every non-union, non-null schema node bound to `T`.
    pub fn register_builder<T, F>(&mut self, builder: F)
    where
        T: Bind,
        F: Fn(&Schema, &CodecSet, bool) -> Result<BoxCodec<T>> + Send + Sync + 'static,
    {
        self.builders.insert(
            TypeId::of::<T>(),
            Box::new(move |schema, set, optional| {
                builder(schema, set, optional)
                    .map(|codec| Box::new(Some(codec)) as Box<dyn Any + Send + Sync>)
            }),
        );
    }

    /// Registers the schema to synthesize for `T`, for types with custom
    /// codecs.
    pub fn register_schema<T: Bind>(&mut self, schema: Schema) {
        self.schemas.insert(TypeId::of::<T>(), schema);
    }

    fn build_custom<T: Bind>(&self, schema: &Schema, optional: bool) -> Result<Option<BoxCodec<T>>> {
        let Some(builder) = self.builders.get(&TypeId::of::<T>()) else {
            return Ok(None);
        };
        let mut built = builder(schema, self, optional)?;
        // Registration is keyed by TypeId, so the downcast always succeeds.
        Ok(built
            .downcast_mut::<Option<BoxCodec<T>>>()
            .and_then(Option::take))
    }

    fn schema_override<T: Bind>(&self) -> Option<&Schema> {
        self.schemas.get(&TypeId::of::<T>())
    }
}

impl Bind for bool {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<bool>> {
        match schema {
            Schema::Boolean => Ok(Box::new(BoolCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<bool>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::Boolean)
    }
}

macro_rules! bind_integer {
    ($($ty:ty => $codec:ident),* $(,)?) => {
        $(impl Bind for $ty {
            fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<$ty>> {
                match schema {
                    // BigQuery writes `long` even for narrow columns; the
                    // codec range-checks at read time.
                    Schema::Int { .. } | Schema::Long { .. } => Ok(Box::new($codec {
                        omit_empty: optional,
                    })),
                    other => Err(mismatch::<$ty>(other)),
                }
            }

            fn schema(_set: &CodecSet) -> Result<Schema> {
                Ok(Schema::long())
            }
        })*
    };
}

bind_integer! {
    i16 => Int16Codec,
    i32 => Int32Codec,
    i64 => Int64Codec,
    u64 => Uint64Codec,
}

impl Bind for f32 {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<f32>> {
        match schema {
            Schema::Float => Ok(Box::new(FloatCodec {
                omit_empty: optional,
            })),
            Schema::Double => Ok(Box::new(FloatAsDoubleCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<f32>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        // Both float widths synthesize as double, matching BigQuery.
        Ok(Schema::Double)
    }
}

impl Bind for f64 {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<f64>> {
        match schema {
            Schema::Double => Ok(Box::new(DoubleCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<f64>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::Double)
    }
}

impl Bind for Str {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<Str>> {
        match schema {
            Schema::String => Ok(Box::new(StrCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<Str>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::String)
    }
}

impl Bind for String {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<String>> {
        match schema {
            Schema::String => Ok(Box::new(StringCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<String>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::String)
    }
}

impl Bind for Bytes {
    fn bind(schema: &Schema, _set: &CodecSet, optional: bool) -> Result<BoxCodec<Bytes>> {
        match schema {
            Schema::Bytes => Ok(Box::new(BytesCodec {
                omit_empty: optional,
            })),
            other => Err(mismatch::<Bytes>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        Ok(Schema::Bytes)
    }
}

impl<const N: usize> Bind for [u8; N]
where
    [u8; N]: Default,
{
    fn bind(schema: &Schema, _set: &CodecSet, _optional: bool) -> Result<BoxCodec<[u8; N]>> {
        match schema {
            Schema::Fixed(fixed) if fixed.size == N => Ok(Box::new(FixedCodec::<N>)),
            Schema::Fixed(fixed) => Err(Error::Malformed(format!(
                "fixed of size {} bound to a byte array of length {N}",
                fixed.size
            ))),
            other => Err(mismatch::<[u8; N]>(other)),
        }
    }

    fn schema(_set: &CodecSet) -> Result<Schema> {
        // Byte sequences synthesize as `bytes`.
        Ok(Schema::Bytes)
    }
}

impl<T: Bind> Bind for Vec<T> {
    fn bind(schema: &Schema, set: &CodecSet, optional: bool) -> Result<BoxCodec<Vec<T>>> {
        match schema {
            Schema::Array(items) => Ok(Box::new(ArrayCodec {
                item: build::<T>(items, set, false)?,
                omit_empty: optional,
            })),
            other => Err(mismatch::<Vec<T>>(other)),
        }
    }

    fn schema(set: &CodecSet) -> Result<Schema> {
        Ok(Schema::Array(Box::new(synthesize::<T>(set)?)))
    }
}

macro_rules! bind_string_keyed_map {
    ($($key:ty),* $(,)?) => {
        $(impl<V: Bind> Bind for HashMap<$key, V> {
            fn bind(
                schema: &Schema,
                set: &CodecSet,
                optional: bool,
            ) -> Result<BoxCodec<HashMap<$key, V>>> {
                match schema {
                    Schema::Map(values) => Ok(Box::new(MapCodec::<$key, _>::new(
                        build::<V>(values, set, false)?,
                        optional,
                    ))),
                    other => Err(mismatch::<HashMap<$key, V>>(other)),
                }
            }

            fn schema(set: &CodecSet) -> Result<Schema> {
                Ok(Schema::Map(Box::new(synthesize::<V>(set)?)))
            }
        })*
    };
}

bind_string_keyed_map!(String, Str);

impl<T: Bind> Bind for Option<T> {
    fn bind(schema: &Schema, set: &CodecSet, optional: bool) -> Result<BoxCodec<Option<T>>> {
        // Union schemas were unwrapped by `build` before reaching here, so
        // this wraps the pointee's codec for whatever single schema remains.
        Ok(Box::new(PointerCodec {
            inner: build::<T>(schema, set, optional)?,
        }))
    }

    fn schema(set: &CodecSet) -> Result<Schema> {
        let inner = synthesize::<T>(set)?;
        Ok(match inner {
            // Unions, arrays and maps are nullable in Avro by convention.
            Schema::Union(_) | Schema::Array(_) | Schema::Map(_) => inner,
            other => Schema::nullable(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ReadBuf, WriteBuf};
    use crate::codec::Codec;
    use std::str::FromStr;

    #[test]
    fn integers_bind_to_int_and_long() {
        let set = CodecSet::new();
        assert!(build::<i64>(&Schema::long(), &set, false).is_ok());
        assert!(build::<i64>(&Schema::int(), &set, false).is_ok());
        assert!(build::<i32>(&Schema::long(), &set, false).is_ok());
        assert!(build::<u64>(&Schema::long(), &set, false).is_ok());
        assert!(build::<i64>(&Schema::String, &set, false).is_err());
    }

    #[test]
    fn floats_follow_the_width_rules() {
        let set = CodecSet::new();
        assert!(build::<f32>(&Schema::Float, &set, false).is_ok());
        assert!(build::<f32>(&Schema::Double, &set, false).is_ok());
        assert!(build::<f64>(&Schema::Double, &set, false).is_ok());
        assert!(build::<f64>(&Schema::Float, &set, false).is_err());
    }

    #[test]
    fn synthesis_follows_the_bigquery_canon() {
        let set = CodecSet::new();
        assert_eq!(synthesize::<i16>(&set).unwrap(), Schema::long());
        assert_eq!(synthesize::<i64>(&set).unwrap(), Schema::long());
        assert_eq!(synthesize::<f32>(&set).unwrap(), Schema::Double);
        assert_eq!(synthesize::<f64>(&set).unwrap(), Schema::Double);
        assert_eq!(synthesize::<bool>(&set).unwrap(), Schema::Boolean);
        assert_eq!(synthesize::<Str>(&set).unwrap(), Schema::String);
        assert_eq!(synthesize::<Bytes>(&set).unwrap(), Schema::Bytes);
        assert_eq!(
            synthesize::<Vec<Str>>(&set).unwrap(),
            Schema::Array(Box::new(Schema::String))
        );
        assert_eq!(
            synthesize::<HashMap<String, f64>>(&set).unwrap(),
            Schema::Map(Box::new(Schema::Double))
        );
        assert_eq!(
            synthesize::<Option<i64>>(&set).unwrap(),
            Schema::nullable(Schema::long())
        );
        // Pointers to arrays stay bare; arrays are already nullable.
        assert_eq!(
            synthesize::<Option<Vec<Str>>>(&set).unwrap(),
            Schema::Array(Box::new(Schema::String))
        );
    }

    #[test]
    fn nullable_unions_bind_plain_targets() {
        let set = CodecSet::new();
        let schema = Schema::from_str(r#"["null", "string"]"#).unwrap();
        let codec = build::<Str>(&schema, &set, false).unwrap();

        let mut slot = Str::new();
        codec
            .read(&mut ReadBuf::new(&[0x02, 0x06, b'f', b'o', b'o']), &mut slot)
            .unwrap();
        assert_eq!(slot, "foo");

        let mut slot = Str::new();
        codec.read(&mut ReadBuf::new(&[0x00]), &mut slot).unwrap();
        assert_eq!(slot, "");
    }

    #[test]
    fn fixed_requires_matching_length() {
        let set = CodecSet::new();
        let schema = Schema::from_str(r#"{"type": "fixed", "name": "S", "size": 4}"#).unwrap();
        assert!(build::<[u8; 4]>(&schema, &set, false).is_ok());
        assert!(build::<[u8; 8]>(&schema, &set, false).is_err());
    }

    #[test]
    fn enum_targets_are_unsupported() {
        let set = CodecSet::new();
        let schema =
            Schema::from_str(r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#).unwrap();
        assert!(matches!(
            build::<i64>(&schema, &set, false),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn registered_builders_take_precedence() {
        struct NegatingCodec;

        impl Codec for NegatingCodec {
            type Target = i64;

            fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut i64) -> Result<()> {
                *slot = -buf.varint()?;
                Ok(())
            }

            fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
                buf.varint().map(drop)
            }

            fn new_value(&self) -> i64 {
                0
            }

            fn write(&self, buf: &mut WriteBuf, value: &i64) -> Result<()> {
                buf.varint(-*value);
                Ok(())
            }
        }

        let mut set = CodecSet::new();
        set.register_builder::<i64, _>(|schema, _set, _optional| match schema {
            Schema::Long { .. } => Ok(Box::new(NegatingCodec)),
            other => Err(mismatch::<i64>(other)),
        });

        let codec = build::<i64>(&Schema::long(), &set, false).unwrap();
        let mut slot = 0i64;
        codec.read(&mut ReadBuf::new(&[0x54]), &mut slot).unwrap();
        assert_eq!(slot, -42);
    }

    #[test]
    fn registered_schemas_take_precedence() {
        let mut set = CodecSet::new();
        set.register_schema::<i64>(Schema::String);
        assert_eq!(synthesize::<i64>(&set).unwrap(), Schema::String);
    }

    #[test]
    fn resets_retain_capacity() {
        let mut v = vec![1i64, 2, 3];
        let cap = v.capacity();
        v.reset();
        assert!(v.is_empty());
        assert_eq!(v.capacity(), cap);

        let mut s = String::from("hello");
        let cap = s.capacity();
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), cap);

        let mut o = Some(3i64);
        o.reset();
        assert_eq!(o, None);

        let mut f = [1u8, 2, 3, 4];
        f.reset();
        assert_eq!(f, [0; 4]);
    }
}
