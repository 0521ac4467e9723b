//! The in-memory form of an Avro schema, plus its JSON parser and
//! serializer.
//!
//! Schemas are written as JSON. A primitive schema is a bare JSON string, a
//! union is a JSON array of schemas, and everything else is a JSON object
//! with a `type` field. [`Schema`] implements
//! [`FromStr`](std::str::FromStr) for parsing and [`Display`](fmt::Display)
//! for serializing back to JSON.

pub mod common;
mod parser;
#[cfg(test)]
mod tests;

pub use common::Name;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// A logical type annotation on `int` or `long` that refines interpretation
/// without changing the on-wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    /// Milliseconds since the Unix epoch, on `long`.
    TimestampMillis,
    /// Microseconds since the Unix epoch, on `long`.
    TimestampMicros,
    /// Nanoseconds since the Unix epoch, on `long`.
    TimestampNanos,
    /// Days since 1970-01-01, on `int`.
    Date,
}

impl LogicalType {
    /// The annotation's name as written in schema JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalType::TimestampMillis => "timestamp-millis",
            LogicalType::TimestampMicros => "timestamp-micros",
            LogicalType::TimestampNanos => "timestamp-nanos",
            LogicalType::Date => "date",
        }
    }

    /// Parses an annotation name. Unknown names yield `None` and the
    /// annotation is ignored, as the Avro spec requires.
    pub fn from_name(name: &str) -> Option<LogicalType> {
        match name {
            "timestamp-millis" => Some(LogicalType::TimestampMillis),
            "timestamp-micros" => Some(LogicalType::TimestampMicros),
            "timestamp-nanos" => Some(LogicalType::TimestampNanos),
            "date" => Some(LogicalType::Date),
            _ => None,
        }
    }
}

/// A record schema: a named, ordered list of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The record's name and namespace.
    pub name: Name,
    /// Fields in schema order. Field names are unique.
    pub fields: IndexMap<String, Schema>,
}

/// An enum schema. Enums are recognized but their values cannot be decoded;
/// fields of enum type can only be skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The enum's name and namespace.
    pub name: Name,
    /// The symbol list.
    pub symbols: Vec<String>,
}

/// A fixed schema: a named, fixed-length byte sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The fixed type's name and namespace.
    pub name: Name,
    /// Size in bytes.
    pub size: usize,
}

/// The recursive tree form of an Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// The `null` primitive.
    Null,
    /// The `boolean` primitive.
    Boolean,
    /// The `int` primitive, possibly annotated with a logical type.
    Int {
        /// Logical refinement, e.g. `date`.
        logical: Option<LogicalType>,
    },
    /// The `long` primitive, possibly annotated with a logical type.
    Long {
        /// Logical refinement, e.g. `timestamp-micros`.
        logical: Option<LogicalType>,
    },
    /// The `float` primitive (32-bit IEEE-754).
    Float,
    /// The `double` primitive (64-bit IEEE-754).
    Double,
    /// The `bytes` primitive.
    Bytes,
    /// The `string` primitive.
    String,
    /// An array of the element schema.
    Array(Box<Schema>),
    /// A map from string keys to the value schema.
    Map(Box<Schema>),
    /// A record.
    Record(RecordSchema),
    /// An enum.
    Enum(EnumSchema),
    /// A fixed-length byte sequence.
    Fixed(FixedSchema),
    /// A union of alternatives. Alternatives never contain other unions.
    Union(Vec<Schema>),
}

impl Schema {
    /// The `int` primitive with no logical annotation.
    pub fn int() -> Schema {
        Schema::Int { logical: None }
    }

    /// The `long` primitive with no logical annotation.
    pub fn long() -> Schema {
        Schema::Long { logical: None }
    }

    /// Wraps `inner` in the common nullable union `[null, inner]`.
    pub fn nullable(inner: Schema) -> Schema {
        Schema::Union(vec![Schema::Null, inner])
    }

    /// Recognizes the nullable-of-T shape: exactly two branches, exactly one
    /// of which is null. Returns the non-null branch and its position.
    pub(crate) fn nullable_shape(branches: &[Schema]) -> Option<(usize, &Schema)> {
        match branches {
            [Schema::Null, other] if !matches!(other, Schema::Null) => Some((1, other)),
            [other, Schema::Null] if !matches!(other, Schema::Null) => Some((0, other)),
            _ => None,
        }
    }

    /// A short name for the schema's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int { .. } => "int",
            Schema::Long { .. } => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Array(_) => "array",
            Schema::Map(_) => "map",
            Schema::Record(_) => "record",
            Schema::Enum(_) => "enum",
            Schema::Fixed(_) => "fixed",
            Schema::Union(_) => "union",
        }
    }

    /// Serializes the schema to its JSON form.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Schema::Null => json!("null"),
            Schema::Boolean => json!("boolean"),
            Schema::Int { logical: None } => json!("int"),
            Schema::Int {
                logical: Some(logical),
            } => json!({"type": "int", "logicalType": logical.as_str()}),
            Schema::Long { logical: None } => json!("long"),
            Schema::Long {
                logical: Some(logical),
            } => json!({"type": "long", "logicalType": logical.as_str()}),
            Schema::Float => json!("float"),
            Schema::Double => json!("double"),
            Schema::Bytes => json!("bytes"),
            Schema::String => json!("string"),
            Schema::Array(items) => json!({"type": "array", "items": items.to_json()}),
            Schema::Map(values) => json!({"type": "map", "values": values.to_json()}),
            Schema::Record(record) => {
                let fields: Vec<JsonValue> = record
                    .fields
                    .iter()
                    .map(|(name, schema)| json!({"name": name, "type": schema.to_json()}))
                    .collect();
                let mut out = json!({
                    "type": "record",
                    "name": record.name.simple(),
                    "fields": fields,
                });
                if let Some(ns) = record.name.namespace() {
                    out["namespace"] = json!(ns);
                }
                out
            }
            Schema::Enum(e) => {
                let mut out = json!({
                    "type": "enum",
                    "name": e.name.simple(),
                    "symbols": e.symbols,
                });
                if let Some(ns) = e.name.namespace() {
                    out["namespace"] = json!(ns);
                }
                out
            }
            Schema::Fixed(f) => {
                let mut out = json!({
                    "type": "fixed",
                    "name": f.name.simple(),
                    "size": f.size,
                });
                if let Some(ns) = f.name.namespace() {
                    out["namespace"] = json!(ns);
                }
                out
            }
            Schema::Union(branches) => {
                JsonValue::Array(branches.iter().map(Schema::to_json).collect())
            }
        }
    }
}

impl FromStr for Schema {
    type Err = Error;

    /// Parses an Avro schema from a JSON string.
    fn from_str(s: &str) -> Result<Schema> {
        let value: JsonValue = serde_json::from_str(s)
            .map_err(|e| Error::Malformed(format!("schema is not valid json: {e}")))?;
        parser::parse(&value)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
