//! Parses the JSON form of an Avro schema into the [`Schema`] tree.

use super::common::Name;
use super::{EnumSchema, FixedSchema, LogicalType, RecordSchema, Schema};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

pub(crate) fn parse(value: &JsonValue) -> Result<Schema> {
    match value {
        JsonValue::String(name) => parse_primitive(name, None),
        JsonValue::Object(object) => parse_object(object),
        JsonValue::Array(branches) => parse_union(branches),
        other => Err(Error::Malformed(format!(
            "expected schema to be a json string, object or array, found {other}"
        ))),
    }
}

fn parse_primitive(name: &str, logical: Option<LogicalType>) -> Result<Schema> {
    match name {
        "null" => Ok(Schema::Null),
        "boolean" => Ok(Schema::Boolean),
        "int" => Ok(Schema::Int { logical }),
        "long" => Ok(Schema::Long { logical }),
        "float" => Ok(Schema::Float),
        "double" => Ok(Schema::Double),
        "bytes" => Ok(Schema::Bytes),
        "string" => Ok(Schema::String),
        other => Err(Error::Unsupported(format!(
            "named schema reference {other:?}"
        ))),
    }
}

fn parse_union(branches: &[JsonValue]) -> Result<Schema> {
    let mut parsed = Vec::with_capacity(branches.len());
    for branch in branches {
        let schema = parse(branch)?;
        if matches!(schema, Schema::Union(_)) {
            return Err(Error::Malformed(
                "unions must not immediately contain other unions".into(),
            ));
        }
        if parsed.contains(&schema) {
            return Err(Error::Malformed(
                "unions must not contain duplicate branches".into(),
            ));
        }
        parsed.push(schema);
    }
    Ok(Schema::Union(parsed))
}

fn parse_object(object: &Map<String, JsonValue>) -> Result<Schema> {
    let ty = match object.get("type") {
        Some(JsonValue::String(s)) => s.as_str(),
        Some(other) => {
            return Err(Error::Malformed(format!(
                "schema `type` must be a json string, found {other}"
            )))
        }
        None => return Err(Error::Malformed("schema object is missing `type`".into())),
    };

    match ty {
        "record" => parse_record(object),
        "enum" => parse_enum(object),
        "array" => {
            let items = object
                .get("items")
                .ok_or_else(|| Error::Malformed("array schema is missing `items`".into()))?;
            Ok(Schema::Array(Box::new(parse(items)?)))
        }
        "map" => {
            let values = object
                .get("values")
                .ok_or_else(|| Error::Malformed("map schema is missing `values`".into()))?;
            Ok(Schema::Map(Box::new(parse(values)?)))
        }
        "fixed" => parse_fixed(object),
        primitive => parse_primitive(primitive, parse_logical(object)),
    }
}

fn parse_logical(object: &Map<String, JsonValue>) -> Option<LogicalType> {
    object
        .get("logicalType")
        .and_then(JsonValue::as_str)
        .and_then(LogicalType::from_name)
}

fn parse_name(object: &Map<String, JsonValue>) -> Result<Name> {
    let name = object
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| Error::Malformed("named schema is missing `name`".into()))?;
    match object.get("namespace").and_then(JsonValue::as_str) {
        Some(namespace) => Name::with_namespace(name, namespace),
        None => Name::new(name),
    }
}

fn parse_record(object: &Map<String, JsonValue>) -> Result<Schema> {
    let name = parse_name(object)?;
    let fields_json = match object.get("fields") {
        Some(JsonValue::Array(fields)) => fields,
        _ => {
            return Err(Error::Malformed(format!(
                "record {name} must have a `fields` array"
            )))
        }
    };

    let mut fields = IndexMap::with_capacity(fields_json.len());
    for field in fields_json {
        let field = field.as_object().ok_or_else(|| {
            Error::Malformed(format!("fields of record {name} must be json objects"))
        })?;
        let field_name = field
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::Malformed(format!("field of record {name} has no `name`")))?;
        let ty = field
            .get("type")
            .ok_or_else(|| Error::Malformed(format!("field {field_name:?} has no `type`")))?;
        let schema = parse(ty)?;
        if fields.insert(field_name.to_string(), schema).is_some() {
            return Err(Error::Malformed(format!(
                "duplicate field {field_name:?} in record {name}"
            )));
        }
    }

    Ok(Schema::Record(RecordSchema { name, fields }))
}

fn parse_enum(object: &Map<String, JsonValue>) -> Result<Schema> {
    let name = parse_name(object)?;
    let symbols_json = match object.get("symbols") {
        Some(JsonValue::Array(symbols)) => symbols,
        _ => {
            return Err(Error::Malformed(format!(
                "enum {name} must have a `symbols` array"
            )))
        }
    };
    let mut symbols = Vec::with_capacity(symbols_json.len());
    for symbol in symbols_json {
        match symbol.as_str() {
            Some(s) => symbols.push(s.to_string()),
            None => {
                return Err(Error::Malformed(format!(
                    "symbols of enum {name} must be strings"
                )))
            }
        }
    }
    Ok(Schema::Enum(EnumSchema { name, symbols }))
}

fn parse_fixed(object: &Map<String, JsonValue>) -> Result<Schema> {
    let name = parse_name(object)?;
    let size = object
        .get("size")
        .and_then(JsonValue::as_u64)
        .ok_or_else(|| {
            Error::Malformed(format!("fixed {name} must have a non-negative `size`"))
        })?;
    Ok(Schema::Fixed(FixedSchema {
        name,
        size: size as usize,
    }))
}
