use super::*;
use std::str::FromStr;

#[test]
fn parses_primitives() {
    for (json, kind) in [
        (r#""null""#, "null"),
        (r#""boolean""#, "boolean"),
        (r#""int""#, "int"),
        (r#""long""#, "long"),
        (r#""float""#, "float"),
        (r#""double""#, "double"),
        (r#""bytes""#, "bytes"),
        (r#""string""#, "string"),
    ] {
        let schema = Schema::from_str(json).unwrap();
        assert_eq!(schema.kind_name(), kind);
    }
}

#[test]
fn object_form_of_a_primitive() {
    let schema = Schema::from_str(r#"{"type": "long"}"#).unwrap();
    assert_eq!(schema, Schema::long());
}

#[test]
fn logical_types_annotate_int_and_long() {
    let schema = Schema::from_str(r#"{"type": "long", "logicalType": "timestamp-micros"}"#).unwrap();
    assert_eq!(
        schema,
        Schema::Long {
            logical: Some(LogicalType::TimestampMicros)
        }
    );

    let schema = Schema::from_str(r#"{"type": "int", "logicalType": "date"}"#).unwrap();
    assert_eq!(
        schema,
        Schema::Int {
            logical: Some(LogicalType::Date)
        }
    );

    // Unknown logical types are ignored, not errors.
    let schema = Schema::from_str(r#"{"type": "long", "logicalType": "duration-ish"}"#).unwrap();
    assert_eq!(schema, Schema::long());
}

#[test]
fn parses_a_record() {
    let schema = Schema::from_str(
        r#"{
            "type": "record",
            "name": "Row",
            "namespace": "com.example",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "count", "type": ["null", "long"]}
            ]
        }"#,
    )
    .unwrap();

    let record = match &schema {
        Schema::Record(r) => r,
        other => panic!("expected record, got {other:?}"),
    };
    assert_eq!(record.name.fullname(), "com.example.Row");
    let fields: Vec<&String> = record.fields.keys().collect();
    assert_eq!(fields, ["name", "count"]);
    assert_eq!(
        record.fields["count"],
        Schema::nullable(Schema::long())
    );
}

#[test]
fn rejects_duplicate_fields() {
    let err = Schema::from_str(
        r#"{
            "type": "record",
            "name": "Row",
            "fields": [
                {"name": "a", "type": "long"},
                {"name": "a", "type": "string"}
            ]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Malformed(_)));
}

#[test]
fn rejects_immediate_unions_and_duplicates() {
    assert!(Schema::from_str(r#"[["null", "long"], "string"]"#).is_err());
    assert!(Schema::from_str(r#"["long", "long"]"#).is_err());
}

#[test]
fn named_references_are_unsupported() {
    let err = Schema::from_str(
        r#"{
            "type": "record",
            "name": "LongList",
            "fields": [
                {"name": "value", "type": "long"},
                {"name": "next", "type": ["null", "LongList"]}
            ]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn parses_array_map_fixed_enum() {
    let schema = Schema::from_str(r#"{"type": "array", "items": "string"}"#).unwrap();
    assert_eq!(schema, Schema::Array(Box::new(Schema::String)));

    let schema = Schema::from_str(r#"{"type": "map", "values": "double"}"#).unwrap();
    assert_eq!(schema, Schema::Map(Box::new(Schema::Double)));

    let schema = Schema::from_str(r#"{"type": "fixed", "name": "Sync", "size": 16}"#).unwrap();
    match schema {
        Schema::Fixed(f) => {
            assert_eq!(f.size, 16);
            assert_eq!(f.name.simple(), "Sync");
        }
        other => panic!("expected fixed, got {other:?}"),
    }

    let schema =
        Schema::from_str(r#"{"type": "enum", "name": "Suit", "symbols": ["HEART", "CLUB"]}"#)
            .unwrap();
    match schema {
        Schema::Enum(e) => assert_eq!(e.symbols, ["HEART", "CLUB"]),
        other => panic!("expected enum, got {other:?}"),
    }
}

#[test]
fn json_round_trip() {
    let source = r#"{
        "type": "record",
        "name": "Row",
        "namespace": "com.example",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "score", "type": ["null", "double"]},
            {"name": "tags", "type": {"type": "array", "items": "string"}},
            {"name": "attrs", "type": {"type": "map", "values": "bytes"}},
            {"name": "ts", "type": {"type": "long", "logicalType": "timestamp-micros"}}
        ]
    }"#;
    let schema = Schema::from_str(source).unwrap();
    let reparsed = Schema::from_str(&schema.to_string()).unwrap();
    assert_eq!(schema, reparsed);
}

#[test]
fn nullable_shape_detection() {
    let union = [Schema::Null, Schema::String];
    assert_eq!(Schema::nullable_shape(&union), Some((1, &Schema::String)));

    let union = [Schema::String, Schema::Null];
    assert_eq!(Schema::nullable_shape(&union), Some((0, &Schema::String)));

    let union = [Schema::String, Schema::long()];
    assert_eq!(Schema::nullable_shape(&union), None);

    let union = [Schema::Null, Schema::long(), Schema::String];
    assert_eq!(Schema::nullable_shape(&union), None);
}
