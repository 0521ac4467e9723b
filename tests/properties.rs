//! Property-based laws of the codec engine: encoded values decode back to
//! themselves, and skipping consumes exactly what reading would.

use bqavro::{build, Codec, CodecSet, ReadBuf, Schema, Str, WriteBuf};
use proptest::prelude::*;

proptest! {
    #[test]
    fn varint_round_trip(v in any::<i64>()) {
        let mut w = WriteBuf::new();
        w.varint(v);
        prop_assert!((1..=10).contains(&w.len()));

        let mut r = ReadBuf::new(w.bytes());
        prop_assert_eq!(r.varint().unwrap(), v);
        prop_assert!(r.is_empty());
    }

    #[test]
    fn long_round_trip(v in any::<i64>()) {
        let set = CodecSet::new();
        let codec = build::<i64>(&Schema::long(), &set, false).unwrap();

        let mut w = WriteBuf::new();
        codec.write(&mut w, &v).unwrap();

        let mut r = ReadBuf::new(w.bytes());
        let mut slot = 0i64;
        codec.read(&mut r, &mut slot).unwrap();
        prop_assert_eq!(slot, v);

        let mut r = ReadBuf::new(w.bytes());
        codec.skip(&mut r).unwrap();
        prop_assert!(r.is_empty());
    }

    #[test]
    fn double_round_trip_by_bit_pattern(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        let set = CodecSet::new();
        let codec = build::<f64>(&Schema::Double, &set, false).unwrap();

        let mut w = WriteBuf::new();
        codec.write(&mut w, &v).unwrap();

        let mut r = ReadBuf::new(w.bytes());
        let mut slot = 0f64;
        codec.read(&mut r, &mut slot).unwrap();
        // NaN payloads must survive, so compare bit patterns.
        prop_assert_eq!(slot.to_bits(), bits);
    }

    #[test]
    fn string_round_trip(s in ".{0,64}") {
        let set = CodecSet::new();
        let codec = build::<Str>(&Schema::String, &set, false).unwrap();

        let mut w = WriteBuf::new();
        codec.write(&mut w, &Str::from(s.as_str())).unwrap();

        let mut r = ReadBuf::new(w.bytes());
        let mut slot = Str::new();
        codec.read(&mut r, &mut slot).unwrap();
        prop_assert_eq!(slot.as_str(), s.as_str());

        // Skipping consumes exactly the bytes reading would.
        let mut r = ReadBuf::new(w.bytes());
        codec.skip(&mut r).unwrap();
        prop_assert!(r.is_empty());
    }

    #[test]
    fn long_array_round_trip(xs in proptest::collection::vec(any::<i64>(), 0..64)) {
        let set = CodecSet::new();
        let schema = Schema::Array(Box::new(Schema::long()));
        let codec = build::<Vec<i64>>(&schema, &set, false).unwrap();

        let mut w = WriteBuf::new();
        codec.write(&mut w, &xs).unwrap();

        let mut r = ReadBuf::new(w.bytes());
        let mut slot: Vec<i64> = Vec::new();
        codec.read(&mut r, &mut slot).unwrap();
        prop_assert_eq!(&slot, &xs);
        prop_assert!(r.is_empty());

        let mut r = ReadBuf::new(w.bytes());
        codec.skip(&mut r).unwrap();
        prop_assert!(r.is_empty());
    }

    #[test]
    fn nullable_omit_writes_a_single_null_byte(s in ".{0,16}") {
        let set = CodecSet::new();
        let schema = Schema::nullable(Schema::String);
        // optional = true marks the field omitempty.
        let codec = build::<Str>(&schema, &set, true).unwrap();

        let value = Str::from(s.as_str());
        let mut w = WriteBuf::new();
        codec.write(&mut w, &value).unwrap();

        if s.is_empty() {
            prop_assert_eq!(w.bytes(), &[0x00][..]);
        } else {
            prop_assert_eq!(w.bytes()[0], 0x02);
        }
    }
}
