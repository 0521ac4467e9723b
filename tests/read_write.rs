//! End-to-end container file round trips through the public API.

use bqavro::{
    avro_record, read_file, CodecSet, Compression, Encoder, Error, Header, Nullable, Str,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Hatted {
    name: Str,
    hat: Str,
}

avro_record!(Hatted { name: Str, hat: Str });

fn hatted_file(compression: Compression, rows: &[(&str, &str)]) -> Vec<u8> {
    let set = CodecSet::new();
    let mut encoder: Encoder<Hatted, _> = Encoder::new(Vec::new(), compression, &set).unwrap();
    for (name, hat) in rows {
        encoder
            .encode(&Hatted {
                name: Str::from(*name),
                hat: Str::from(*hat),
            })
            .unwrap();
    }
    encoder.into_inner().unwrap()
}

fn read_hatted(file: &[u8]) -> bqavro::Result<Vec<(String, String)>> {
    let mut rows = Vec::new();
    read_file(file, &CodecSet::new(), |row: &Hatted, bank| {
        rows.push((row.name.to_string(), row.hat.to_string()));
        bank.close();
        Ok(())
    })?;
    Ok(rows)
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_round_trip_preserves_order_and_sync() {
    let file = hatted_file(Compression::Snappy, &[("jim", "cat"), ("sim", "hat")]);

    let rows = read_hatted(&file).unwrap();
    assert_eq!(
        rows,
        [
            ("jim".to_string(), "cat".to_string()),
            ("sim".to_string(), "hat".to_string())
        ]
    );

    // The trailing sync marker is a copy of the header's.
    let header = Header::from_reader(&mut &file[..]).unwrap();
    assert_eq!(&file[file.len() - 16..], header.sync_marker());
}

#[cfg(feature = "deflate")]
#[test]
fn deflate_round_trip() {
    let rows: Vec<(String, String)> = (0..500)
        .map(|i| (format!("name-{i}"), format!("hat-{i}")))
        .collect();
    let borrowed: Vec<(&str, &str)> = rows
        .iter()
        .map(|(n, h)| (n.as_str(), h.as_str()))
        .collect();

    let file = hatted_file(Compression::Deflate, &borrowed);
    let decoded = read_hatted(&file).unwrap();
    assert_eq!(decoded, rows);
}

#[test]
fn null_codec_round_trip_with_small_blocks() {
    let set = CodecSet::new();
    // A tiny block size forces one block per record.
    let mut encoder: Encoder<Hatted, _> =
        Encoder::with_block_size(Vec::new(), Compression::Null, 8, &set).unwrap();
    for (name, hat) in [("jim", "cat"), ("sim", "hat"), ("kim", "bat")] {
        encoder
            .encode(&Hatted {
                name: Str::from(name),
                hat: Str::from(hat),
            })
            .unwrap();
    }
    let file = encoder.into_inner().unwrap();

    let rows = read_hatted(&file).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], ("kim".to_string(), "bat".to_string()));
}

#[test]
fn projection_reads_a_subset_of_fields() {
    #[derive(Debug, Default)]
    struct JustHat {
        hat: Str,
    }
    avro_record!(JustHat { hat: Str });

    let file = hatted_file(Compression::Null, &[("jim", "cat"), ("sim", "hat")]);

    let mut hats = Vec::new();
    read_file(file.as_slice(), &CodecSet::new(), |row: &JustHat, bank| {
        hats.push(row.hat.to_string());
        bank.close();
        Ok(())
    })
    .unwrap();
    assert_eq!(hats, ["cat", "hat"]);
}

#[test]
fn mutated_sync_marker_fails() {
    let file = {
        let mut file = hatted_file(Compression::Null, &[("jim", "cat")]);
        let last = file.len() - 1;
        file[last] ^= 0xff;
        file
    };
    assert!(matches!(
        read_hatted(&file),
        Err(Error::SyncMismatch)
    ));
}

#[cfg(feature = "snappy")]
#[test]
fn corrupted_snappy_crc_fails() {
    let mut file = hatted_file(Compression::Snappy, &[("jim", "cat")]);
    // The block payload's last four bytes are the CRC trailer; the sync
    // marker takes the final sixteen.
    let crc_byte = file.len() - 17;
    file[crc_byte] ^= 0xff;
    assert!(matches!(
        read_hatted(&file),
        Err(Error::ChecksumMismatch { .. })
    ));
}

#[test]
fn truncated_block_body_fails() {
    let file = hatted_file(Compression::Null, &[("jim", "cat")]);
    let short = &file[..file.len() - 20];
    assert!(matches!(
        read_hatted(short),
        Err(Error::Truncated(_))
    ));
}

#[test]
fn callback_errors_abort_the_read() {
    let file = hatted_file(Compression::Null, &[("jim", "cat"), ("sim", "hat")]);

    let mut seen = 0;
    let err = read_file(file.as_slice(), &CodecSet::new(), |_row: &Hatted, bank| {
        seen += 1;
        bank.close();
        Err(Error::Message("that's enough".into()))
    })
    .unwrap_err();

    assert_eq!(seen, 1);
    assert!(matches!(err, Error::Message(m) if m == "that's enough"));
}

#[test]
fn banks_keep_borrowed_data_alive_across_records() {
    let file = hatted_file(Compression::Null, &[("jim", "cat"), ("sim", "hat")]);

    // Keep every record's strings and bank until the file is fully read.
    let mut names = Vec::new();
    let mut banks = Vec::new();
    read_file(file.as_slice(), &CodecSet::new(), |row: &Hatted, bank| {
        names.push(row.name.clone());
        banks.push(bank);
        Ok(())
    })
    .unwrap();

    assert_eq!(names, ["jim", "sim"]);
    for bank in banks {
        bank.close();
    }
    // Values remain safe to read even after their banks are closed.
    assert_eq!(names, ["jim", "sim"]);
}

#[test]
fn nullable_and_optional_fields_round_trip() {
    #[derive(Debug, Default, PartialEq)]
    struct Sparse {
        name: Str,
        score: Nullable<i64>,
        tag: Option<Str>,
        count: i64,
    }
    avro_record!(Sparse {
        name: Str,
        score: Nullable<i64>,
        tag: Option<Str>,
        count: i64 [omitempty],
    });

    let rows = vec![
        Sparse {
            name: Str::from("a"),
            score: Nullable::some(0),
            tag: Some(Str::from("x")),
            count: 3,
        },
        Sparse {
            name: Str::from("b"),
            score: Nullable::none(),
            tag: None,
            count: 0,
        },
    ];

    let set = CodecSet::new();
    let mut encoder: Encoder<Sparse, _> =
        Encoder::new(Vec::new(), Compression::Null, &set).unwrap();
    for row in &rows {
        encoder.encode(row).unwrap();
    }
    let file = encoder.into_inner().unwrap();

    let mut decoded = Vec::new();
    read_file(file.as_slice(), &set, |row: &Sparse, bank| {
        decoded.push(Sparse {
            name: row.name.clone(),
            score: row.score,
            tag: row.tag.clone(),
            count: row.count,
        });
        bank.close();
        Ok(())
    })
    .unwrap();

    assert_eq!(decoded, rows);
    // A present zero and an absent value survive the trip distinctly.
    assert_eq!(decoded[0].score, Nullable::some(0));
    assert_eq!(decoded[1].score, Nullable::none());
}

#[test]
fn metadata_names_the_codec() {
    let file = hatted_file(Compression::Null, &[("jim", "cat")]);
    let header = Header::from_reader(&mut &file[..]).unwrap();
    assert_eq!(header.compression(), Compression::Null);
    assert_eq!(
        header.metadata().get("avro.codec").map(Vec::as_slice),
        Some(&b"null"[..])
    );
    assert!(header.metadata().contains_key("avro.schema"));
}
