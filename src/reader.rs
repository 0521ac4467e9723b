//! Reading object container files: header parsing and the per-block decode
//! loop.

use crate::bank::ResourceBank;
use crate::bind::{build, Bind, CodecSet};
use crate::buffer::ReadBuf;
use crate::codec::Codec;
use crate::compression::Compression;
use crate::config::{MAGIC_BYTES, SYNC_MARKER_SIZE};
use crate::error::{Error, Result};
use crate::schema::Schema;
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;
use tracing::debug;

/// The parsed header of an object container file: the writer's schema, the
/// raw metadata map, the compression codec and the sync marker.
#[derive(Debug)]
pub struct Header {
    schema: Schema,
    metadata: HashMap<String, Vec<u8>>,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    compression: Compression,
}

impl Header {
    /// Reads and validates a container file header.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Header> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic, "file header")?;
        if &magic != MAGIC_BYTES {
            return Err(Error::MagicMismatch);
        }

        // The metadata map is decoded with this ad-hoc loop rather than the
        // codec tree; building codecs for one tiny map would dominate
        // startup cost.
        let mut metadata = HashMap::new();
        loop {
            let count = match read_varint(reader) {
                Ok(count) => count,
                Err(Error::EndOfInput) => return Err(Error::Truncated("file header")),
                Err(e) => return Err(e),
            };
            if count == 0 {
                break;
            }
            if count < 0 {
                return Err(Error::Malformed(
                    "negative block counts are not supported in the file header".into(),
                ));
            }
            for _ in 0..count {
                let key = read_raw_bytes(reader)?;
                let key = String::from_utf8(key).map_err(|_| {
                    Error::Malformed("metadata key is not valid utf-8".into())
                })?;
                let value = read_raw_bytes(reader)?;
                metadata.insert(key, value);
            }
        }

        let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
        read_exact(reader, &mut sync_marker, "file header")?;

        let schema_json = metadata
            .get("avro.schema")
            .ok_or_else(|| Error::Malformed("no avro.schema entry in file header".into()))?;
        let schema_json = std::str::from_utf8(schema_json)
            .map_err(|_| Error::Malformed("avro.schema is not valid utf-8".into()))?;
        let schema = Schema::from_str(schema_json)?;

        let compression = match metadata.get("avro.codec") {
            Some(name) => {
                let name = std::str::from_utf8(name)
                    .map_err(|_| Error::Malformed("avro.codec is not valid utf-8".into()))?;
                Compression::try_from(name)?
            }
            None => Compression::Null,
        };

        debug!(codec = compression.as_ref(), "parsed container file header");

        Ok(Header {
            schema,
            metadata,
            sync_marker,
            compression,
        })
    }

    /// The writer's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The raw metadata map.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// The file's 16-byte sync marker.
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.sync_marker
    }

    /// The compression codec blocks were written with.
    pub fn compression(&self) -> Compression {
        self.compression
    }
}

/// Reads a container file, decoding every record into a `T` and handing
/// `(record, resource_bank)` to `callback` in file order.
///
/// The record reference is borrowed for the duration of the callback; data
/// carved from the bank ([`Str`](crate::Str) and
/// [`Bytes`](bytes::Bytes) fields) stays valid for as long as the callback
/// keeps the bank alive. A callback error aborts the read and is returned
/// verbatim.
///
/// ```no_run
/// use bqavro::{avro_record, read_file, CodecSet, Str};
///
/// #[derive(Debug, Default)]
/// struct Row {
///     name: Str,
///     hat: Str,
/// }
/// avro_record!(Row { name: Str, hat: Str });
///
/// # fn main() -> bqavro::Result<()> {
/// let file = std::fs::File::open("rows.avro").map_err(bqavro::Error::Io)?;
/// let mut rows: Vec<(Str, Str)> = vec![];
/// read_file(file, &CodecSet::new(), |row: &Row, bank| {
///     rows.push((row.name.clone(), row.hat.clone()));
///     bank.close();
///     Ok(())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn read_file<R, T, F>(mut source: R, set: &CodecSet, mut callback: F) -> Result<()>
where
    R: Read,
    T: Bind,
    F: FnMut(&T, ResourceBank) -> Result<()>,
{
    let header = Header::from_reader(&mut source)?;
    let codec = build::<T>(&header.schema, set, false)?;

    let mut record = T::default();
    let mut compressed = Vec::new();
    let mut scratch = Vec::new();
    let mut bank = ResourceBank::acquire();

    loop {
        // End of file at the start of a block header is the normal way out.
        let record_count = match read_varint(&mut source) {
            Ok(count) => count,
            Err(Error::EndOfInput) => return Ok(()),
            Err(e) => return Err(e),
        };
        let compressed_len = match read_varint(&mut source) {
            Ok(len) => usize::try_from(len)
                .map_err(|_| Error::Malformed(format!("negative block length {len}")))?,
            Err(Error::EndOfInput) => return Err(Error::Truncated("block header")),
            Err(e) => return Err(e),
        };

        compressed.resize(compressed_len, 0);
        read_exact(&mut source, &mut compressed, "block body")?;
        let block = header.compression.decompress(&compressed, &mut scratch)?;
        debug!(
            records = record_count,
            bytes = block.len(),
            "decoded block"
        );

        let mut buf = ReadBuf::with_bank(block, bank);
        for index in 0..record_count {
            record.reset();
            codec
                .read(&mut buf, &mut record)
                .map_err(|e| Error::context(format!("record {index} of block"), e))?;
            callback(&record, buf.extract_resource_bank())?;
        }
        bank = buf.into_resource_bank();

        let mut sync = [0u8; SYNC_MARKER_SIZE];
        read_exact(&mut source, &mut sync, "sync marker")?;
        if sync != header.sync_marker {
            return Err(Error::SyncMismatch);
        }
    }
}

/// Reads a zig-zag varint from an [`io::Read`](std::io::Read) source, byte
/// at a time. End of input on the first byte maps to `EndOfInput`, later
/// bytes to `Truncated`.
fn read_varint<R: Read>(reader: &mut R) -> Result<i64> {
    let mut x = 0u64;
    let mut s = 0u32;
    for i in 0..=9 {
        let mut byte = [0u8; 1];
        if let Err(e) = reader.read_exact(&mut byte) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Err(if i == 0 {
                    Error::EndOfInput
                } else {
                    Error::Truncated("varint")
                });
            }
            return Err(Error::Io(e));
        }
        let b = byte[0];
        if b < 0x80 {
            if i == 9 && b > 1 {
                return Err(Error::Overflow);
            }
            let v = x | (u64::from(b) << s);
            return Ok((v >> 1) as i64 ^ -((v & 1) as i64));
        }
        x |= u64::from(b & 0x7f) << s;
        s += 7;
    }
    Err(Error::Overflow)
}

fn read_raw_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = match read_varint(reader) {
        Ok(len) => len,
        Err(Error::EndOfInput) => return Err(Error::Truncated("metadata entry")),
        Err(e) => return Err(e),
    };
    let len =
        usize::try_from(len).map_err(|_| Error::Malformed(format!("negative length {len}")))?;
    let mut out = vec![0u8; len];
    read_exact(reader, &mut out, "metadata entry")?;
    Ok(out)
}

fn read_exact<R: Read>(reader: &mut R, out: &mut [u8], what: &'static str) -> Result<()> {
    reader.read_exact(out).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Truncated(what)
        } else {
            Error::Io(e)
        }
    })
}
