//! Writing object container files: low-level block framing and the typed,
//! buffering [`Encoder`].

use crate::bind::{build, synthesize, Bind, CodecSet};
use crate::buffer::WriteBuf;
use crate::codec::BoxCodec;
use crate::compression::Compression;
use crate::config::{DEFAULT_BLOCK_SIZE, MAGIC_BYTES, SYNC_MARKER_SIZE};
use crate::error::{Error, Result};
use crate::schema::Schema;
use rand::{thread_rng, Rng};
use std::io::Write;
use tracing::debug;

fn sync_marker() -> [u8; SYNC_MARKER_SIZE] {
    let mut marker = [0u8; SYNC_MARKER_SIZE];
    thread_rng().fill(&mut marker[..]);
    marker
}

/// Low-level support for writing container files out of already-encoded
/// record blocks. [`Encoder`] drives this for typed values; it is public
/// for callers that buffer their own encoded data.
pub struct FileWriter {
    sync_marker: [u8; SYNC_MARKER_SIZE],
    schema_json: Vec<u8>,
    compression: Compression,
    compressed: Vec<u8>,
    varint_buf: WriteBuf,
}

impl FileWriter {
    /// Creates a writer for the given JSON-encoded schema, with a random
    /// sync marker.
    pub fn new(schema_json: Vec<u8>, compression: Compression) -> FileWriter {
        FileWriter {
            sync_marker: sync_marker(),
            schema_json,
            compression,
            compressed: Vec::new(),
            varint_buf: WriteBuf::new(),
        }
    }

    /// The sync marker this writer stamps after the header and every block.
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.sync_marker
    }

    /// Writes the container file header.
    pub fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let header = self.append_header(WriteBuf::with_capacity(
            self.schema_json.len() + 128,
        ));
        out.write_all(header.bytes()).map_err(Error::Io)
    }

    /// Appends the container file header to `buf`: the magic, a metadata
    /// map carrying `avro.schema` and `avro.codec`, and the sync marker.
    pub fn append_header(&self, mut buf: WriteBuf) -> WriteBuf {
        buf.write(MAGIC_BYTES);
        buf.varint(2);
        for (key, value) in [
            ("avro.schema", self.schema_json.as_slice()),
            ("avro.codec", self.compression.as_ref().as_bytes()),
        ] {
            buf.varint(key.len() as i64);
            buf.write(key.as_bytes());
            buf.varint(value.len() as i64);
            buf.write(value);
        }
        buf.varint(0);
        buf.write(&self.sync_marker);
        buf
    }

    /// Writes one block: the record count, the compressed byte length, the
    /// compressed payload and the sync marker. `block` must hold exactly
    /// `record_count` encoded records.
    pub fn write_block<W: Write>(
        &mut self,
        out: &mut W,
        record_count: usize,
        block: &[u8],
    ) -> Result<()> {
        self.write_varint(out, record_count as i64)?;
        self.compression.compress(block, &mut self.compressed)?;
        self.write_varint(out, self.compressed.len() as i64)?;
        out.write_all(&self.compressed).map_err(Error::Io)?;
        out.write_all(&self.sync_marker).map_err(Error::Io)?;
        Ok(())
    }

    fn write_varint<W: Write>(&mut self, out: &mut W, v: i64) -> Result<()> {
        self.varint_buf.reset();
        self.varint_buf.varint(v);
        out.write_all(self.varint_buf.bytes()).map_err(Error::Io)
    }
}

/// Encodes values of `T` into an object container file.
///
/// Construction synthesizes the Avro schema for `T`, builds the codec tree
/// once, and writes the file header. Encoded records are buffered and
/// flushed as one block whenever the buffer reaches the configured
/// approximate block size; [`flush`](Self::flush) or
/// [`into_inner`](Self::into_inner) completes the current block.
///
/// ```
/// use bqavro::{avro_record, Compression, CodecSet, Encoder};
///
/// #[derive(Debug, Default)]
/// struct Row {
///     name: String,
///     count: i64,
/// }
/// avro_record!(Row { name: String, count: i64 });
///
/// # fn main() -> bqavro::Result<()> {
/// let set = CodecSet::new();
/// let mut encoder = Encoder::new(Vec::new(), Compression::Null, &set)?;
/// encoder.encode(&Row { name: "jim".into(), count: 1 })?;
/// let file: Vec<u8> = encoder.into_inner()?;
/// # Ok(())
/// # }
/// ```
pub struct Encoder<T, W> {
    codec: BoxCodec<T>,
    schema: Schema,
    writer: FileWriter,
    out: W,
    block: WriteBuf,
    count: usize,
    block_size: usize,
}

impl<T: Bind, W: Write> Encoder<T, W> {
    /// Creates an encoder with the default approximate block size.
    pub fn new(out: W, compression: Compression, set: &CodecSet) -> Result<Encoder<T, W>> {
        Encoder::with_block_size(out, compression, DEFAULT_BLOCK_SIZE, set)
    }

    /// Creates an encoder flushing blocks of roughly `block_size` bytes.
    pub fn with_block_size(
        mut out: W,
        compression: Compression,
        block_size: usize,
        set: &CodecSet,
    ) -> Result<Encoder<T, W>> {
        let schema = synthesize::<T>(set)?;
        let codec = build::<T>(&schema, set, false)?;
        let writer = FileWriter::new(schema.to_string().into_bytes(), compression);
        writer.write_header(&mut out)?;

        Ok(Encoder {
            codec,
            schema,
            writer,
            out,
            block: WriteBuf::with_capacity(block_size),
            count: 0,
            block_size,
        })
    }

    /// The schema records are encoded with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Appends one record to the current block, flushing if the block has
    /// reached the target size.
    pub fn encode(&mut self, value: &T) -> Result<()> {
        self.codec.write(&mut self.block, value)?;
        self.count += 1;

        if self.block.len() >= self.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Completes the current block, if it holds any records. One block is
    /// written per flush regardless of record count.
    pub fn flush(&mut self) -> Result<()> {
        if self.count > 0 {
            debug!(records = self.count, bytes = self.block.len(), "flushing block");
            self.writer
                .write_block(&mut self.out, self.count, self.block.bytes())?;
            self.count = 0;
            self.block.reset();
        }
        Ok(())
    }

    /// Flushes and yields the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.out)
    }
}
