//! The crate-wide error type.

use std::fmt::Display;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while binding, decoding or encoding Avro data.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input ended exactly where a value was expected to start. This is
    /// the normal end-of-file signal at the outermost block loop and is not
    /// surfaced from there.
    #[error("unexpected end of input")]
    EndOfInput,

    /// The input ended in the middle of a value or block body.
    #[error("truncated input while reading {0}")]
    Truncated(&'static str),

    /// A varint ran past ten bytes or past the 64-bit range.
    #[error("varint overflows a 64-bit integer")]
    Overflow,

    /// A decoded integer does not fit the bound target type.
    #[error("value {value} will not fit in {target}")]
    Range {
        /// The decoded wire value.
        value: i64,
        /// Name of the target type it was bound to.
        target: &'static str,
    },

    /// A union selector was outside the union's arity.
    #[error("union selector {found} out of range ({arity} branches)")]
    Selector {
        /// The selector read from the wire.
        found: i64,
        /// Number of branches in the union.
        arity: usize,
    },

    /// A schema could not be parsed, a schema and target type do not match,
    /// or the wire data violates block framing.
    #[error("{0}")]
    Malformed(String),

    /// The file does not start with the `Obj\x01` magic.
    #[error("expected magic header `Obj\\x01`")]
    MagicMismatch,

    /// A block's trailing sync marker differs from the file header's.
    #[error("sync marker does not match file header")]
    SyncMismatch,

    /// The CRC32 trailer of a snappy block does not match its content.
    #[error("snappy crc mismatch: found {found:#010x}, expected {expected:#010x}")]
    ChecksumMismatch {
        /// CRC computed over the decompressed block.
        found: u32,
        /// CRC carried in the block trailer.
        expected: u32,
    },

    /// A feature the engine recognizes but does not implement, such as enum
    /// decoding or writing a generic union.
    #[error("{0} is not supported")]
    Unsupported(String),

    /// Context wrapper naming the record field that failed.
    #[error("field {index} {name:?} of record")]
    Field {
        /// Position of the field in schema order.
        index: usize,
        /// The field's wire name.
        name: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Context wrapper naming the array entry that failed.
    #[error("array entry {index}")]
    ArrayEntry {
        /// Index of the entry within the decoded array.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Context wrapper naming the map key whose value failed.
    #[error("map key {key:?}")]
    MapKey {
        /// The entry's key.
        key: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Free-form context wrapper, e.g. the record index within a block.
    #[error("{what}")]
    Context {
        /// What was being decoded or encoded.
        what: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// An error from the underlying byte source or sink.
    #[error("i/o failed")]
    Io(#[source] std::io::Error),

    /// A free-form message, mainly for record callbacks.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Wraps `source` with the name and schema position of a record field.
    pub(crate) fn field(index: usize, name: &str, source: Error) -> Error {
        Error::Field {
            index,
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Wraps `source` with the index of an array entry.
    pub(crate) fn array_entry(index: usize, source: Error) -> Error {
        Error::ArrayEntry {
            index,
            source: Box::new(source),
        }
    }

    /// Wraps `source` with a map key.
    pub(crate) fn map_key(key: impl Display, source: Error) -> Error {
        Error::MapKey {
            key: key.to_string(),
            source: Box::new(source),
        }
    }

    /// Wraps `source` with a free-form description.
    pub(crate) fn context(what: impl Display, source: Error) -> Error {
        Error::Context {
            what: what.to_string(),
            source: Box::new(source),
        }
    }
}
