//! A schema-driven Avro object container file codec engine, specialized for
//! BigQuery-exported data.
//!
//! The engine resolves the binding between an Avro schema and a target Rust
//! struct once, when a reader or encoder is constructed, and then runs a
//! tree of pre-built codecs per record. Decoding feeds from a non-copying
//! byte cursor over each decompressed block; strings and byte slices are
//! carved from a reusable [`ResourceBank`] so the hot loop allocates almost
//! nothing once warm.
//!
//! ## Reading and writing a container file
//!
//! ```
//! use bqavro::{avro_record, read_file, CodecSet, Compression, Encoder, Str};
//!
//! #[derive(Debug, Default)]
//! struct Row {
//!     name: Str,
//!     hat: Str,
//! }
//! avro_record!(Row { name: Str, hat: Str });
//!
//! fn main() -> bqavro::Result<()> {
//!     let set = CodecSet::new();
//!
//!     // Writing: the schema is synthesized from Row.
//!     let mut encoder = Encoder::new(Vec::new(), Compression::Null, &set)?;
//!     encoder.encode(&Row { name: "jim".into(), hat: "cat".into() })?;
//!     let file = encoder.into_inner()?;
//!
//!     // Reading: records are decoded straight into Row and delivered with
//!     // the resource bank backing their borrowed data.
//!     read_file(file.as_slice(), &set, |row: &Row, bank| {
//!         assert_eq!(row.name, "jim");
//!         assert_eq!(row.hat, "cat");
//!         bank.close();
//!         Ok(())
//!     })
//! }
//! ```
//!
//! Reader-side projection is structural: schema fields with no counterpart
//! in the target struct are skipped from the wire format alone, so a narrow
//! struct can read a wide file. Custom bindings for third-party types go
//! through [`CodecSet::register_builder`] and
//! [`CodecSet::register_schema`].

#![deny(missing_docs)]
#![deny(unused_must_use)]
#![deny(rust_2018_idioms)]

mod bank;
mod bind;
mod buffer;
pub mod codec;
mod compression;
pub mod config;
mod encoder;
mod error;
mod nullable;
mod reader;
pub mod schema;
mod time;

pub use bank::{ResourceBank, Str};
pub use bind::{build, synthesize, Bind, CodecSet, Reset};
pub use buffer::{ReadBuf, WriteBuf};
pub use codec::record::{FieldSpec, RecordBind};
pub use codec::{BoxCodec, Codec};
pub use compression::Compression;
pub use encoder::{Encoder, FileWriter};
pub use error::{Error, Result};
pub use nullable::Nullable;
pub use reader::{read_file, Header};
pub use schema::{LogicalType, Name, Schema};
pub use time::{parse_rfc3339, Time};
