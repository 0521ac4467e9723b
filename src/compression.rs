//! Block compression codecs for the object container file format.

use crate::error::{Error, Result};

#[cfg(feature = "snappy")]
use crate::config::CRC_CHECKSUM_LEN;
#[cfg(feature = "snappy")]
use byteorder::{BigEndian, ByteOrder};

/// The block compression codecs a container file can declare in its
/// `avro.codec` metadata entry. Null is the default when the entry is
/// absent.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Compression {
    /// No compression; blocks are stored as-is.
    Null,
    /// The deflate codec, via <https://docs.rs/flate2>.
    #[cfg(feature = "deflate")]
    Deflate,
    /// The snappy codec with a CRC32 trailer, via <https://docs.rs/snap>.
    #[cfg(feature = "snappy")]
    Snappy,
}

impl AsRef<str> for Compression {
    fn as_ref(&self) -> &str {
        match self {
            Compression::Null => "null",
            #[cfg(feature = "deflate")]
            Compression::Deflate => "deflate",
            #[cfg(feature = "snappy")]
            Compression::Snappy => "snappy",
        }
    }
}

impl std::convert::TryFrom<&str> for Compression {
    type Error = Error;

    fn try_from(value: &str) -> Result<Compression> {
        match value {
            "null" => Ok(Compression::Null),
            #[cfg(feature = "deflate")]
            "deflate" => Ok(Compression::Deflate),
            #[cfg(feature = "snappy")]
            "snappy" => Ok(Compression::Snappy),
            other => Err(Error::Unsupported(format!("compression codec {other:?}"))),
        }
    }
}

impl Compression {
    /// Compresses `block` into `out` (cleared first). For snappy the 4-byte
    /// big-endian CRC32 of the uncompressed block is appended.
    pub(crate) fn compress(&self, block: &[u8], out: &mut Vec<u8>) -> Result<()> {
        out.clear();
        match self {
            Compression::Null => {
                out.extend_from_slice(block);
                Ok(())
            }
            #[cfg(feature = "deflate")]
            Compression::Deflate => {
                use flate2::write::DeflateEncoder;
                use std::io::Write;

                let mut encoder =
                    DeflateEncoder::new(std::mem::take(out), flate2::Compression::default());
                encoder.write_all(block).map_err(Error::Io)?;
                *out = encoder.finish().map_err(Error::Io)?;
                Ok(())
            }
            #[cfg(feature = "snappy")]
            Compression::Snappy => {
                out.resize(snap::raw::max_compress_len(block.len()), 0);
                let len = snap::raw::Encoder::new()
                    .compress(block, out)
                    .map_err(|e| Error::Malformed(format!("snappy compression failed: {e}")))?;
                out.truncate(len);

                let mut trailer = [0u8; CRC_CHECKSUM_LEN];
                BigEndian::write_u32(&mut trailer, crc32fast::hash(block));
                out.extend_from_slice(&trailer);
                Ok(())
            }
        }
    }

    /// Decompresses `compressed`, reusing `scratch` as the output buffer
    /// across blocks. Null passes the input through without copying. Snappy
    /// verifies the trailing CRC32 of the decompressed output.
    pub(crate) fn decompress<'a>(
        &self,
        compressed: &'a [u8],
        scratch: &'a mut Vec<u8>,
    ) -> Result<&'a [u8]> {
        match self {
            Compression::Null => Ok(compressed),
            #[cfg(feature = "deflate")]
            Compression::Deflate => {
                use flate2::bufread::DeflateDecoder;
                use std::io::Read;

                scratch.clear();
                DeflateDecoder::new(compressed)
                    .read_to_end(scratch)
                    .map_err(Error::Io)?;
                Ok(scratch)
            }
            #[cfg(feature = "snappy")]
            Compression::Snappy => {
                if compressed.len() < CRC_CHECKSUM_LEN {
                    return Err(Error::Malformed(
                        "snappy block is too short to carry its crc trailer".into(),
                    ));
                }
                let (data, trailer) = compressed.split_at(compressed.len() - CRC_CHECKSUM_LEN);

                let len = snap::raw::decompress_len(data)
                    .map_err(|e| Error::Malformed(format!("snappy decompression failed: {e}")))?;
                scratch.resize(len, 0);
                snap::raw::Decoder::new()
                    .decompress(data, scratch)
                    .map_err(|e| Error::Malformed(format!("snappy decompression failed: {e}")))?;

                let expected = BigEndian::read_u32(trailer);
                let found = crc32fast::hash(scratch);
                if found != expected {
                    return Err(Error::ChecksumMismatch { found, expected });
                }
                Ok(scratch)
            }
        }
    }
}
