//! Constants shared by the container file reader and writer.

/// The magic header that marks a file as an Avro object container file.
pub const MAGIC_BYTES: &[u8; 4] = b"Obj\x01";

/// Length of the per-file synchronization marker, in bytes.
pub const SYNC_MARKER_SIZE: usize = 16;

/// Length of the CRC32 trailer on snappy-compressed blocks.
#[cfg(feature = "snappy")]
pub const CRC_CHECKSUM_LEN: usize = 4;

/// Default approximate block size, in bytes, at which the [`Encoder`]
/// flushes a block to the output.
///
/// [`Encoder`]: crate::Encoder
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;
