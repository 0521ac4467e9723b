//! The codec interface and its implementations, one per Avro type.
//!
//! A codec is one binding of an Avro schema node to a target Rust type. It
//! is built once by [`build`](crate::build), immutable afterwards, and
//! shared across decode and encode passes.

use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};

pub mod array;
pub mod bytes;
pub mod map;
pub mod pointer;
pub mod primitives;
pub mod record;
pub mod skip;
pub mod union;

/// One binding of (schema node, target type), with five capabilities.
///
/// `read` decodes the next value from the cursor into a slot the caller
/// owns; `skip` advances the cursor past one value using the wire format
/// alone; `new_value` produces a fresh zeroed slot; `omit` reports whether a
/// value should be written as the null branch of an enclosing nullable
/// union; `write` serializes a value.
pub trait Codec: Send + Sync {
    /// The Rust type this codec decodes into and encodes from.
    type Target;

    /// Decodes one value from `buf` into `slot`.
    ///
    /// `slot` is in its zeroed state when the enclosing record was freshly
    /// reset; codecs that leave it untouched (null, the null branch of a
    /// union) thereby produce the zero value.
    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Self::Target) -> Result<()>;

    /// Advances `buf` past one value without materializing it.
    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()>;

    /// Produces a fresh zeroed value of the target type.
    fn new_value(&self) -> Self::Target;

    /// Whether `value` should be encoded as absent by an enclosing nullable
    /// union. The default never omits.
    fn omit(&self, value: &Self::Target) -> bool {
        let _ = value;
        false
    }

    /// Encodes `value` into `buf`.
    fn write(&self, buf: &mut WriteBuf, value: &Self::Target) -> Result<()>;
}

/// A boxed, type-erased codec for target type `T`.
pub type BoxCodec<T> = Box<dyn Codec<Target = T>>;

impl<C: Codec + ?Sized> Codec for Box<C> {
    type Target = C::Target;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Self::Target) -> Result<()> {
        (**self).read(buf, slot)
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        (**self).skip(buf)
    }

    fn new_value(&self) -> Self::Target {
        (**self).new_value()
    }

    fn omit(&self, value: &Self::Target) -> bool {
        (**self).omit(value)
    }

    fn write(&self, buf: &mut WriteBuf, value: &Self::Target) -> Result<()> {
        (**self).write(buf, value)
    }
}

/// Reads the length prefix of a string, bytes or block body.
pub(crate) fn read_len(buf: &mut ReadBuf<'_>) -> Result<usize> {
    let len = buf.varint()?;
    usize::try_from(len).map_err(|_| Error::Malformed(format!("negative length prefix {len}")))
}
