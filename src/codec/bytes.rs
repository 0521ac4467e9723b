//! Codecs for `bytes`, `string` and `fixed`.

use super::{read_len, Codec};
use crate::bank::Str;
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};
use bytes::Bytes;

/// Codec for `bytes` bound to [`Bytes`]. Decoded slices are carved from the
/// cursor's resource bank and stay valid until the bank closes.
pub struct BytesCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for BytesCodec {
    type Target = Bytes;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Bytes) -> Result<()> {
        let len = read_len(buf)?;
        *slot = buf.next_as_bytes(len)?;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        let len = read_len(buf)?;
        buf.next(len).map(drop)
    }

    fn new_value(&self) -> Bytes {
        Bytes::new()
    }

    fn omit(&self, value: &Bytes) -> bool {
        self.omit_empty && value.is_empty()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Bytes) -> Result<()> {
        buf.varint(value.len() as i64);
        buf.write(value);
        Ok(())
    }
}

/// Codec for `string` bound to [`Str`], the bank-backed string type.
pub struct StrCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for StrCodec {
    type Target = Str;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Str) -> Result<()> {
        let len = read_len(buf)?;
        *slot = buf.next_as_str(len)?;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        let len = read_len(buf)?;
        buf.next(len).map(drop)
    }

    fn new_value(&self) -> Str {
        Str::new()
    }

    fn omit(&self, value: &Str) -> bool {
        self.omit_empty && value.is_empty()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Str) -> Result<()> {
        buf.varint(value.len() as i64);
        buf.write(value.as_bytes());
        Ok(())
    }
}

/// Codec for `string` bound to an owned [`String`]. Copies into the slot's
/// own buffer, so a reused record slot stops allocating once warm.
pub struct StringCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for StringCodec {
    type Target = String;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut String) -> Result<()> {
        let len = read_len(buf)?;
        let raw = buf.next(len)?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| Error::Malformed("string value is not valid utf-8".into()))?;
        slot.clear();
        slot.push_str(s);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        let len = read_len(buf)?;
        buf.next(len).map(drop)
    }

    fn new_value(&self) -> String {
        String::new()
    }

    fn omit(&self, value: &String) -> bool {
        self.omit_empty && value.is_empty()
    }

    fn write(&self, buf: &mut WriteBuf, value: &String) -> Result<()> {
        buf.varint(value.len() as i64);
        buf.write(value.as_bytes());
        Ok(())
    }
}

/// Codec for `fixed(N)` bound to `[u8; N]`: N raw bytes, no length prefix.
pub struct FixedCodec<const N: usize>;

impl<const N: usize> Codec for FixedCodec<N> {
    type Target = [u8; N];

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut [u8; N]) -> Result<()> {
        slot.copy_from_slice(buf.next(N)?);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.next(N).map(drop)
    }

    fn new_value(&self) -> [u8; N] {
        [0; N]
    }

    fn write(&self, buf: &mut WriteBuf, value: &[u8; N]) -> Result<()> {
        buf.write(value);
        Ok(())
    }
}
