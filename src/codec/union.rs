//! Union codecs. The two-branch nullable shape dominates BigQuery exports
//! and gets its own specializations; everything else goes through the
//! generic selector dispatch.

use super::bytes::StrCodec;
use super::{BoxCodec, Codec};
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};

/// Generic union codec: a varint selector followed by the selected branch.
/// Every branch is bound to the same target type. Writing a generic union
/// requires a selector-from-value mechanism the engine does not have, so
/// `write` fails with `Unsupported`.
pub struct UnionCodec<T> {
    branches: Vec<BoxCodec<T>>,
}

impl<T> UnionCodec<T> {
    pub(crate) fn new(branches: Vec<BoxCodec<T>>) -> UnionCodec<T> {
        UnionCodec { branches }
    }

    fn branch(&self, selector: i64) -> Result<&BoxCodec<T>> {
        usize::try_from(selector)
            .ok()
            .and_then(|i| self.branches.get(i))
            .ok_or(Error::Selector {
                found: selector,
                arity: self.branches.len(),
            })
    }
}

impl<T: Default> Codec for UnionCodec<T> {
    type Target = T;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut T) -> Result<()> {
        let selector = buf.varint()?;
        self.branch(selector)?.read(buf, slot)
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        let selector = buf.varint()?;
        self.branch(selector)?.skip(buf)
    }

    fn new_value(&self) -> T {
        T::default()
    }

    fn write(&self, _buf: &mut WriteBuf, _value: &T) -> Result<()> {
        Err(Error::Unsupported("writing a generic union".into()))
    }
}

/// The nullable-of-T specialization: exactly two branches, exactly one of
/// them null. The selector is a single byte, 0 or 2 (the zig-zag encodings
/// of branch indexes 0 and 1).
///
/// On the null branch the target slot is left untouched, which in a freshly
/// reset record means it holds its zero value. On write, the child codec's
/// [`omit`](Codec::omit) decides between the null and non-null branches.
pub struct NullableCodec<C> {
    inner: C,
    non_null: u8,
}

impl<C> NullableCodec<C> {
    /// `non_null` is the position (0 or 1) of the non-null branch in the
    /// union's schema.
    pub(crate) fn new(inner: C, non_null: usize) -> NullableCodec<C> {
        NullableCodec {
            inner,
            non_null: non_null as u8,
        }
    }

    fn selector(&self, buf: &mut ReadBuf<'_>) -> Result<u8> {
        let raw = buf.read_byte()?;
        if raw != 0 && raw != 2 {
            let decoded = (i64::from(raw) >> 1) ^ -(i64::from(raw) & 1);
            return Err(Error::Selector {
                found: decoded,
                arity: 2,
            });
        }
        Ok(raw / 2)
    }
}

impl<C: Codec> Codec for NullableCodec<C> {
    type Target = C::Target;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut C::Target) -> Result<()> {
        if self.selector(buf)? == self.non_null {
            self.inner.read(buf, slot)
        } else {
            Ok(())
        }
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        if self.selector(buf)? == self.non_null {
            self.inner.skip(buf)
        } else {
            Ok(())
        }
    }

    fn new_value(&self) -> C::Target {
        self.inner.new_value()
    }

    fn write(&self, buf: &mut WriteBuf, value: &C::Target) -> Result<()> {
        if self.inner.omit(value) {
            buf.byte((1 - self.non_null) * 2);
            Ok(())
        } else {
            buf.byte(self.non_null * 2);
            self.inner.write(buf, value)
        }
    }
}

/// Nullable-of-string with the string codec inlined, avoiding a boxed call
/// per value in the hot path.
pub type NullableStrCodec = NullableCodec<StrCodec>;
