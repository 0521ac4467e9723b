//! The pointer codec, for target fields that are `Option<T>`.

use super::Codec;
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};

/// Codec wrapping a child codec for an `Option<T>` target.
///
/// On read, an empty slot is populated with a fresh value from the child
/// codec before decoding into it. On write, an empty slot is reported
/// through [`omit`](Codec::omit) so an enclosing nullable union emits the
/// null branch; writing `None` outside such a union is an error.
pub struct PointerCodec<C> {
    pub(crate) inner: C,
}

impl<C: Codec> Codec for PointerCodec<C> {
    type Target = Option<C::Target>;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Option<C::Target>) -> Result<()> {
        let value = slot.get_or_insert_with(|| self.inner.new_value());
        self.inner.read(buf, value)
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        self.inner.skip(buf)
    }

    fn new_value(&self) -> Option<C::Target> {
        None
    }

    fn omit(&self, value: &Option<C::Target>) -> bool {
        value.is_none()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Option<C::Target>) -> Result<()> {
        match value {
            Some(value) => self.inner.write(buf, value),
            None => Err(Error::Unsupported(
                "encoding a missing value outside a nullable union".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::primitives::Int64Codec;
    use crate::codec::union::NullableCodec;

    #[test]
    fn read_populates_empty_slots() {
        let codec = PointerCodec {
            inner: Int64Codec { omit_empty: false },
        };
        let mut buf = ReadBuf::new(&[0x54]);
        let mut slot = None;
        codec.read(&mut buf, &mut slot).unwrap();
        assert_eq!(slot, Some(42));
    }

    #[test]
    fn nullable_option_round_trip() {
        // The common shape: Option<i64> under a [null, long] union.
        let codec = NullableCodec::new(
            PointerCodec {
                inner: Int64Codec { omit_empty: false },
            },
            1,
        );

        let mut out = WriteBuf::new();
        codec.write(&mut out, &Some(7)).unwrap();
        assert_eq!(out.bytes(), &[0x02, 0x0e]);

        let mut slot = codec.new_value();
        codec.read(&mut ReadBuf::new(out.bytes()), &mut slot).unwrap();
        assert_eq!(slot, Some(7));

        let mut out = WriteBuf::new();
        codec.write(&mut out, &None).unwrap();
        assert_eq!(out.bytes(), &[0x00]);

        let mut slot = codec.new_value();
        codec.read(&mut ReadBuf::new(out.bytes()), &mut slot).unwrap();
        assert_eq!(slot, None);
    }

    #[test]
    fn bare_none_cannot_be_written() {
        let codec = PointerCodec {
            inner: Int64Codec { omit_empty: false },
        };
        let mut out = WriteBuf::new();
        assert!(matches!(
            codec.write(&mut out, &None),
            Err(Error::Unsupported(_))
        ));
    }
}
