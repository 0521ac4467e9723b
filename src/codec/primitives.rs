//! Codecs for the numeric, boolean and null primitives.

use super::Codec;
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::marker::PhantomData;

/// The no-op codec for the `null` primitive. Reads and writes nothing and
/// always omits; the target slot keeps its zeroed state.
pub struct NullCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for NullCodec<T> {
    fn default() -> Self {
        NullCodec(PhantomData)
    }
}

impl<T: Default + Send + Sync> Codec for NullCodec<T> {
    type Target = T;

    fn read(&self, _buf: &mut ReadBuf<'_>, _slot: &mut T) -> Result<()> {
        Ok(())
    }

    fn skip(&self, _buf: &mut ReadBuf<'_>) -> Result<()> {
        Ok(())
    }

    fn new_value(&self) -> T {
        T::default()
    }

    fn omit(&self, _value: &T) -> bool {
        true
    }

    fn write(&self, _buf: &mut WriteBuf, _value: &T) -> Result<()> {
        Ok(())
    }
}

/// Codec for `boolean` bound to `bool`.
pub struct BoolCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for BoolCodec {
    type Target = bool;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut bool) -> Result<()> {
        *slot = buf.read_byte()? != 0;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.next(1).map(drop)
    }

    fn new_value(&self) -> bool {
        false
    }

    fn omit(&self, value: &bool) -> bool {
        self.omit_empty && !*value
    }

    fn write(&self, buf: &mut WriteBuf, value: &bool) -> Result<()> {
        buf.byte(u8::from(*value));
        Ok(())
    }
}

macro_rules! int_codec {
    ($(#[$doc:meta])* $codec:ident, $ty:ty, $label:literal) => {
        $(#[$doc])*
        pub struct $codec {
            pub(crate) omit_empty: bool,
        }

        impl Codec for $codec {
            type Target = $ty;

            fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut $ty) -> Result<()> {
                let v = buf.varint()?;
                if v > <$ty>::MAX as i64 || v < <$ty>::MIN as i64 {
                    return Err(Error::Range {
                        value: v,
                        target: $label,
                    });
                }
                *slot = v as $ty;
                Ok(())
            }

            fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
                buf.varint().map(drop)
            }

            fn new_value(&self) -> $ty {
                0
            }

            fn omit(&self, value: &$ty) -> bool {
                self.omit_empty && *value == 0
            }

            fn write(&self, buf: &mut WriteBuf, value: &$ty) -> Result<()> {
                buf.varint(i64::from(*value));
                Ok(())
            }
        }
    };
}

int_codec!(
    /// Codec for `int`/`long` bound to `i16`, with a read-time range check.
    Int16Codec, i16, "int16"
);
int_codec!(
    /// Codec for `int`/`long` bound to `i32`, with a read-time range check.
    Int32Codec, i32, "int32"
);

/// Codec for `int`/`long` bound to `i64`.
pub struct Int64Codec {
    pub(crate) omit_empty: bool,
}

impl Codec for Int64Codec {
    type Target = i64;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut i64) -> Result<()> {
        *slot = buf.varint()?;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.varint().map(drop)
    }

    fn new_value(&self) -> i64 {
        0
    }

    fn omit(&self, value: &i64) -> bool {
        self.omit_empty && *value == 0
    }

    fn write(&self, buf: &mut WriteBuf, value: &i64) -> Result<()> {
        buf.varint(*value);
        Ok(())
    }
}

/// Codec for `int`/`long` bound to `u64`. Negative wire values fail with
/// `Range`; values above `i64::MAX` cannot be carried by the zig-zag wire
/// form and fail on write.
pub struct Uint64Codec {
    pub(crate) omit_empty: bool,
}

impl Codec for Uint64Codec {
    type Target = u64;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut u64) -> Result<()> {
        let v = buf.varint()?;
        if v < 0 {
            return Err(Error::Range {
                value: v,
                target: "uint64",
            });
        }
        *slot = v as u64;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.varint().map(drop)
    }

    fn new_value(&self) -> u64 {
        0
    }

    fn omit(&self, value: &u64) -> bool {
        self.omit_empty && *value == 0
    }

    fn write(&self, buf: &mut WriteBuf, value: &u64) -> Result<()> {
        let v = i64::try_from(*value).map_err(|_| Error::Overflow)?;
        buf.varint(v);
        Ok(())
    }
}

/// Codec for `float` bound to `f32`: four little-endian IEEE-754 bytes.
pub struct FloatCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for FloatCodec {
    type Target = f32;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut f32) -> Result<()> {
        *slot = LittleEndian::read_f32(buf.next(4)?);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.next(4).map(drop)
    }

    fn new_value(&self) -> f32 {
        0.0
    }

    fn omit(&self, value: &f32) -> bool {
        self.omit_empty && *value == 0.0
    }

    fn write(&self, buf: &mut WriteBuf, value: &f32) -> Result<()> {
        let mut bytes = [0u8; 4];
        LittleEndian::write_f32(&mut bytes, *value);
        buf.write(&bytes);
        Ok(())
    }
}

/// Codec for `double` bound to `f64`: eight little-endian IEEE-754 bytes.
pub struct DoubleCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for DoubleCodec {
    type Target = f64;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut f64) -> Result<()> {
        *slot = LittleEndian::read_f64(buf.next(8)?);
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.next(8).map(drop)
    }

    fn new_value(&self) -> f64 {
        0.0
    }

    fn omit(&self, value: &f64) -> bool {
        self.omit_empty && *value == 0.0
    }

    fn write(&self, buf: &mut WriteBuf, value: &f64) -> Result<()> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_f64(&mut bytes, *value);
        buf.write(&bytes);
        Ok(())
    }
}

/// Coercion codec for `double` bound to `f32`: reads eight little-endian
/// bytes and truncates to 32-bit IEEE-754; writes widen back to 64-bit.
///
/// BigQuery exports every floating-point column as `double`, so `f32`
/// fields go through this codec rather than [`FloatCodec`].
pub struct FloatAsDoubleCodec {
    pub(crate) omit_empty: bool,
}

impl Codec for FloatAsDoubleCodec {
    type Target = f32;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut f32) -> Result<()> {
        *slot = LittleEndian::read_f64(buf.next(8)?) as f32;
        Ok(())
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        buf.next(8).map(drop)
    }

    fn new_value(&self) -> f32 {
        0.0
    }

    fn omit(&self, value: &f32) -> bool {
        self.omit_empty && *value == 0.0
    }

    fn write(&self, buf: &mut WriteBuf, value: &f32) -> Result<()> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_f64(&mut bytes, f64::from(*value));
        buf.write(&bytes);
        Ok(())
    }
}
