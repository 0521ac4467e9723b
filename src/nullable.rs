//! A nullable wrapper distinguishing "absent" from the zero value.
//!
//! A plain field bound under a `[null, T]` union decodes nulls as its zero
//! value, which loses the distinction between `0` and `null`. [`Nullable`]
//! keeps it: reading a value sets `valid`, the null branch leaves it
//! `false`, and writing a `Nullable` with `valid == false` emits the null
//! branch.

use crate::bind::{build, synthesize, Bind, CodecSet, Reset};
use crate::buffer::{ReadBuf, WriteBuf};
use crate::codec::{BoxCodec, Codec};
use crate::error::Result;
use crate::schema::Schema;

/// A value of `T` that may be null on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nullable<T> {
    /// Whether a value was present.
    pub valid: bool,
    /// The value; meaningful only when `valid` is set.
    pub value: T,
}

impl<T> Nullable<T> {
    /// A present value.
    pub fn some(value: T) -> Nullable<T> {
        Nullable { valid: true, value }
    }

    /// An absent value.
    pub fn none() -> Nullable<T>
    where
        T: Default,
    {
        Nullable::default()
    }

    /// The value, if present.
    pub fn get(&self) -> Option<&T> {
        self.valid.then_some(&self.value)
    }
}

impl<T> From<T> for Nullable<T> {
    fn from(value: T) -> Nullable<T> {
        Nullable::some(value)
    }
}

impl<T: Reset> Reset for Nullable<T> {
    fn reset(&mut self) {
        self.valid = false;
        self.value.reset();
    }
}

impl<T: Bind> Bind for Nullable<T> {
    fn bind(schema: &Schema, set: &CodecSet, optional: bool) -> Result<BoxCodec<Nullable<T>>> {
        Ok(Box::new(NullableWrapCodec {
            inner: build::<T>(schema, set, optional)?,
        }))
    }

    fn schema(set: &CodecSet) -> Result<Schema> {
        let inner = synthesize::<T>(set)?;
        Ok(match inner {
            Schema::Union(_) => inner,
            other => Schema::nullable(other),
        })
    }
}

struct NullableWrapCodec<T> {
    inner: BoxCodec<T>,
}

impl<T: Bind> Codec for NullableWrapCodec<T> {
    type Target = Nullable<T>;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Nullable<T>) -> Result<()> {
        slot.valid = true;
        self.inner.read(buf, &mut slot.value)
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        self.inner.skip(buf)
    }

    fn new_value(&self) -> Nullable<T> {
        Nullable::default()
    }

    fn omit(&self, value: &Nullable<T>) -> bool {
        !value.valid
    }

    fn write(&self, buf: &mut WriteBuf, value: &Nullable<T>) -> Result<()> {
        self.inner.write(buf, &value.value)
    }
}
