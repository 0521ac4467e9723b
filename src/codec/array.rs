//! The array codec: a sequence of counted blocks terminated by a zero
//! count.

use super::skip::skip_blocks;
use super::{read_len, Codec};
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};

/// Codec for `array` bound to `Vec<T>`.
pub struct ArrayCodec<C> {
    pub(crate) item: C,
    pub(crate) omit_empty: bool,
}

impl<C: Codec> Codec for ArrayCodec<C> {
    type Target = Vec<C::Target>;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut Vec<C::Target>) -> Result<()> {
        loop {
            let mut count = buf.varint()?;
            if count == 0 {
                return Ok(());
            }
            if count < 0 {
                // The writer included the block's byte length; only useful
                // when skipping.
                count = count
                    .checked_neg()
                    .ok_or_else(|| Error::Malformed("array block count overflow".into()))?;
                read_len(buf)?;
            }
            // Entries occupy at least one byte each, which bounds how much a
            // corrupt count can make us reserve.
            slot.reserve((count as usize).min(buf.len()));
            while count > 0 {
                let mut item = self.item.new_value();
                self.item
                    .read(buf, &mut item)
                    .map_err(|e| Error::array_entry(slot.len(), e))?;
                slot.push(item);
                count -= 1;
            }
        }
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        skip_blocks(buf, |buf| self.item.skip(buf))
    }

    fn new_value(&self) -> Vec<C::Target> {
        Vec::new()
    }

    fn omit(&self, value: &Vec<C::Target>) -> bool {
        self.omit_empty && value.is_empty()
    }

    fn write(&self, buf: &mut WriteBuf, value: &Vec<C::Target>) -> Result<()> {
        if !value.is_empty() {
            buf.varint(value.len() as i64);
            for (index, item) in value.iter().enumerate() {
                self.item
                    .write(buf, item)
                    .map_err(|e| Error::array_entry(index, e))?;
            }
        }
        // The terminal zero-count block; an empty array is only this.
        buf.varint(0);
        Ok(())
    }
}
