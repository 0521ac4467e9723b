//! The map codec. Keys are always strings per the Avro spec; values go
//! through the bound value codec.

use super::skip::skip_blocks;
use super::{read_len, Codec};
use crate::bank::Str;
use crate::buffer::{ReadBuf, WriteBuf};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;

/// A map key type: either an owned [`String`] or a bank-backed [`Str`].
pub trait MapKey: Eq + Hash + Display + Send + Sync + 'static {
    /// Decodes one key from the cursor.
    fn read_key(buf: &mut ReadBuf<'_>) -> Result<Self>
    where
        Self: Sized;

    /// The key's bytes, for writing.
    fn key_bytes(&self) -> &[u8];
}

impl MapKey for String {
    fn read_key(buf: &mut ReadBuf<'_>) -> Result<String> {
        let len = read_len(buf)?;
        let raw = buf.next(len)?;
        match std::str::from_utf8(raw) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(Error::Malformed("map key is not valid utf-8".into())),
        }
    }

    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl MapKey for Str {
    fn read_key(buf: &mut ReadBuf<'_>) -> Result<Str> {
        let len = read_len(buf)?;
        buf.next_as_str(len)
    }

    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Codec for `map` bound to `HashMap<K, V>` with string keys.
pub struct MapCodec<K, C> {
    pub(crate) value: C,
    pub(crate) omit_empty: bool,
    pub(crate) _key: PhantomData<fn() -> K>,
}

impl<K, C> MapCodec<K, C> {
    pub(crate) fn new(value: C, omit_empty: bool) -> MapCodec<K, C> {
        MapCodec {
            value,
            omit_empty,
            _key: PhantomData,
        }
    }
}

impl<K: MapKey, C: Codec> Codec for MapCodec<K, C> {
    type Target = HashMap<K, C::Target>;

    fn read(&self, buf: &mut ReadBuf<'_>, slot: &mut HashMap<K, C::Target>) -> Result<()> {
        loop {
            let mut count = buf.varint()?;
            if count == 0 {
                return Ok(());
            }
            if count < 0 {
                count = count
                    .checked_neg()
                    .ok_or_else(|| Error::Malformed("map block count overflow".into()))?;
                read_len(buf)?;
            }
            while count > 0 {
                let key = K::read_key(buf)?;
                let mut value = self.value.new_value();
                self.value
                    .read(buf, &mut value)
                    .map_err(|e| Error::map_key(&key, e))?;
                // Duplicate keys follow last-writer-wins.
                slot.insert(key, value);
                count -= 1;
            }
        }
    }

    fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        skip_blocks(buf, |buf| {
            let key_len = read_len(buf)?;
            buf.next(key_len)?;
            self.value.skip(buf)
        })
    }

    fn new_value(&self) -> HashMap<K, C::Target> {
        HashMap::new()
    }

    fn omit(&self, value: &HashMap<K, C::Target>) -> bool {
        self.omit_empty && value.is_empty()
    }

    fn write(&self, buf: &mut WriteBuf, value: &HashMap<K, C::Target>) -> Result<()> {
        if !value.is_empty() {
            // One block, entries in the map's own iteration order.
            buf.varint(value.len() as i64);
            for (key, entry) in value {
                buf.varint(key.key_bytes().len() as i64);
                buf.write(key.key_bytes());
                self.value
                    .write(buf, entry)
                    .map_err(|e| Error::map_key(key, e))?;
            }
        }
        buf.varint(0);
        Ok(())
    }
}
