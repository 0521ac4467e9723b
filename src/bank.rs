//! Reusable per-record scratch storage for decoded strings and byte slices.

use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::{Mutex, OnceLock};

fn pool() -> &'static Mutex<Vec<(BytesMut, usize)>> {
    static POOL: OnceLock<Mutex<Vec<(BytesMut, usize)>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

/// A `ResourceBank` amortizes the allocations behind decoded [`Str`] and
/// [`Bytes`] values across many records.
///
/// Strings and byte slices decoded from a block are carved out of one shared
/// scratch region and stay valid until the bank is closed. The decoder hands
/// a bank to the record callback together with each record; the callback
/// either consumes the record synchronously or keeps the bank alive for as
/// long as it needs the borrowed data, then calls [`close`](Self::close)
/// (dropping the bank does the same).
///
/// The scratch region grows geometrically, to `max(2·current, requested)`,
/// by abandoning the current backing store to the slices already carved from
/// it; those slices keep their store alive through their reference counts.
/// `close` truncates the region, recovers the backing store once every
/// carved slice is gone, and returns the bank to a global pool for the next
/// decoder.
pub struct ResourceBank {
    scratch: BytesMut,
    chunk: usize,
}

impl ResourceBank {
    /// Takes a bank from the global pool, or creates a fresh one.
    pub fn acquire() -> ResourceBank {
        let (scratch, chunk) = pool()
            .lock()
            .ok()
            .and_then(|mut p| p.pop())
            .unwrap_or_default();
        ResourceBank { scratch, chunk }
    }

    /// Copies `raw` into the scratch region and returns it as a UTF-8
    /// string. Fails with `Malformed` if `raw` is not valid UTF-8.
    pub fn to_str(&mut self, raw: &[u8]) -> Result<Str> {
        if std::str::from_utf8(raw).is_err() {
            return Err(Error::Malformed("string value is not valid utf-8".into()));
        }
        Ok(Str(self.carve(raw)))
    }

    /// Copies `raw` into the scratch region and returns it as a byte slice
    /// that stays valid until the bank is closed.
    pub fn to_bytes(&mut self, raw: &[u8]) -> Bytes {
        self.carve(raw)
    }

    fn carve(&mut self, raw: &[u8]) -> Bytes {
        // The scratch buffer is always fully split off, so writes land in
        // whatever tail capacity the current backing store has left. When
        // that runs out a fresh store is reserved and the old one stays
        // behind, pinned by the slices carved from it.
        if self.scratch.capacity() < raw.len() {
            self.chunk = self.chunk.wrapping_mul(2).max(raw.len()).max(16);
            self.scratch.reserve(self.chunk);
        }
        self.scratch.extend_from_slice(raw);
        let len = self.scratch.len();
        self.scratch.split_to(len).freeze()
    }

    /// Marks the bank's memory as available for reuse and returns it to the
    /// pool. Dropping the bank is equivalent.
    pub fn close(self) {}

    fn recycle(&mut self) -> (BytesMut, usize) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        // Recovers the last backing store if every carved slice has been
        // dropped; otherwise the next carve reserves fresh.
        let _ = scratch.try_reclaim(self.chunk);
        (scratch, self.chunk)
    }
}

impl Drop for ResourceBank {
    fn drop(&mut self) {
        let recycled = self.recycle();
        if let Ok(mut p) = pool().lock() {
            p.push(recycled);
        }
    }
}

impl fmt::Debug for ResourceBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBank")
            .field("chunk", &self.chunk)
            .finish()
    }
}

/// An immutable UTF-8 string carved from a [`ResourceBank`].
///
/// `Str` dereferences to `str`; cloning it is a reference-count bump, not a
/// copy. It is the recommended string type for record fields on the hot
/// decode path. [`String`] fields are also supported and copy instead.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Str(Bytes);

impl Str {
    /// The empty string.
    pub const fn new() -> Str {
        Str(Bytes::new())
    }

    /// View as a string slice.
    pub fn as_str(&self) -> &str {
        // Every constructor validates UTF-8 before wrapping the bytes.
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Str {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Str {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Str {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Str {
    fn from(s: &str) -> Str {
        Str(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Str {
    fn from(s: String) -> Str {
        Str(Bytes::from(s.into_bytes()))
    }
}

impl PartialEq<str> for Str {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Str {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}
