//! Schema-driven skipping for fields that have no binding in the target
//! type. A [`Skipper`] mirrors the schema's shape and consumes values using
//! the wire format alone.

use super::read_len;
use crate::buffer::ReadBuf;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// Advances a cursor past one value of a given schema. Built for schema
/// fields the target type does not carry, including types that cannot be
/// materialized at all (such as enums).
#[derive(Debug)]
pub(crate) enum Skipper {
    Null,
    Byte,
    Varint,
    Float,
    Double,
    Bytes,
    Fixed(usize),
    Array(Box<Skipper>),
    Map(Box<Skipper>),
    Record(Vec<Skipper>),
    Union(Vec<Skipper>),
}

impl Skipper {
    pub(crate) fn for_schema(schema: &Schema) -> Result<Skipper> {
        Ok(match schema {
            Schema::Null => Skipper::Null,
            Schema::Boolean => Skipper::Byte,
            // Enum values are varint symbol indexes on the wire.
            Schema::Int { .. } | Schema::Long { .. } | Schema::Enum(_) => Skipper::Varint,
            Schema::Float => Skipper::Float,
            Schema::Double => Skipper::Double,
            Schema::Bytes | Schema::String => Skipper::Bytes,
            Schema::Fixed(f) => Skipper::Fixed(f.size),
            Schema::Array(items) => Skipper::Array(Box::new(Skipper::for_schema(items)?)),
            Schema::Map(values) => Skipper::Map(Box::new(Skipper::for_schema(values)?)),
            Schema::Record(record) => Skipper::Record(
                record
                    .fields
                    .values()
                    .map(Skipper::for_schema)
                    .collect::<Result<_>>()?,
            ),
            Schema::Union(branches) => Skipper::Union(
                branches
                    .iter()
                    .map(Skipper::for_schema)
                    .collect::<Result<_>>()?,
            ),
        })
    }

    pub(crate) fn skip(&self, buf: &mut ReadBuf<'_>) -> Result<()> {
        match self {
            Skipper::Null => Ok(()),
            Skipper::Byte => buf.next(1).map(drop),
            Skipper::Varint => buf.varint().map(drop),
            Skipper::Float => buf.next(4).map(drop),
            Skipper::Double => buf.next(8).map(drop),
            Skipper::Bytes => {
                let len = read_len(buf)?;
                buf.next(len).map(drop)
            }
            Skipper::Fixed(size) => buf.next(*size).map(drop),
            Skipper::Array(item) => skip_blocks(buf, |buf| item.skip(buf)),
            Skipper::Map(value) => skip_blocks(buf, |buf| {
                let key_len = read_len(buf)?;
                buf.next(key_len)?;
                value.skip(buf)
            }),
            Skipper::Record(fields) => {
                for field in fields {
                    field.skip(buf)?;
                }
                Ok(())
            }
            Skipper::Union(branches) => {
                let selector = buf.varint()?;
                let branch = usize::try_from(selector)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Error::Selector {
                        found: selector,
                        arity: branches.len(),
                    })?;
                branch.skip(buf)
            }
        }
    }
}

/// Walks the block framing shared by arrays and maps, skipping whole blocks
/// by their byte length when the writer provided one.
pub(crate) fn skip_blocks(
    buf: &mut ReadBuf<'_>,
    mut skip_entry: impl FnMut(&mut ReadBuf<'_>) -> Result<()>,
) -> Result<()> {
    loop {
        let mut count = buf.varint()?;
        if count == 0 {
            return Ok(());
        }
        if count < 0 {
            // A negative count is followed by the block's byte length, which
            // lets us skip the entries without decoding them.
            let byte_len = read_len(buf)?;
            buf.next(byte_len)?;
            continue;
        }
        while count > 0 {
            skip_entry(buf)?;
            count -= 1;
        }
    }
}
