//! Bounds-checked little-endian field access over borrowed buffers.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FormatError, Result};

pub(crate) fn slice<'a>(
    bytes: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(FormatError::Truncated {
            what,
            offset,
            needed: len,
            available: bytes.len(),
        })
}

pub(crate) fn read_u8(bytes: &[u8], offset: usize, what: &'static str) -> Result<u8> {
    Ok(slice(bytes, offset, 1, what)?[0])
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize, what: &'static str) -> Result<u16> {
    Ok(LittleEndian::read_u16(slice(bytes, offset, 2, what)?))
}

pub(crate) fn read_i16(bytes: &[u8], offset: usize, what: &'static str) -> Result<i16> {
    Ok(LittleEndian::read_i16(slice(bytes, offset, 2, what)?))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize, what: &'static str) -> Result<u32> {
    Ok(LittleEndian::read_u32(slice(bytes, offset, 4, what)?))
}

/// Serialises diagnostic file pointers as `0x` plus eight hex digits.
pub(crate) fn serialize_pointer<S>(value: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{value:#010x}"))
}
