//! Remaining-length varint and big-endian field helpers.

use super::error::Error;

/// Largest value a four byte remaining-length field can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Most bytes a remaining-length field can occupy.
pub const MAX_LENGTH_WIDTH: usize = 4;

/// Number of bytes `value` needs as a remaining-length field.
///
/// Values above [`MAX_REMAINING_LENGTH`] report the maximum width; use
/// [`encode_length`] to detect them.
pub const fn length_width(value: usize) -> usize {
    if value < 128 {
        1
    } else if value < 16_384 {
        2
    } else if value < 2_097_152 {
        3
    } else {
        4
    }
}

/// Decode a remaining-length field from the start of `bytes`.
///
/// Returns `Ok(None)` when `bytes` ends before the field does, and
/// `Ok(Some((value, consumed)))` once the field is complete.
///
/// # Errors
///
/// [`Error::PacketTooLarge`] when the fourth byte still has its continuation
/// bit set, i.e. the value would need a fifth byte.
pub fn decode_length(bytes: &[u8]) -> Result<Option<(usize, usize)>, Error> {
    let mut value = 0usize;
    for (i, &byte) in bytes.iter().take(MAX_LENGTH_WIDTH).enumerate() {
        value |= ((byte & 0x7F) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    if bytes.len() >= MAX_LENGTH_WIDTH {
        return Err(Error::PacketTooLarge);
    }
    Ok(None)
}

/// Encode `value` as a remaining-length field at the start of `out`.
///
/// Writes the minimal number of bytes and returns that count.
///
/// # Errors
///
/// * [`Error::PacketTooLarge`] - `value` exceeds [`MAX_REMAINING_LENGTH`]
/// * [`Error::InvalidParameter`] - `out` is shorter than the encoded width
pub fn encode_length(value: usize, out: &mut [u8]) -> Result<usize, Error> {
    if value > MAX_REMAINING_LENGTH {
        return Err(Error::PacketTooLarge);
    }
    let width = length_width(value);
    if out.len() < width {
        return Err(Error::InvalidParameter);
    }

    let mut rest = value;
    for slot in out.iter_mut().take(width) {
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest > 0 {
            byte |= 0x80;
        }
        *slot = byte;
    }
    Ok(width)
}

/// Write a big-endian `u16` at `*offset` and advance it.
pub(crate) fn put_u16(out: &mut [u8], offset: &mut usize, value: u16) {
    out[*offset..*offset + 2].copy_from_slice(&value.to_be_bytes());
    *offset += 2;
}

/// Write a big-endian `u32` at `*offset` and advance it.
pub(crate) fn put_u32(out: &mut [u8], offset: &mut usize, value: u32) {
    out[*offset..*offset + 4].copy_from_slice(&value.to_be_bytes());
    *offset += 4;
}

/// Copy `bytes` to `*offset` and advance it.
pub(crate) fn put_bytes(out: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    out[*offset..*offset + bytes.len()].copy_from_slice(bytes);
    *offset += bytes.len();
}

/// Write a length-prefixed string at `*offset` and advance it.
///
/// The caller has already checked that `bytes` fits in a `u16` length.
pub(crate) fn put_string(out: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    put_u16(out, offset, bytes.len() as u16);
    put_bytes(out, offset, bytes);
}

/// Read a big-endian `u16` at `offset`, if present.
pub(crate) fn get_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let pair = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([pair[0], pair[1]]))
}

/// Size of a length-prefixed string field, failing for strings that do not fit
/// the 16-bit prefix.
pub(crate) fn string_field_len(bytes: &[u8]) -> Result<usize, Error> {
    if bytes.len() > u16::MAX as usize {
        return Err(Error::InvalidParameter);
    }
    Ok(2 + bytes.len())
}
