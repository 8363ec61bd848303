//! Strict UTF-8 validation and identifier checks.
//!
//! MQTT strings must be well-formed UTF-8 (RFC 3629) and must not carry
//! U+0000. [`check_utf8`] treats NUL as a terminator and reports how many bytes
//! precede it, so callers decide whether a short count is acceptable.

use super::error::Error;

/// Continuation byte count for every possible lead byte.
///
/// Entries for bytes that can never start a sequence are rejected separately.
const TRAILING_BYTES: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = if i < 0xC0 {
            0
        } else if i < 0xE0 {
            1
        } else if i < 0xF0 {
            2
        } else {
            3
        };
        i += 1;
    }
    table
};

/// Validate `bytes` as UTF-8, stopping at the first NUL.
///
/// Returns the number of bytes before the terminator (or the full length).
///
/// # Errors
///
/// [`Error::NotUtf8`] for lone continuation bytes, overlong forms, surrogates,
/// code points above U+10FFFF and truncated sequences.
pub fn check_utf8(bytes: &[u8]) -> Result<usize, Error> {
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        if lead == 0 {
            return Ok(i);
        }
        if lead < 0x80 {
            i += 1;
            continue;
        }
        if !(0xC2..=0xF4).contains(&lead) {
            return Err(Error::NotUtf8);
        }

        let trailing = TRAILING_BYTES[lead as usize] as usize;
        let Some(tail) = bytes.get(i + 1..i + 1 + trailing) else {
            return Err(Error::NotUtf8);
        };

        // Tighter ranges for the second byte rule out overlong forms,
        // surrogates and anything past U+10FFFF.
        let second_ok = match lead {
            0xE0 => (0xA0..=0xBF).contains(&tail[0]),
            0xED => (0x80..=0x9F).contains(&tail[0]),
            0xF0 => (0x90..=0xBF).contains(&tail[0]),
            0xF4 => (0x80..=0x8F).contains(&tail[0]),
            _ => (0x80..=0xBF).contains(&tail[0]),
        };
        if !second_ok || tail[1..].iter().any(|b| !(0x80..=0xBF).contains(b)) {
            return Err(Error::NotUtf8);
        }
        i += 1 + trailing;
    }
    Ok(i)
}

/// Validate a whole string field: well-formed and free of NUL.
pub(crate) fn check_string(bytes: &[u8]) -> Result<(), Error> {
    if check_utf8(bytes)? != bytes.len() {
        return Err(Error::NotUtf8);
    }
    Ok(())
}

/// Client identifiers are restricted to ASCII letters and digits.
///
/// # Errors
///
/// [`Error::IllegalCharacter`] on the first other byte.
pub fn check_client_id(client_id: &str) -> Result<(), Error> {
    if client_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Error::IllegalCharacter)
    }
}

/// Validate a topic name used for publishing or (un)subscribing.
///
/// # Errors
///
/// * [`Error::InvalidParameter`] - the topic contains `#` or `+`
/// * [`Error::NotUtf8`] - the topic is not a valid MQTT string
pub fn check_topic(topic: &[u8]) -> Result<(), Error> {
    if topic.iter().any(|&b| b == b'#' || b == b'+') {
        return Err(Error::InvalidParameter);
    }
    check_string(topic)
}
