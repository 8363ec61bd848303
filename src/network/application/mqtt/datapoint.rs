//! Incremental data-point payload builder.
//!
//! A [`DataPointPacket`] opens a PUBLISH on an empty [`Buffer`] and appends
//! JSON-like fragments to its payload one call at a time, growing the packet's
//! remaining length as it goes. The builder tracks its own state (open or
//! finished, sub-object depth); the buffer only ever holds wire bytes.
//!
//! ```rust
//! use libiot_dp::network::application::mqtt::{Buffer, DataPointPacket, DataPointTopic, QoS};
//!
//! let mut buffer = Buffer::new();
//! let mut packet =
//!     DataPointPacket::start(&mut buffer, 1, QoS::AtLeastOnce, false, DataPointTopic::Saved)?;
//! packet.append_double("temp", None, 36.5)?;
//! packet.start_object("gps", None)?;
//! packet.append_subvalue_int("lat", 31)?;
//! packet.finish_object()?;
//! packet.finish()?;
//!
//! let bytes = buffer.to_vec();
//! assert!(bytes.ends_with(br#"{"temp":{"":36.500000},"gps":{"":{"lat":31}}}"#));
//! # Ok::<(), libiot_dp::network::application::mqtt::Error>(())
//! ```

use core::fmt::Write as _;
use heapless::String;

use super::buffer::{Buffer, Payload};
use super::codec::put_bytes;
use super::error::Error;
use super::packet::{COMMAND_RESPONSE_PREFIX, DATA_POINT_TRIPLE, QoS, SAVE_DATA_POINT_TOPIC};
use super::time::{self, TIME_STRING_LEN};
use super::utf8::check_string;

/// Room for any `f64` printed with six decimals.
const MAX_DOUBLE_LEN: usize = 320;
/// Room for any `i64`.
const MAX_INT_LEN: usize = 20;

/// Where a data-point packet is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPointTopic<'t> {
    /// The saved data-point topic `$dp`.
    Saved,
    /// The response topic of the given command id.
    CommandResponse(&'t str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Open,
    Finished,
}

/// Builder for a data-point PUBLISH.
#[derive(Debug)]
pub struct DataPointPacket<'b, 'a> {
    buffer: &'b mut Buffer<'a>,
    tag: Tag,
    depth: u32,
}

/// Names and string values are embedded between quotes without escaping.
fn check_text(text: &str) -> Result<(), Error> {
    check_string(text.as_bytes())?;
    if text
        .bytes()
        .any(|b| b == b'"' || b == b'\\' || b.is_ascii_control())
    {
        return Err(Error::IllegalCharacter);
    }
    Ok(())
}

/// A missing or non-positive timestamp gives the empty key.
fn time_key(timestamp_ms: Option<i64>) -> Result<String<TIME_STRING_LEN>, Error> {
    match timestamp_ms {
        Some(ts) if ts > 0 => time::format_millis(ts),
        _ => Ok(String::new()),
    }
}

fn format_int(value: i64) -> Result<String<MAX_INT_LEN>, Error> {
    let mut out = String::new();
    write!(out, "{}", value).map_err(|_| Error::Internal)?;
    Ok(out)
}

fn format_double(value: f64) -> Result<String<MAX_DOUBLE_LEN>, Error> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter);
    }
    let mut out = String::new();
    write!(out, "{:.6}", value).map_err(|_| Error::Internal)?;
    Ok(out)
}

impl<'b, 'a> DataPointPacket<'b, 'a> {
    /// Open a data-point PUBLISH on an empty buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when the buffer already holds data, the
    /// command id is empty, or `pkt_id` is zero with QoS above 0.
    pub fn start(
        buffer: &'b mut Buffer<'a>,
        pkt_id: u16,
        qos: QoS,
        retain: bool,
        topic: DataPointTopic<'_>,
    ) -> Result<Self, Error> {
        if !buffer.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let opening = [DATA_POINT_TRIPLE, b'{'];
        match topic {
            DataPointTopic::Saved => {
                buffer.publish_header(pkt_id, &[SAVE_DATA_POINT_TOPIC], 2, qos, retain)?
            }
            DataPointTopic::CommandResponse(cmd_id) => {
                if cmd_id.is_empty() {
                    return Err(Error::InvalidParameter);
                }
                buffer.publish_header(
                    pkt_id,
                    &[COMMAND_RESPONSE_PREFIX, cmd_id],
                    2,
                    qos,
                    retain,
                )?
            }
        }
        buffer.append(Payload::Copied(&opening))?;
        Ok(Self {
            buffer,
            tag: Tag::Open,
            depth: 0,
        })
    }

    /// Current sub-object nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// `true` once [`finish`](Self::finish) has succeeded.
    pub fn is_finished(&self) -> bool {
        self.tag == Tag::Finished
    }

    fn ensure_open(&self) -> Result<(), Error> {
        match self.tag {
            Tag::Open => Ok(()),
            Tag::Finished => Err(Error::InvalidParameter),
        }
    }

    /// Append one fragment built from `parts` and grow the remaining length.
    fn push(&mut self, parts: &[&[u8]]) -> Result<(), Error> {
        let len = parts.iter().map(|part| part.len()).sum();
        let extent = self.buffer.allocate(len)?;
        let out = self.buffer.extent_mut(&extent)?;
        let mut offset = 0;
        for part in parts {
            put_bytes(out, &mut offset, part);
        }
        self.buffer.grow_remaining_length(len)?;
        self.buffer.append_extent(extent)
    }

    fn append_value(
        &mut self,
        dsid: &str,
        timestamp_ms: Option<i64>,
        value: &[u8],
        quoted: bool,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        if dsid.is_empty() {
            return Err(Error::InvalidParameter);
        }
        check_text(dsid)?;
        let key = time_key(timestamp_ms)?;
        let quote: &[u8] = if quoted { b"\"" } else { b"" };

        self.push(&[
            b"\"",
            dsid.as_bytes(),
            b"\":{\"",
            key.as_bytes(),
            b"\":",
            quote,
            value,
            quote,
            b"},",
        ])
    }

    /// Append `"dsid":{"<time>":value},` with an integer value.
    ///
    /// `timestamp_ms` is a Unix timestamp in milliseconds. With `None` or a
    /// non-positive value the time key is empty.
    pub fn append_int(
        &mut self,
        dsid: &str,
        timestamp_ms: Option<i64>,
        value: i64,
    ) -> Result<(), Error> {
        let text = format_int(value)?;
        self.append_value(dsid, timestamp_ms, text.as_bytes(), false)
    }

    /// Append a floating point value printed with six decimals.
    ///
    /// NaN and infinities are rejected with [`Error::InvalidParameter`].
    pub fn append_double(
        &mut self,
        dsid: &str,
        timestamp_ms: Option<i64>,
        value: f64,
    ) -> Result<(), Error> {
        let text = format_double(value)?;
        self.append_value(dsid, timestamp_ms, text.as_bytes(), false)
    }

    /// Append a quoted string value.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalCharacter`] for quotes, backslashes and control
    /// characters, which the payload format cannot carry.
    pub fn append_str(
        &mut self,
        dsid: &str,
        timestamp_ms: Option<i64>,
        value: &str,
    ) -> Result<(), Error> {
        check_text(value)?;
        self.append_value(dsid, timestamp_ms, value.as_bytes(), true)
    }

    /// Append a `null` value.
    pub fn append_null(&mut self, dsid: &str, timestamp_ms: Option<i64>) -> Result<(), Error> {
        self.append_value(dsid, timestamp_ms, b"null", false)
    }

    fn append_subvalue(&mut self, name: &str, value: &[u8], quoted: bool) -> Result<(), Error> {
        self.ensure_open()?;
        if self.depth == 0 {
            return Err(Error::NotInSubobject);
        }
        check_text(name)?;
        let quote: &[u8] = if quoted { b"\"" } else { b"" };
        self.push(&[b"\"", name.as_bytes(), b"\":", quote, value, quote, b","])
    }

    /// Append `"name":value,` inside the current sub-object.
    pub fn append_subvalue_int(&mut self, name: &str, value: i64) -> Result<(), Error> {
        let text = format_int(value)?;
        self.append_subvalue(name, text.as_bytes(), false)
    }

    /// Floating point variant of [`append_subvalue_int`](Self::append_subvalue_int).
    pub fn append_subvalue_double(&mut self, name: &str, value: f64) -> Result<(), Error> {
        let text = format_double(value)?;
        self.append_subvalue(name, text.as_bytes(), false)
    }

    /// String variant of [`append_subvalue_int`](Self::append_subvalue_int).
    pub fn append_subvalue_str(&mut self, name: &str, value: &str) -> Result<(), Error> {
        check_text(value)?;
        self.append_subvalue(name, value.as_bytes(), true)
    }

    /// Open `"name":{`. The name may be empty.
    pub fn start_subobject(&mut self, name: &str) -> Result<(), Error> {
        self.ensure_open()?;
        check_text(name)?;
        self.push(&[b"\"", name.as_bytes(), b"\":{"])?;
        self.depth += 1;
        Ok(())
    }

    /// Close the innermost sub-object.
    ///
    /// # Errors
    ///
    /// [`Error::NotInSubobject`] at depth zero.
    pub fn finish_subobject(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        if self.depth == 0 {
            return Err(Error::NotInSubobject);
        }

        let last = self.buffer.last_byte_mut().ok_or(Error::Internal)?;
        if *last == b'{' {
            self.push(&[b"},"])?;
        } else {
            // Turn the trailing comma into the closing brace.
            *last = b'}';
            self.push(&[b","])?;
        }
        self.depth -= 1;
        Ok(())
    }

    /// Open a data stream object: `"dsid":{"<time>":{`.
    ///
    /// Sub-values appended afterwards land in the innermost object.
    pub fn start_object(&mut self, dsid: &str, timestamp_ms: Option<i64>) -> Result<(), Error> {
        if dsid.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let key = time_key(timestamp_ms)?;
        self.start_subobject(dsid)?;
        self.start_subobject(&key)
    }

    /// Close an object opened with [`start_object`](Self::start_object).
    pub fn finish_object(&mut self) -> Result<(), Error> {
        self.finish_subobject()?;
        self.finish_subobject()
    }

    /// Close the payload.
    ///
    /// # Errors
    ///
    /// * [`Error::IncompleteSubobject`] - a sub-object is still open
    /// * [`Error::InvalidParameter`] - the packet is already finished
    pub fn finish(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        if self.depth > 0 {
            return Err(Error::IncompleteSubobject);
        }

        let last = self.buffer.last_byte_mut().ok_or(Error::Internal)?;
        if *last == b',' {
            *last = b'}';
        } else {
            self.push(&[b"}"])?;
        }
        self.tag = Tag::Finished;
        Ok(())
    }
}
