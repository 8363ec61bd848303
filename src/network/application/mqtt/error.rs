//! Error type shared by the encoders, the data-point builder and the receiver.

use core::fmt;

/// Errors produced by the MQTT layer.
///
/// Every fallible operation in this module returns one of these. After an
/// encoder error the [`Buffer`](super::Buffer) may already hold part of the
/// packet; reset it before reuse.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The arena could not grow.
    OutOfMemory,
    /// The peer closed the stream (a read returned zero bytes).
    EndOfFile,
    /// The transport reported an error.
    Io,
    /// A received frame violates the protocol. The connection should be closed.
    IllegalPacket,
    /// A client identifier, data-point name or string value contains a
    /// forbidden character.
    IllegalCharacter,
    /// A string field is not well-formed UTF-8.
    NotUtf8,
    /// A usage error: zero packet identifier, missing credentials, a builder
    /// call on a buffer that is not an open data-point packet and so on.
    InvalidParameter,
    /// The remaining length does not fit in four varint bytes.
    PacketTooLarge,
    /// The receive buffer filled up before a complete frame arrived.
    BufferOverflow,
    /// The handler does not implement the callback for a received packet type.
    EmptyCallback,
    /// A sub-object operation was attempted at nesting depth zero.
    NotInSubobject,
    /// A data-point packet was finished with sub-objects still open.
    IncompleteSubobject,
    /// An automatic acknowledgement could not be fully written.
    FailedSendResponse,
    /// An internal invariant was violated.
    Internal,
}

impl Error {
    /// Stable numeric code, for logs and foreign interfaces.
    pub const fn code(self) -> i32 {
        match self {
            Error::OutOfMemory => -1,
            Error::EndOfFile => -2,
            Error::Io => -3,
            Error::IllegalPacket => -4,
            Error::IllegalCharacter => -5,
            Error::NotUtf8 => -6,
            Error::InvalidParameter => -7,
            Error::PacketTooLarge => -8,
            Error::BufferOverflow => -9,
            Error::EmptyCallback => -10,
            Error::Internal => -11,
            Error::NotInSubobject => -12,
            Error::IncompleteSubobject => -13,
            Error::FailedSendResponse => -14,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Error::OutOfMemory => "out of memory",
            Error::EndOfFile => "end of stream",
            Error::Io => "transport error",
            Error::IllegalPacket => "illegal packet",
            Error::IllegalCharacter => "illegal character",
            Error::NotUtf8 => "string is not valid UTF-8",
            Error::InvalidParameter => "invalid parameter",
            Error::PacketTooLarge => "packet too large",
            Error::BufferOverflow => "receive buffer overflow",
            Error::EmptyCallback => "no handler for packet",
            Error::NotInSubobject => "not inside a sub-object",
            Error::IncompleteSubobject => "sub-object left open",
            Error::FailedSendResponse => "failed to send acknowledgement",
            Error::Internal => "internal error",
        };
        f.write_str(s)
    }
}

impl core::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::OutOfMemory => defmt::write!(f, "OutOfMemory"),
            Error::EndOfFile => defmt::write!(f, "EndOfFile"),
            Error::Io => defmt::write!(f, "Io"),
            Error::IllegalPacket => defmt::write!(f, "IllegalPacket"),
            Error::IllegalCharacter => defmt::write!(f, "IllegalCharacter"),
            Error::NotUtf8 => defmt::write!(f, "NotUtf8"),
            Error::InvalidParameter => defmt::write!(f, "InvalidParameter"),
            Error::PacketTooLarge => defmt::write!(f, "PacketTooLarge"),
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::EmptyCallback => defmt::write!(f, "EmptyCallback"),
            Error::NotInSubobject => defmt::write!(f, "NotInSubobject"),
            Error::IncompleteSubobject => defmt::write!(f, "IncompleteSubobject"),
            Error::FailedSendResponse => defmt::write!(f, "FailedSendResponse"),
            Error::Internal => defmt::write!(f, "Internal"),
        }
    }
}
