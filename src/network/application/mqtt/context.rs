//! Per-connection receive state and the inbound packet dispatcher.

use alloc::vec::Vec;
use log::{debug, trace, warn};

use super::buffer::Buffer;
use super::codec::{self, get_u16};
use super::error::Error;
use super::handler::{Command, ConnectReturnCode, Handler, Publish, SubAckCodes};
use super::packet::{
    COMMAND_REQUEST_PREFIX, PUBLISH_DUP, PUBLISH_QOS_MASK, PUBLISH_RETAIN, PacketType, QoS,
    RESERVED_FLAGS,
};
use super::utf8::check_topic;
use crate::network::{Connection, Write};

/// Smallest receive buffer that can hold a fixed header and its length.
pub const MIN_RECEIVE_CAPACITY: usize = 5;

/// A connection, the application handler and the receive buffer.
///
/// [`receive`](Self::receive) reads whatever the transport has, dispatches
/// every complete frame in arrival order and keeps the incomplete tail for the
/// next call. [`send`](Self::send) writes an encoded [`Buffer`].
///
/// # Examples
///
/// ```rust
/// use libiot_dp::network::application::mqtt::{Context, ConnectReturnCode, Error, Handler};
/// # use libiot_dp::network::{Connection, Read, Write};
/// # struct Wire { rx: &'static [u8] }
/// # impl Read for Wire {
/// #     type Error = ();
/// #     fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
/// #         let n = buf.len().min(self.rx.len());
/// #         buf[..n].copy_from_slice(&self.rx[..n]);
/// #         self.rx = &self.rx[n..];
/// #         Ok(n)
/// #     }
/// # }
/// # impl Write for Wire {
/// #     type Error = ();
/// #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
/// #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// # impl Connection for Wire {}
///
/// struct Session {
///     connected: bool,
/// }
///
/// impl Handler for Session {
///     fn on_conn_ack(&mut self, _sp: bool, code: ConnectReturnCode) -> Result<(), Error> {
///         self.connected = code == ConnectReturnCode::Accepted;
///         Ok(())
///     }
/// }
///
/// let wire = Wire { rx: &[0x20, 0x02, 0x00, 0x00] };
/// let mut context = Context::new(wire, Session { connected: false }, 256)?;
/// context.receive()?;
/// assert!(context.handler().connected);
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug)]
pub struct Context<C: Connection, H: Handler> {
    connection: C,
    handler: H,
    buffer: Vec<u8>,
    pos: usize,
}

impl<C: Connection, H: Handler> Context<C, H> {
    /// Create a context with a receive buffer of `capacity` bytes.
    ///
    /// The capacity bounds the largest frame that can be received.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - capacity below [`MIN_RECEIVE_CAPACITY`]
    /// * [`Error::OutOfMemory`] - the buffer could not be allocated
    pub fn new(connection: C, handler: H, capacity: usize) -> Result<Self, Error> {
        if capacity < MIN_RECEIVE_CAPACITY {
            return Err(Error::InvalidParameter);
        }
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        buffer.resize(capacity, 0);
        Ok(Self {
            connection,
            handler,
            buffer,
            pos: 0,
        })
    }

    /// The application handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutable access to the application handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutable access to the underlying connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Bytes received but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.pos
    }

    /// Size of the receive buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the context, returning the connection and the handler.
    pub fn into_parts(self) -> (C, H) {
        (self.connection, self.handler)
    }

    /// Read once from the connection and dispatch every complete frame.
    ///
    /// # Errors
    ///
    /// * [`Error::EndOfFile`] - the read returned zero bytes; buffered bytes are dropped
    /// * [`Error::Io`] - the read failed
    /// * [`Error::BufferOverflow`] - a frame does not fit in the receive buffer
    /// * [`Error::IllegalPacket`] - a frame violates the protocol
    /// * [`Error::FailedSendResponse`] - an automatic acknowledgement could not be sent
    /// * any error returned by the handler
    ///
    /// Frames dispatched before the failing one have been delivered; the
    /// failing frame is consumed.
    pub fn receive(&mut self) -> Result<(), Error> {
        if self.pos == self.buffer.len() {
            return Err(Error::BufferOverflow);
        }

        let read = match self.connection.read(&mut self.buffer[self.pos..]) {
            Ok(0) => {
                self.pos = 0;
                return Err(Error::EndOfFile);
            }
            Ok(n) => n,
            Err(e) => {
                warn!("mqtt: read failed: {:?}", e);
                return Err(Error::Io);
            }
        };
        self.pos = (self.pos + read).min(self.buffer.len());

        let mut consumed = 0;
        let mut result = Ok(());
        while self.pos - consumed >= 2 {
            let pending = &self.buffer[consumed..self.pos];
            let (remaining, width) = match codec::decode_length(&pending[1..]) {
                Ok(Some(length)) => length,
                Ok(None) => break,
                Err(_) => {
                    warn!("mqtt: malformed remaining length");
                    consumed = self.pos;
                    result = Err(Error::IllegalPacket);
                    break;
                }
            };

            let frame_len = 1 + width + remaining;
            if frame_len > self.buffer.len() {
                warn!(
                    "mqtt: frame of {} bytes exceeds receive buffer of {}",
                    frame_len,
                    self.buffer.len()
                );
                consumed = self.pos;
                result = Err(Error::BufferOverflow);
                break;
            }
            if pending.len() < frame_len {
                break;
            }

            let header = pending[0];
            let body = &pending[1 + width..frame_len];
            consumed += frame_len;
            if let Err(e) = dispatch(&mut self.connection, &mut self.handler, header, body) {
                result = Err(e);
                break;
            }
        }

        self.buffer.copy_within(consumed..self.pos, 0);
        self.pos -= consumed;
        result
    }

    /// Write `buffer` to the connection starting at byte `offset`.
    ///
    /// Returns the number of bytes the transport accepted. When that is less
    /// than `buffer.len() - offset`, call again with the offset advanced.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - `offset` is past the end of the buffer
    /// * [`Error::Io`] - the write failed
    pub fn send(&mut self, buffer: &Buffer<'_>, offset: usize) -> Result<usize, Error> {
        if offset > buffer.len() {
            return Err(Error::InvalidParameter);
        }
        let slices = buffer.slices_from(offset);
        if slices.is_empty() {
            return Ok(0);
        }
        self.connection.write_vectored(&slices).map_err(|e| {
            warn!("mqtt: write failed: {:?}", e);
            Error::Io
        })
    }
}

/// Encode an acknowledgement into a throwaway buffer and write all of it.
fn respond<W: Write>(
    connection: &mut W,
    encode: impl FnOnce(&mut Buffer<'_>) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut buffer = Buffer::new();
    encode(&mut buffer)?;
    let expected = buffer.len();
    match connection.write_vectored(&buffer.slices_from(0)) {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => {
            warn!("mqtt: short acknowledgement write, {} of {} bytes", n, expected);
            Err(Error::FailedSendResponse)
        }
        Err(e) => {
            warn!("mqtt: acknowledgement write failed: {:?}", e);
            Err(Error::FailedSendResponse)
        }
    }
}

/// Packet identifier of a two-byte acknowledgement body.
fn ack_id(flags: u8, expected_flags: u8, body: &[u8]) -> Result<u16, Error> {
    if flags != expected_flags || body.len() != 2 {
        return Err(Error::IllegalPacket);
    }
    match get_u16(body, 0) {
        Some(0) | None => Err(Error::IllegalPacket),
        Some(id) => Ok(id),
    }
}

fn dispatch<C: Connection, H: Handler>(
    connection: &mut C,
    handler: &mut H,
    header: u8,
    body: &[u8],
) -> Result<(), Error> {
    let flags = header & 0x0F;
    let Some(kind) = PacketType::from_header(header) else {
        warn!("mqtt: unknown packet type {:#04x}", header);
        return Err(Error::IllegalPacket);
    };
    trace!("mqtt: {:?} with {} byte body", kind, body.len());

    match kind {
        PacketType::PingResp => {
            if flags != 0 || !body.is_empty() {
                return Err(Error::IllegalPacket);
            }
            handler.on_ping_resp()
        }
        PacketType::ConnAck => {
            if flags != 0 || body.len() != 2 || body[0] & 0xFE != 0 {
                return Err(Error::IllegalPacket);
            }
            let session_present = body[0] & 0x01 != 0;
            let code = ConnectReturnCode::from_u8(body[1]).ok_or(Error::IllegalPacket)?;
            if session_present && code != ConnectReturnCode::Accepted {
                return Err(Error::IllegalPacket);
            }
            handler.on_conn_ack(session_present, code)
        }
        PacketType::Publish => dispatch_publish(connection, handler, flags, body),
        PacketType::PubAck => handler.on_pub_ack(ack_id(flags, 0, body)?),
        PacketType::PubRec => {
            let id = ack_id(flags, 0, body)?;
            handler.on_pub_rec(id)?;
            debug!("mqtt: PUBREL {}", id);
            respond(connection, |buffer| buffer.pack_pubrel(id))
        }
        PacketType::PubRel => {
            let id = ack_id(flags, RESERVED_FLAGS, body)?;
            handler.on_pub_rel(id)?;
            debug!("mqtt: PUBCOMP {}", id);
            respond(connection, |buffer| buffer.pack_pubcomp(id))
        }
        PacketType::PubComp => handler.on_pub_comp(ack_id(flags, 0, body)?),
        PacketType::SubAck => {
            if flags != 0 || body.len() < 2 {
                return Err(Error::IllegalPacket);
            }
            let id = match get_u16(body, 0) {
                Some(0) | None => return Err(Error::IllegalPacket),
                Some(id) => id,
            };
            handler.on_sub_ack(id, SubAckCodes::new(&body[2..])?)
        }
        PacketType::UnsubAck => handler.on_unsub_ack(ack_id(flags, 0, body)?),
        PacketType::Connect
        | PacketType::Subscribe
        | PacketType::Unsubscribe
        | PacketType::PingReq
        | PacketType::Disconnect => {
            warn!("mqtt: unexpected {:?} from server", kind);
            Err(Error::IllegalPacket)
        }
    }
}

fn dispatch_publish<C: Connection, H: Handler>(
    connection: &mut C,
    handler: &mut H,
    flags: u8,
    body: &[u8],
) -> Result<(), Error> {
    if body.len() < 2 || flags & PUBLISH_RETAIN != 0 {
        return Err(Error::IllegalPacket);
    }
    let qos = QoS::from_bits((flags & PUBLISH_QOS_MASK) >> 1).ok_or(Error::IllegalPacket)?;
    let dup = flags & PUBLISH_DUP != 0;
    if qos == QoS::AtMostOnce && dup {
        return Err(Error::IllegalPacket);
    }

    let topic_end = 2 + get_u16(body, 0).ok_or(Error::IllegalPacket)? as usize;
    let topic_bytes = body.get(2..topic_end).ok_or(Error::IllegalPacket)?;
    if topic_bytes.is_empty() {
        return Err(Error::IllegalPacket);
    }
    check_topic(topic_bytes).map_err(|_| Error::IllegalPacket)?;
    let topic = core::str::from_utf8(topic_bytes).map_err(|_| Error::IllegalPacket)?;

    let (packet_id, payload_start) = match qos {
        QoS::AtMostOnce => (None, topic_end),
        QoS::AtLeastOnce | QoS::ExactlyOnce => match get_u16(body, topic_end) {
            Some(0) | None => return Err(Error::IllegalPacket),
            Some(id) => (Some(id), topic_end + 2),
        },
    };
    let payload = &body[payload_start..];

    match topic.strip_prefix(COMMAND_REQUEST_PREFIX) {
        Some("") => return Err(Error::IllegalPacket),
        Some(command_id) => handler.on_command(&Command {
            packet_id,
            command_id,
            payload,
            qos,
            dup,
        })?,
        None => handler.on_publish(&Publish {
            packet_id,
            topic,
            payload,
            qos,
            dup,
        })?,
    }

    match (qos, packet_id) {
        (QoS::AtLeastOnce, Some(id)) => {
            debug!("mqtt: PUBACK {}", id);
            respond(connection, |buffer| buffer.pack_puback(id))
        }
        (QoS::ExactlyOnce, Some(id)) => {
            debug!("mqtt: PUBREC {}", id);
            respond(connection, |buffer| buffer.pack_pubrec(id))
        }
        _ => Ok(()),
    }
}
