//! Callbacks invoked by the receiver, and the packet views handed to them.

use super::error::Error;
use super::packet::QoS;

/// Return code carried by CONNACK.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConnectReturnCode {
    /// Connection accepted.
    Accepted = 0,
    /// The broker does not support protocol level 4.
    UnacceptableProtocolVersion = 1,
    /// The client identifier is not allowed.
    IdentifierRejected = 2,
    /// The service is unavailable.
    ServerUnavailable = 3,
    /// Malformed user name or password.
    BadUserNameOrPassword = 4,
    /// The client is not authorized.
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    /// Decode a CONNACK return code; values above 5 are illegal.
    pub fn from_u8(code: u8) -> Option<Self> {
        let code = match code {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUserNameOrPassword,
            5 => Self::NotAuthorized,
            _ => return None,
        };
        Some(code)
    }
}

/// Per-topic result in a SUBACK.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SubAckCode {
    /// Subscription granted with the given maximum QoS.
    Granted(QoS),
    /// Subscription refused.
    Failure,
}

impl SubAckCode {
    /// Decode a SUBACK return code byte.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x80 => Some(Self::Failure),
            _ => QoS::from_bits(code).map(Self::Granted),
        }
    }
}

/// The return codes of a SUBACK, one per requested topic, in request order.
///
/// Every byte has been validated before the handler sees it.
#[derive(Debug, Clone, Copy)]
pub struct SubAckCodes<'p> {
    raw: &'p [u8],
}

impl<'p> SubAckCodes<'p> {
    pub(crate) fn new(raw: &'p [u8]) -> Result<Self, Error> {
        if raw.iter().any(|&code| SubAckCode::from_u8(code).is_none()) {
            return Err(Error::IllegalPacket);
        }
        Ok(Self { raw })
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// `true` when the SUBACK carried no codes.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Code for the topic at `index`.
    pub fn get(&self, index: usize) -> Option<SubAckCode> {
        self.raw.get(index).copied().and_then(SubAckCode::from_u8)
    }

    /// Iterate over the codes.
    pub fn iter(&self) -> impl Iterator<Item = SubAckCode> + 'p {
        self.raw.iter().filter_map(|&code| SubAckCode::from_u8(code))
    }
}

/// An application message received on an ordinary topic.
///
/// Borrowed from the receive buffer; copy out whatever must outlive the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'p> {
    /// Packet identifier, present for QoS 1 and 2.
    pub packet_id: Option<u16>,
    /// Topic name.
    pub topic: &'p str,
    /// Application payload.
    pub payload: &'p [u8],
    /// Delivery QoS.
    pub qos: QoS,
    /// `true` when this is a redelivery.
    pub dup: bool,
}

/// A platform command received on `$creq/<command id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'p> {
    /// Packet identifier, present for QoS 1 and 2.
    pub packet_id: Option<u16>,
    /// Command id taken from the topic; answer on `$crsp/<command id>`.
    pub command_id: &'p str,
    /// Command arguments.
    pub payload: &'p [u8],
    /// Delivery QoS.
    pub qos: QoS,
    /// `true` when this is a redelivery.
    pub dup: bool,
}

/// Application callbacks, one per inbound packet type.
///
/// Each method defaults to [`Error::EmptyCallback`], so an application only
/// implements the packets it expects. Returning an error from
/// [`on_publish`](Self::on_publish), [`on_command`](Self::on_command),
/// [`on_pub_rec`](Self::on_pub_rec) or [`on_pub_rel`](Self::on_pub_rel)
/// suppresses the automatic acknowledgement, and the error is returned from
/// [`Context::receive`](super::Context::receive).
///
/// # Examples
///
/// ```rust
/// use libiot_dp::network::application::mqtt::{Command, Error, Handler, Publish};
///
/// #[derive(Default)]
/// struct Device {
///     last_command: Option<heapless::String<32>>,
/// }
///
/// impl Handler for Device {
///     fn on_publish(&mut self, _publish: &Publish<'_>) -> Result<(), Error> {
///         Ok(())
///     }
///
///     fn on_command(&mut self, command: &Command<'_>) -> Result<(), Error> {
///         let id = heapless::String::try_from(command.command_id)
///             .map_err(|_| Error::InvalidParameter)?;
///         self.last_command = Some(id);
///         Ok(())
///     }
/// }
/// ```
pub trait Handler {
    /// PINGRESP received.
    fn on_ping_resp(&mut self) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// CONNACK received.
    fn on_conn_ack(
        &mut self,
        _session_present: bool,
        _code: ConnectReturnCode,
    ) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBLISH received on an ordinary topic.
    fn on_publish(&mut self, _publish: &Publish<'_>) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBACK received.
    fn on_pub_ack(&mut self, _packet_id: u16) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBREC received. On success a PUBREL is sent.
    fn on_pub_rec(&mut self, _packet_id: u16) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBREL received. On success a PUBCOMP is sent.
    fn on_pub_rel(&mut self, _packet_id: u16) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBCOMP received.
    fn on_pub_comp(&mut self, _packet_id: u16) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// SUBACK received.
    fn on_sub_ack(&mut self, _packet_id: u16, _codes: SubAckCodes<'_>) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// UNSUBACK received.
    fn on_unsub_ack(&mut self, _packet_id: u16) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }

    /// PUBLISH received on `$creq/<command id>`.
    fn on_command(&mut self, _command: &Command<'_>) -> Result<(), Error> {
        Err(Error::EmptyCallback)
    }
}
