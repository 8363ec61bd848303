//! Packet types and the encoders that write them into a [`Buffer`].
//!
//! Every encoder validates its input first, then carves a fixed-header extent
//! and a variable-header extent from the arena and links them, followed by the
//! payload. The fixed header always reserves the worst-case five bytes so the
//! remaining length of the head packet can be patched when it grows (see
//! [`Buffer::append_subscribe_topic`] and the data-point builder).

use log::trace;
use serde::Serialize;

use super::buffer::{Buffer, Extent, Payload};
use super::codec::{
    self, MAX_LENGTH_WIDTH, MAX_REMAINING_LENGTH, put_bytes, put_string, put_u16, put_u32,
    string_field_len,
};
use super::error::Error;
use super::time;
use super::utf8::{check_client_id, check_string, check_topic};

/// Protocol name carried in CONNECT.
const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
const PROTOCOL_LEVEL: u8 = 4;
/// Length of the CONNECT variable header.
const CONNECT_VARIABLE_HEADER_LEN: usize = 10;

const FIXED_HEADER_CAPACITY: usize = 1 + MAX_LENGTH_WIDTH;

const CONNECT_CLEAN_SESSION: u8 = 0x02;
const CONNECT_WILL_FLAG: u8 = 0x04;
const CONNECT_WILL_RETAIN: u8 = 0x20;
const CONNECT_PASSWORD: u8 = 0x40;
const CONNECT_USER_NAME: u8 = 0x80;

pub(crate) const PUBLISH_RETAIN: u8 = 0x01;
pub(crate) const PUBLISH_DUP: u8 = 0x08;
pub(crate) const PUBLISH_QOS_MASK: u8 = 0x06;

/// Flags nibble mandated for PUBREL, SUBSCRIBE and UNSUBSCRIBE.
pub(crate) const RESERVED_FLAGS: u8 = 0x02;

/// Topic that saved data points are published to.
pub const SAVE_DATA_POINT_TOPIC: &str = "$dp";
/// Prefix of the topic a command response is published to.
pub const COMMAND_RESPONSE_PREFIX: &str = "$crsp/";
/// Prefix of the topic the platform sends command requests on.
pub const COMMAND_REQUEST_PREFIX: &str = "$creq/";

/// Type byte opening a builder-made data-point payload.
pub(crate) const DATA_POINT_TRIPLE: u8 = 0x02;
/// Set on a saved data-point type byte when a six-byte timestamp follows.
pub const TIMESTAMP_FLAG: u8 = 0x80;

/// Control packet types, as carried in the high nibble of the fixed header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketType {
    /// Client request to connect.
    Connect = 1,
    /// Connect acknowledgement.
    ConnAck = 2,
    /// Publish message.
    Publish = 3,
    /// QoS 1 publish acknowledgement.
    PubAck = 4,
    /// QoS 2 publish received.
    PubRec = 5,
    /// QoS 2 publish release.
    PubRel = 6,
    /// QoS 2 publish complete.
    PubComp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgement.
    SubAck = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgement.
    UnsubAck = 11,
    /// Ping request.
    PingReq = 12,
    /// Ping response.
    PingResp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl PacketType {
    /// Decode the packet type from a fixed header byte.
    pub fn from_header(header: u8) -> Option<Self> {
        let kind = match header >> 4 {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            _ => return None,
        };
        Some(kind)
    }

    /// Fixed header byte for this type with the given flags nibble.
    pub const fn header(self, flags: u8) -> u8 {
        ((self as u8) << 4) | (flags & 0x0F)
    }
}

/// Quality of Service levels for MQTT messages.
///
/// QoS defines the guarantee of delivery for a specific message. Higher QoS levels
/// provide stronger delivery guarantees but require more round trips; the
/// receiver in this crate answers QoS 1 and QoS 2 publishes automatically.
///
/// # Examples
///
/// ```rust
/// use libiot_dp::network::application::mqtt::QoS;
///
/// assert_eq!(QoS::AtMostOnce as u8, 0);
/// assert_eq!(QoS::AtLeastOnce as u8, 1);
/// assert_eq!(QoS::ExactlyOnce as u8, 2);
/// assert_eq!(QoS::from_bits(2), Some(QoS::ExactlyOnce));
/// assert_eq!(QoS::from_bits(3), None);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// **QoS 0**: At most once delivery.
    ///
    /// Messages are delivered according to the best effort of the underlying network.
    /// No packet identifier is carried.
    AtMostOnce = 0,

    /// **QoS 1**: At least once delivery.
    ///
    /// The receiver answers with PUBACK. Duplicates can occur.
    AtLeastOnce = 1,

    /// **QoS 2**: Exactly once delivery.
    ///
    /// Two-phase handshake: PUBREC, PUBREL, PUBCOMP.
    ExactlyOnce = 2,
}

impl QoS {
    /// Decode a two-bit QoS value. `3` is reserved and yields `None`.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::AtMostOnce),
            1 => Some(Self::AtLeastOnce),
            2 => Some(Self::ExactlyOnce),
            _ => None,
        }
    }
}

/// Last-will message registered with CONNECT.
#[derive(Debug, Clone, Copy)]
pub struct Will<'w> {
    /// Topic the broker publishes the will to. Must not be empty.
    pub topic: &'w str,
    /// Will payload, may be empty. Must be valid UTF-8 without NUL.
    pub message: &'w [u8],
    /// QoS the will is published with.
    pub qos: QoS,
    /// Whether the broker retains the will.
    pub retain: bool,
}

/// Parameters of a CONNECT packet.
///
/// The platform requires credentials, so both `user_name` and `password` must
/// be present.
///
/// # Examples
///
/// ```rust
/// use libiot_dp::network::application::mqtt::{Buffer, ConnectOptions};
///
/// let options = ConnectOptions {
///     client_id: "device42",
///     keep_alive_seconds: 120,
///     clean_session: true,
///     will: None,
///     user_name: Some("product01"),
///     password: Some(b"secret"),
/// };
///
/// let mut buffer = Buffer::new();
/// buffer.pack_connect(&options).unwrap();
/// assert_eq!(buffer.to_vec()[0], 0x10);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectOptions<'c> {
    /// Client identifier, ASCII letters and digits only.
    pub client_id: &'c str,
    /// Keep-alive interval in seconds, `0` disables it.
    pub keep_alive_seconds: u16,
    /// Ask the broker to discard any previous session.
    pub clean_session: bool,
    /// Optional last-will message.
    pub will: Option<Will<'c>>,
    /// User name (required).
    pub user_name: Option<&'c str>,
    /// Password (required).
    pub password: Option<&'c [u8]>,
}

/// Formats accepted on the saved data-point topic.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DataPointType {
    /// Full JSON document.
    FullJson = 1,
    /// Binary blob described by a JSON header; see [`Buffer::pack_data_point_by_binary`].
    Binary = 2,
    /// `{"dsid":value,...}`
    SimpleJsonWithoutTime = 3,
    /// `{"dsid":{"time":value},...}`
    SimpleJsonWithTime = 4,
    /// Comma separated text.
    String = 5,
    /// Comma separated text with a wire timestamp.
    StringWithTime = 6,
    /// Packed floating point values with an optional wire timestamp.
    Float = 7,
}

impl DataPointType {
    fn accepts_timestamp(self) -> bool {
        matches!(self, Self::StringWithTime | Self::Float)
    }

    fn has_length(self) -> bool {
        !matches!(self, Self::Float)
    }

    fn is_text(self) -> bool {
        !matches!(self, Self::Float | Self::Binary)
    }
}

#[derive(Serialize)]
struct BinaryDescriptor<'d> {
    ds_id: &'d str,
    at: &'d str,
    #[serde(skip_serializing_if = "Option::is_none")]
    desc: Option<&'d str>,
}

impl<'a> Buffer<'a> {
    /// Carve a fixed header extent holding `header` and `remaining`.
    ///
    /// The extent reserves five bytes and shows only the bytes in use.
    fn fixed_header(&mut self, header: u8, remaining: usize) -> Result<Extent, Error> {
        let mut extent = self.allocate(FIXED_HEADER_CAPACITY)?;
        let bytes = self.extent_mut(&extent)?;
        bytes[0] = header;
        let width = codec::encode_length(remaining, &mut bytes[1..])?;
        extent.truncate(1 + width);
        Ok(extent)
    }

    /// Grow the remaining length of the head packet by `delta` bytes.
    pub(crate) fn grow_remaining_length(&mut self, delta: usize) -> Result<(), Error> {
        let head = self.head_extent().ok_or(Error::InvalidParameter)?;
        let current = match codec::decode_length(&self.extent_mut(&head)?[1..])? {
            Some((value, _)) => value,
            None => return Err(Error::Internal),
        };
        let updated = current
            .checked_add(delta)
            .filter(|&value| value <= MAX_REMAINING_LENGTH)
            .ok_or(Error::PacketTooLarge)?;

        self.resize_head(FIXED_HEADER_CAPACITY)?;
        let head = self.head_extent().ok_or(Error::Internal)?;
        let width = codec::encode_length(updated, &mut self.extent_mut(&head)?[1..])?;
        self.resize_head(1 + width)
    }

    /// The buffer must hold exactly one packet, starting with `header`.
    fn expect_head(&self, header: u8) -> Result<(), Error> {
        if self.head_byte() != Some(header) || self.head_extent().is_none() {
            return Err(Error::InvalidParameter);
        }
        let head = self.slices().next().ok_or(Error::InvalidParameter)?;
        match codec::decode_length(head.get(1..).unwrap_or_default()) {
            Ok(Some((remaining, width))) if 1 + width + remaining == self.len() => Ok(()),
            _ => Err(Error::InvalidParameter),
        }
    }

    /// Link the fixed and variable header of a PUBLISH whose payload of
    /// `payload_len` bytes the caller appends next.
    pub(crate) fn publish_header(
        &mut self,
        pkt_id: u16,
        topic: &[&str],
        payload_len: usize,
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        let mut topic_len = 0;
        for part in topic {
            check_topic(part.as_bytes())?;
            topic_len += part.len();
        }
        if topic_len == 0 || topic_len > u16::MAX as usize {
            return Err(Error::InvalidParameter);
        }
        if qos != QoS::AtMostOnce && pkt_id == 0 {
            return Err(Error::InvalidParameter);
        }

        let id_len = if qos == QoS::AtMostOnce { 0 } else { 2 };
        let variable_len = 2 + topic_len + id_len;
        let remaining = variable_len
            .checked_add(payload_len)
            .ok_or(Error::PacketTooLarge)?;

        let mut flags = (qos as u8) << 1;
        if retain {
            flags |= PUBLISH_RETAIN;
        }
        let fixed = self.fixed_header(PacketType::Publish.header(flags), remaining)?;

        let variable = self.allocate(variable_len)?;
        let out = self.extent_mut(&variable)?;
        let mut offset = 0;
        put_u16(out, &mut offset, topic_len as u16);
        for part in topic {
            put_bytes(out, &mut offset, part.as_bytes());
        }
        if qos != QoS::AtMostOnce {
            put_u16(out, &mut offset, pkt_id);
        }

        self.append_extent(fixed)?;
        self.append_extent(variable)
    }

    /// Encode a CONNECT packet.
    ///
    /// # Errors
    ///
    /// * [`Error::IllegalCharacter`] - the client id is not alphanumeric
    /// * [`Error::InvalidParameter`] - missing user name or password, empty
    ///   will topic, or a field longer than 65535 bytes
    /// * [`Error::NotUtf8`] - user name, will topic or will message is not a valid string
    pub fn pack_connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Error> {
        check_client_id(options.client_id)?;
        let (Some(user_name), Some(password)) = (options.user_name, options.password) else {
            return Err(Error::InvalidParameter);
        };
        check_string(user_name.as_bytes())?;

        let mut flags = CONNECT_USER_NAME | CONNECT_PASSWORD;
        if options.clean_session {
            flags |= CONNECT_CLEAN_SESSION;
        }

        let mut payload_len = string_field_len(options.client_id.as_bytes())?
            + string_field_len(user_name.as_bytes())?
            + string_field_len(password)?;

        if let Some(will) = &options.will {
            if will.topic.is_empty() {
                return Err(Error::InvalidParameter);
            }
            check_topic(will.topic.as_bytes())?;
            check_string(will.message)?;
            flags |= CONNECT_WILL_FLAG | ((will.qos as u8) << 3);
            if will.retain {
                flags |= CONNECT_WILL_RETAIN;
            }
            payload_len +=
                string_field_len(will.topic.as_bytes())? + string_field_len(will.message)?;
        }

        let remaining = CONNECT_VARIABLE_HEADER_LEN + payload_len;
        let fixed = self.fixed_header(PacketType::Connect.header(0), remaining)?;

        let body = self.allocate(remaining)?;
        let out = self.extent_mut(&body)?;
        let mut offset = 0;
        put_string(out, &mut offset, PROTOCOL_NAME);
        put_bytes(out, &mut offset, &[PROTOCOL_LEVEL, flags]);
        put_u16(out, &mut offset, options.keep_alive_seconds);
        put_string(out, &mut offset, options.client_id.as_bytes());
        if let Some(will) = &options.will {
            put_string(out, &mut offset, will.topic.as_bytes());
            put_string(out, &mut offset, will.message);
        }
        put_string(out, &mut offset, user_name.as_bytes());
        put_string(out, &mut offset, password);

        trace!("mqtt: CONNECT {} bytes", 1 + remaining);
        self.append_extent(fixed)?;
        self.append_extent(body)
    }

    /// Encode a PUBLISH packet.
    ///
    /// `pkt_id` is only written for QoS 1 and 2, where it must be non-zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use libiot_dp::network::application::mqtt::{Buffer, Payload, QoS};
    ///
    /// let mut buffer = Buffer::new();
    /// buffer
    ///     .pack_publish(7, "t", Payload::Copied(b"hi"), QoS::AtLeastOnce, false)
    ///     .unwrap();
    /// assert_eq!(buffer.to_vec(), [0x32, 7, 0, 1, b't', 0, 7, b'h', b'i']);
    /// ```
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - empty topic, wildcard in topic, or zero
    ///   packet id with QoS above 0
    /// * [`Error::NotUtf8`] - topic contains NUL
    pub fn pack_publish(
        &mut self,
        pkt_id: u16,
        topic: &str,
        payload: Payload<'_, 'a>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        self.publish_header(pkt_id, &[topic], payload.len(), qos, retain)?;
        self.append(payload)
    }

    /// Set the DUP flag on the PUBLISH at the head of the buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if the head packet is not a QoS 1 or QoS 2
    /// PUBLISH.
    pub fn set_dup(&mut self) -> Result<(), Error> {
        let head = self.head_extent().ok_or(Error::InvalidParameter)?;
        let byte = self
            .extent_mut(&head)?
            .first_mut()
            .ok_or(Error::InvalidParameter)?;
        if PacketType::from_header(*byte) != Some(PacketType::Publish)
            || *byte & PUBLISH_QOS_MASK == 0
        {
            return Err(Error::InvalidParameter);
        }
        *byte |= PUBLISH_DUP;
        Ok(())
    }

    fn pack_ack(&mut self, header: u8, pkt_id: u16) -> Result<(), Error> {
        if pkt_id == 0 {
            return Err(Error::InvalidParameter);
        }
        let extent = self.allocate(4)?;
        let out = self.extent_mut(&extent)?;
        let mut offset = 0;
        put_bytes(out, &mut offset, &[header, 2]);
        put_u16(out, &mut offset, pkt_id);
        self.append_extent(extent)
    }

    /// Encode a PUBACK for a QoS 1 PUBLISH.
    pub fn pack_puback(&mut self, pkt_id: u16) -> Result<(), Error> {
        self.pack_ack(PacketType::PubAck.header(0), pkt_id)
    }

    /// Encode a PUBREC for a QoS 2 PUBLISH.
    pub fn pack_pubrec(&mut self, pkt_id: u16) -> Result<(), Error> {
        self.pack_ack(PacketType::PubRec.header(0), pkt_id)
    }

    /// Encode a PUBREL answering a PUBREC.
    pub fn pack_pubrel(&mut self, pkt_id: u16) -> Result<(), Error> {
        self.pack_ack(PacketType::PubRel.header(RESERVED_FLAGS), pkt_id)
    }

    /// Encode a PUBCOMP answering a PUBREL.
    pub fn pack_pubcomp(&mut self, pkt_id: u16) -> Result<(), Error> {
        self.pack_ack(PacketType::PubComp.header(0), pkt_id)
    }

    /// Encode a SUBSCRIBE with an initial list of topics.
    ///
    /// More topics can be added with [`append_subscribe_topic`](Self::append_subscribe_topic)
    /// while this packet is the only one in the buffer.
    pub fn pack_subscribe(&mut self, pkt_id: u16, topics: &[(&str, QoS)]) -> Result<(), Error> {
        if pkt_id == 0 {
            return Err(Error::InvalidParameter);
        }
        let mut remaining = 2;
        for (topic, _) in topics {
            check_topic(topic.as_bytes())?;
            remaining += string_field_len(topic.as_bytes())? + 1;
        }

        let fixed = self.fixed_header(PacketType::Subscribe.header(RESERVED_FLAGS), remaining)?;
        let body = self.allocate(remaining)?;
        let out = self.extent_mut(&body)?;
        let mut offset = 0;
        put_u16(out, &mut offset, pkt_id);
        for (topic, qos) in topics {
            put_string(out, &mut offset, topic.as_bytes());
            put_bytes(out, &mut offset, &[*qos as u8]);
        }

        self.append_extent(fixed)?;
        self.append_extent(body)
    }

    /// Add one topic to the SUBSCRIBE at the head of the buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if the buffer holds anything but one SUBSCRIBE.
    pub fn append_subscribe_topic(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        self.expect_head(PacketType::Subscribe.header(RESERVED_FLAGS))?;
        check_topic(topic.as_bytes())?;
        let len = string_field_len(topic.as_bytes())? + 1;

        let extent = self.allocate(len)?;
        let out = self.extent_mut(&extent)?;
        let mut offset = 0;
        put_string(out, &mut offset, topic.as_bytes());
        put_bytes(out, &mut offset, &[qos as u8]);

        self.grow_remaining_length(len)?;
        self.append_extent(extent)
    }

    /// Encode an UNSUBSCRIBE with an initial list of topics.
    pub fn pack_unsubscribe(&mut self, pkt_id: u16, topics: &[&str]) -> Result<(), Error> {
        if pkt_id == 0 {
            return Err(Error::InvalidParameter);
        }
        let mut remaining = 2;
        for topic in topics {
            check_topic(topic.as_bytes())?;
            remaining += string_field_len(topic.as_bytes())?;
        }

        let fixed =
            self.fixed_header(PacketType::Unsubscribe.header(RESERVED_FLAGS), remaining)?;
        let body = self.allocate(remaining)?;
        let out = self.extent_mut(&body)?;
        let mut offset = 0;
        put_u16(out, &mut offset, pkt_id);
        for topic in topics {
            put_string(out, &mut offset, topic.as_bytes());
        }

        self.append_extent(fixed)?;
        self.append_extent(body)
    }

    /// Add one topic to the UNSUBSCRIBE at the head of the buffer.
    pub fn append_unsubscribe_topic(&mut self, topic: &str) -> Result<(), Error> {
        self.expect_head(PacketType::Unsubscribe.header(RESERVED_FLAGS))?;
        check_topic(topic.as_bytes())?;
        let len = string_field_len(topic.as_bytes())?;

        let extent = self.allocate(len)?;
        let mut offset = 0;
        put_string(self.extent_mut(&extent)?, &mut offset, topic.as_bytes());

        self.grow_remaining_length(len)?;
        self.append_extent(extent)
    }

    fn pack_empty(&mut self, kind: PacketType) -> Result<(), Error> {
        let extent = self.allocate(2)?;
        self.extent_mut(&extent)?
            .copy_from_slice(&[kind.header(0), 0]);
        self.append_extent(extent)
    }

    /// Encode a PINGREQ.
    pub fn pack_ping_req(&mut self) -> Result<(), Error> {
        self.pack_empty(PacketType::PingReq)
    }

    /// Encode a DISCONNECT.
    pub fn pack_disconnect(&mut self) -> Result<(), Error> {
        self.pack_empty(PacketType::Disconnect)
    }

    /// Encode the response to a platform command.
    ///
    /// The topic is `$crsp/` followed by `cmd_id`. Responses go out at QoS 1
    /// when asked for, anything else is sent at QoS 0.
    pub fn pack_cmd_response(
        &mut self,
        pkt_id: u16,
        cmd_id: &str,
        payload: Payload<'_, 'a>,
        qos: QoS,
    ) -> Result<(), Error> {
        if cmd_id.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let qos = match qos {
            QoS::AtLeastOnce => QoS::AtLeastOnce,
            _ => QoS::AtMostOnce,
        };
        self.publish_header(
            pkt_id,
            &[COMMAND_RESPONSE_PREFIX, cmd_id],
            payload.len(),
            qos,
            false,
        )?;
        self.append(payload)
    }

    /// Encode a saved data point carried as text or packed floats.
    ///
    /// The payload is the type byte, the optional six-byte UTC timestamp, a
    /// 16-bit length (every type except [`DataPointType::Float`]) and `data`.
    /// A timestamp is accepted for [`DataPointType::StringWithTime`] and
    /// [`DataPointType::Float`] only; a non-positive one means "now" and needs
    /// the `std` feature.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidParameter`] - [`DataPointType::Binary`] (use
    ///   [`pack_data_point_by_binary`](Self::pack_data_point_by_binary)), a
    ///   timestamp on a type without one, or `data` longer than 65535 bytes
    /// * [`Error::NotUtf8`] - text data is not a valid string
    pub fn pack_data_point_by_string(
        &mut self,
        pkt_id: u16,
        kind: DataPointType,
        timestamp_ms: Option<i64>,
        data: Payload<'_, 'a>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        if kind == DataPointType::Binary {
            return Err(Error::InvalidParameter);
        }
        if timestamp_ms.is_some() && !kind.accepts_timestamp() {
            return Err(Error::InvalidParameter);
        }
        if kind.is_text() {
            check_string(data.bytes())?;
        }

        let mut header = [0u8; 9];
        let mut offset = 0;
        match timestamp_ms {
            Some(ts) => {
                let stamp = time::wire_bytes(time::resolve(ts)?)?;
                put_bytes(&mut header, &mut offset, &[kind as u8 | TIMESTAMP_FLAG]);
                put_bytes(&mut header, &mut offset, &stamp);
            }
            None => put_bytes(&mut header, &mut offset, &[kind as u8]),
        }
        if kind.has_length() {
            let len = u16::try_from(data.len()).map_err(|_| Error::InvalidParameter)?;
            put_u16(&mut header, &mut offset, len);
        }

        self.publish_header(
            pkt_id,
            &[SAVE_DATA_POINT_TOPIC],
            offset + data.len(),
            qos,
            retain,
        )?;
        self.append(Payload::Copied(&header[..offset]))?;
        self.append(data)
    }

    /// Encode a saved binary data point.
    ///
    /// The payload is `0x02`, a 16-bit length, a JSON descriptor
    /// `{"ds_id":..,"at":"YYYY-MM-DD HH:MM:SS","desc":..}`, a 32-bit length and
    /// the binary bytes. A non-positive timestamp means "now" and needs the
    /// `std` feature.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use libiot_dp::network::application::mqtt::{Buffer, Payload, QoS};
    ///
    /// let image = [0xFFu8, 0xD8, 0xFF];
    /// let mut buffer = Buffer::new();
    /// buffer
    ///     .pack_data_point_by_binary(
    ///         3,
    ///         "camera",
    ///         Some("snapshot"),
    ///         1_614_834_367_000,
    ///         Payload::Borrowed(&image),
    ///         QoS::AtLeastOnce,
    ///         false,
    ///     )
    ///     .unwrap();
    /// assert!(buffer.to_vec().ends_with(&[0, 0, 0, 3, 0xFF, 0xD8, 0xFF]));
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn pack_data_point_by_binary(
        &mut self,
        pkt_id: u16,
        dsid: &str,
        desc: Option<&str>,
        timestamp_ms: i64,
        data: Payload<'_, 'a>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        if dsid.is_empty() {
            return Err(Error::InvalidParameter);
        }
        check_string(dsid.as_bytes())?;
        if let Some(desc) = desc {
            check_string(desc.as_bytes())?;
        }
        let data_len = u32::try_from(data.len()).map_err(|_| Error::InvalidParameter)?;
        let at = time::format_seconds(time::resolve(timestamp_ms)?)?;

        let descriptor = BinaryDescriptor {
            ds_id: dsid,
            at: at.as_str(),
            desc,
        };
        // Worst case every character is escaped as \u00XX.
        let bound = 32 + at.len() + 6 * (dsid.len() + desc.map_or(0, str::len));

        let mut extent = self.allocate(3 + bound + 4)?;
        let out = self.extent_mut(&extent)?;
        let json_len = serde_json_core::to_slice(&descriptor, &mut out[3..3 + bound])
            .map_err(|_| Error::Internal)?;
        let json_len16 = u16::try_from(json_len).map_err(|_| Error::InvalidParameter)?;
        let mut offset = 0;
        put_bytes(out, &mut offset, &[DataPointType::Binary as u8]);
        put_u16(out, &mut offset, json_len16);
        offset += json_len;
        put_u32(out, &mut offset, data_len);
        extent.truncate(offset);

        self.publish_header(
            pkt_id,
            &[SAVE_DATA_POINT_TOPIC],
            offset + data.len(),
            qos,
            retain,
        )?;
        self.append_extent(extent)?;
        self.append(data)
    }
}
