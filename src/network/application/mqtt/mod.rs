//! MQTT 3.1.1 packet codec and streaming dispatcher for constrained devices.
//!
//! This module encodes every client-to-server control packet into a
//! scatter-gather [`Buffer`], and decodes server-to-client packets from a byte
//! stream, handing each one to an application [`Handler`]. It also carries the
//! OneNET extensions: data points published to `$dp` and platform commands
//! received on `$creq/<id>` and answered on `$crsp/<id>`.
//!
//! # Architecture
//!
//! - **Encoding** writes into a [`Buffer`], a chunked arena of stable
//!   [`Extent`]s plus an ordered list of segments. Large payloads can be linked
//!   by reference with [`Payload::Borrowed`] instead of being copied.
//! - **Receiving** goes through a [`Context`], which owns the connection, the
//!   handler and a fixed-capacity receive buffer. Partial frames survive
//!   between [`Context::receive`] calls; QoS 1 and QoS 2 acknowledgements are
//!   sent automatically.
//! - **Data points** are built incrementally with a [`DataPointPacket`], or in
//!   one call with [`Buffer::pack_data_point_by_string`] and
//!   [`Buffer::pack_data_point_by_binary`].
//!
//! Connection lifecycle, keep-alive timers and retransmission are left to the
//! caller.
//!
//! # Usage
//!
//! ```rust
//! use libiot_dp::network::application::mqtt::{Buffer, ConnectOptions, Payload, QoS};
//!
//! let mut buffer = Buffer::new();
//! buffer.pack_connect(&ConnectOptions {
//!     client_id: "device42",
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     will: None,
//!     user_name: Some("product"),
//!     password: Some(b"secret"),
//! })?;
//! assert_eq!(buffer.to_vec()[0], 0x10);
//!
//! buffer.reset();
//! buffer.pack_publish(1, "sensors/temp", Payload::Copied(b"21.5"), QoS::AtLeastOnce, false)?;
//! // hand `buffer` to `Context::send`
//! # Ok::<(), libiot_dp::network::application::mqtt::Error>(())
//! ```

/// Chunked arena and scatter-gather packet buffer.
pub mod buffer;

/// Remaining-length varint and big-endian field helpers.
pub mod codec;

/// Receive buffer, dispatcher and send path for one connection.
pub mod context;

/// Incremental data-point payload builder.
pub mod datapoint;

/// Error type shared by every operation in this module.
pub mod error;

/// Application callbacks and the inbound packet views.
pub mod handler;

/// Packet types, connect options and the outbound encoders.
pub mod packet;

mod time;

/// UTF-8, client id and topic validation.
pub mod utf8;

pub use buffer::{Buffer, Extent, Payload};
pub use context::Context;
pub use datapoint::{DataPointPacket, DataPointTopic};
pub use error::Error;
pub use handler::{Command, ConnectReturnCode, Handler, Publish, SubAckCode, SubAckCodes};
pub use packet::{
    COMMAND_REQUEST_PREFIX, COMMAND_RESPONSE_PREFIX, ConnectOptions, DataPointType, PacketType,
    QoS, SAVE_DATA_POINT_TOPIC, TIMESTAMP_FLAG, Will,
};
