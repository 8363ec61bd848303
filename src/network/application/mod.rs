//! # Application Layer Protocols
//!
//! Protocol implementations that sit on top of a [`Connection`](crate::network::Connection).
//!
//! ## Available Protocols
//!
//! - **[`mqtt`]**: MQTT 3.1.1 packet codec and dispatcher, with the OneNET
//!   data-point and command extensions
//!
//! ## Design Principles
//!
//! - **Connection Agnostic**: the protocol code only reads and writes bytes
//! - **No-std Compatible**: needs `alloc`, never `std` unless the `std` feature is on
//! - **Caller Driven**: nothing runs in the background; every send and receive is a call
//!
//! ## Usage Pattern
//!
//! 1. Create a connection using your transport layer
//! 2. Encode packets into a buffer and send them through a context
//! 3. Call `receive` whenever the transport is readable
//!
//! ```rust,no_run
//! use libiot_dp::network::application::mqtt::{Buffer, Context, Handler, Payload, QoS};
//! # use libiot_dp::network::Connection;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl libiot_dp::network::Read for MockConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl libiot_dp::network::Write for MockConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! struct Quiet;
//! impl Handler for Quiet {}
//!
//! // 1. Create connection (implementation-specific)
//! let connection = MockConnection;
//!
//! // 2. Encode and send
//! let mut context = Context::new(connection, Quiet, 1024)?;
//! let mut buffer = Buffer::new();
//! buffer.pack_publish(0, "status", Payload::Copied(b"online"), QoS::AtMostOnce, false)?;
//! context.send(&buffer, 0)?;
//!
//! // 3. Receive
//! // context.receive()?;
//! # Ok::<(), libiot_dp::network::application::mqtt::Error>(())
//! ```

/// MQTT 3.1.1 codec and dispatcher.
///
/// Encodes client packets into scatter-gather buffers, decodes server packets
/// from a byte stream and routes them to application callbacks.
pub mod mqtt;
