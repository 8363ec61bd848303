//! # libiot-dp - MQTT for OneNET devices
//!
//! A Rust SDK that lets an embedded device talk MQTT 3.1.1 to the OneNET
//! platform: encode every client packet, decode whatever the broker sends, and
//! publish data points in the platform's own formats. The library supports
//! `no_std` environments with `alloc`.
//!
//! ## Features
//!
//! ### MQTT Codec
//! - All client-to-server packets, encoded into a scatter-gather buffer
//! - Large payloads linked by reference instead of copied
//! - Strict UTF-8, client id and topic validation
//!
//! ### Streaming Receiver
//! - Frames reassembled across arbitrary read boundaries
//! - One callback per packet type
//! - Automatic PUBACK, PUBREC, PUBREL and PUBCOMP
//!
//! ### OneNET Extensions
//! - Incremental data-point builder with nested objects
//! - Saved data points in all seven platform formats
//! - Command requests on `$creq/<id>` and responses on `$crsp/<id>`
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libiot-dp = "0.1.0"
//! ```
//!
//! ### Publishing a Data Point
//!
//! ```rust,no_run
//! use libiot_dp::network::application::mqtt::{
//!     Buffer, Context, DataPointPacket, DataPointTopic, Handler, QoS,
//! };
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
//! struct Device;
//! impl Handler for Device {}
//!
//! let mut context = Context::new(MockConnection, Device, 2048)?;
//!
//! let mut buffer = Buffer::new();
//! let mut packet =
//!     DataPointPacket::start(&mut buffer, 1, QoS::AtLeastOnce, false, DataPointTopic::Saved)?;
//! packet.append_int("humidity", None, 40)?;
//! packet.append_str("status", None, "ok")?;
//! packet.finish()?;
//!
//! let mut offset = 0;
//! while offset < buffer.len() {
//!     offset += context.send(&buffer, offset)?;
//! }
//! # Ok::<(), libiot_dp::network::application::mqtt::Error>(())
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers with a heap (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support, including the system clock used
//!   for "now" timestamps (default: disabled)
//! - `defmt`: Enable defmt formatting of error types for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libiot/")]

extern crate alloc;

/// Network abstraction layer and protocol implementations.
///
/// Holds the transport traits every protocol is driven through, and the MQTT
/// codec built on them.
pub mod network;
