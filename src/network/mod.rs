//! Transport seam for the protocol layer.
//!
//! The protocol code never opens sockets itself. It is handed a value that can
//! read bytes and write a scatter-gather list of byte slices, and it drives that
//! value from [`Context::receive`](application::mqtt::Context::receive) and
//! [`Context::send`](application::mqtt::Context::send).
//!
//! Both traits are blocking from the caller's point of view: a non-blocking
//! transport reports how many bytes it actually moved and the caller retries with
//! an offset.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application layer protocols built on top of [`Connection`].
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Connection, Read, Write};
}

/// Byte source for a connection.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// Returning `Ok(0)` means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Byte sink for a connection.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write a list of slices in order, returning the number of bytes accepted.
    ///
    /// The default implementation forwards each slice to [`Write::write`] and
    /// stops at the first short write. Transports with a native `writev` should
    /// override it.
    fn write_vectored(&mut self, bufs: &[&[u8]]) -> Result<usize, Self::Error> {
        let mut total = 0;
        for buf in bufs {
            if buf.is_empty() {
                continue;
            }
            let n = self.write(buf)?;
            total += n;
            if n < buf.len() {
                break;
            }
        }
        Ok(total)
    }
}

/// A synchronous connection
pub trait Connection: Read + Write {}
