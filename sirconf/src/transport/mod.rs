//! Byte transport seam under the CLI channel.
//!
//! Session establishment (SSH, telnet, console) happens elsewhere; the
//! driver only needs something that moves bytes in both directions.

#[cfg(test)]
pub(crate) mod scripted;
mod stream;

pub use stream::StreamTransport;

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// A bidirectional byte stream to the device CLI.
pub trait Transport: Send {
    /// Write bytes to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Fails once the peer has closed the stream.
    fn receive(&mut self) -> impl Future<Output = Result<Bytes>> + Send;

    /// Close the stream.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
