//! Transport over any async byte stream.

use bytes::{Bytes, BytesMut};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::Transport;
use crate::error::{Result, TransportError};

const READ_CHUNK: usize = 4096;

/// Adapts an established `AsyncRead + AsyncWrite` stream (a TCP socket,
/// an SSH channel stream, a serial port) to [`Transport`].
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    read_buf: BytesMut,
}

impl<S> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!("sending {} bytes", data.len());
        self.stream
            .write_all(data)
            .await
            .map_err(TransportError::Io)?;
        self.stream.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Bytes> {
        self.read_buf.reserve(READ_CHUNK);
        let read = self
            .stream
            .read_buf(&mut self.read_buf)
            .await
            .map_err(TransportError::Io)?;
        if read == 0 {
            return Err(TransportError::Disconnected.into());
        }
        Ok(self.read_buf.split().freeze())
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}
