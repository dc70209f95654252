//! Interactive CLI channel on top of a byte transport.

use std::borrow::Cow;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::PatternSet;
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Configuration for channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Timeout for a single read-until-prompt operation.
    pub timeout: Duration,

    /// Search depth for prompt matching.
    pub search_depth: usize,

    /// Line terminator appended to commands.
    pub newline: String,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            newline: "\n".to_string(),
        }
    }
}

/// Result of a read operation.
#[derive(Debug)]
pub struct ReadResult {
    /// Everything read, up to and including the match.
    pub data: Vec<u8>,

    /// Index of the target pattern that matched.
    pub matched: usize,

    /// Offset in `data` where the match starts.
    pub match_start: usize,
}

impl ReadResult {
    /// Output before the match (lossy UTF-8).
    pub fn output(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data[..self.match_start])
    }

    /// The matched text (lossy UTF-8).
    pub fn matched_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data[self.match_start..])
    }

    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Channel for an interactive device CLI session.
///
/// Wraps a [`Transport`] and provides pattern-based reads with timeout
/// handling and error-marker detection.
pub struct PtyChannel<T> {
    config: PtyConfig,
    buffer: PatternBuffer,
    transport: T,

    /// Set when an error marker was seen before the prompt arrived; the
    /// next exchange must first drain up to the prompt.
    needs_resync: bool,
}

impl<T: Transport> PtyChannel<T> {
    pub fn new(transport: T, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            config,
            transport,
            needs_resync: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn config(&self) -> &PtyConfig {
        &self.config
    }

    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Send a line, discarding any unread output first.
    pub async fn send(&mut self, input: &str, newline: bool) -> Result<()> {
        self.buffer.clear();
        let mut data = input.to_string();
        if newline {
            data.push_str(&self.config.newline);
        }
        self.transport.send(data.as_bytes()).await
    }

    /// Read until one of `targets` matches at the end of the output.
    ///
    /// `errors` are checked before the targets on every chunk; a hit fails
    /// the read with [`ChannelError::ErrorMarker`] carrying the output.
    pub async fn read_until(
        &mut self,
        targets: &[&Regex],
        errors: Option<&PatternSet>,
    ) -> Result<ReadResult> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            if let Some(errors) = errors {
                if self.buffer.find_unscanned(errors).is_some() {
                    return Err(self.error_marker(targets));
                }
            }

            for (index, target) in targets.iter().enumerate() {
                if let Some(range) = self.buffer.find_in_tail(*target) {
                    let data = self.buffer.take();
                    trace!("matched target {} at offset {}", index, range.start);
                    return Ok(ReadResult {
                        data,
                        matched: index,
                        match_start: range.start,
                    });
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let chunk = match tokio::time::timeout(remaining, self.transport.receive()).await {
                Ok(chunk) => chunk?,
                Err(_) => {
                    debug!(
                        "no prompt after {:?}, device is showing {:?}",
                        self.config.timeout,
                        String::from_utf8_lossy(self.buffer.last_line())
                    );
                    self.needs_resync = true;
                    return Err(ChannelError::PatternTimeout(self.config.timeout).into());
                }
            };
            trace!("received {} bytes", chunk.len());
            self.buffer.extend(&chunk);
        }
    }

    /// Build the error for a detected marker, trimming a trailing prompt.
    fn error_marker(&mut self, targets: &[&Regex]) -> crate::error::Error {
        let prompt_at = targets
            .iter()
            .find_map(|target| self.buffer.find_in_tail(*target));
        self.needs_resync = prompt_at.is_none();

        let data = self.buffer.take();
        let end = prompt_at.map_or(data.len(), |range| range.start);
        let output = String::from_utf8_lossy(&data[..end]).trim().to_string();
        debug!("device reported an error: {:?}", output);
        ChannelError::ErrorMarker { output }.into()
    }

    /// Discard output up to the next prompt.
    pub async fn drain(&mut self, prompt: &Regex) -> Result<()> {
        debug!("draining output up to the next prompt");
        let result = self.read_until(&[prompt], None).await;
        self.needs_resync = false;
        result.map(|_| ())
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::scripted::ScriptedTransport;

    fn prompt() -> Regex {
        Regex::new(r"[\r\n]?[\w+\-.:/\[\]]+(?:\(config\))?[>#] $").unwrap()
    }

    fn errors() -> PatternSet {
        PatternSet::compile([r"<ERROR> "]).unwrap()
    }

    #[tokio::test]
    async fn test_read_until_prompt() {
        let transport = ScriptedTransport::new("")
            .chunks("show clock", &["show clock\r\n", "Mon Jan 1\r\n", "router# "]);
        let mut channel = PtyChannel::new(transport, PtyConfig::default());
        let prompt = prompt();

        channel.send("show clock", true).await.unwrap();
        let result = channel.read_until(&[&prompt], Some(&errors())).await.unwrap();
        assert_eq!(result.matched, 0);
        assert_eq!(result.output(), "show clock\r\nMon Jan 1\r");
        assert_eq!(result.matched_text(), "\nrouter# ");
    }

    #[tokio::test]
    async fn test_error_marker_with_prompt() {
        let transport = ScriptedTransport::new("").reply(
            "lan 0 ip addres",
            "<ERROR> invalid parameter",
            "router(config)# ",
        );
        let mut channel = PtyChannel::new(transport, PtyConfig::default());
        let prompt = prompt();

        channel.send("lan 0 ip addres", true).await.unwrap();
        let err = channel
            .read_until(&[&prompt], Some(&errors()))
            .await
            .unwrap_err();
        match err {
            Error::Channel(ChannelError::ErrorMarker { output }) => {
                assert_eq!(output, "lan 0 ip addres\r\n<ERROR> invalid parameter");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!channel.needs_resync());
    }

    #[tokio::test]
    async fn test_error_marker_before_prompt_requires_resync() {
        let transport = ScriptedTransport::new("")
            .chunks("bogus", &["bogus\r\n<ERROR> unknown command\r\n", "router# "])
            .reply("show clock", "Mon Jan 1", "router# ");
        let mut channel = PtyChannel::new(transport, PtyConfig::default());
        let prompt = prompt();

        channel.send("bogus", true).await.unwrap();
        assert!(channel.read_until(&[&prompt], Some(&errors())).await.is_err());
        assert!(channel.needs_resync());

        channel.drain(&prompt).await.unwrap();
        assert!(!channel.needs_resync());

        channel.send("show clock", true).await.unwrap();
        let result = channel.read_until(&[&prompt], Some(&errors())).await.unwrap();
        assert!(result.output().contains("Mon Jan 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let transport = ScriptedTransport::new("").hang("show tech", "partial output");
        let config = PtyConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let mut channel = PtyChannel::new(transport, config);
        let prompt = prompt();

        channel.send("show tech", true).await.unwrap();
        let err = channel.read_until(&[&prompt], None).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::PatternTimeout(_))));
        assert!(channel.needs_resync());
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let mut channel = PtyChannel::new(ScriptedTransport::new(""), PtyConfig::default());
        let prompt = prompt();
        let err = channel.read_until(&[&prompt], None).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }
}
