//! In-memory transport that replays a scripted device conversation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::Transport;
use crate::error::{ChannelError, Result};

/// Shared record of every line sent.
pub(crate) type SentLog = Arc<Mutex<Vec<String>>>;

struct Exchange {
    expect: String,
    reply: Vec<Bytes>,
    hang: bool,
}

/// Replays device output for an expected sequence of sent lines.
///
/// Panics when a line arrives that does not match the script.
pub(crate) struct ScriptedTransport {
    pending: VecDeque<Bytes>,
    script: VecDeque<Exchange>,
    sent: SentLog,
    hung: bool,
}

impl ScriptedTransport {
    /// Start with `banner` waiting to be read.
    pub(crate) fn new(banner: &str) -> Self {
        let mut pending = VecDeque::new();
        if !banner.is_empty() {
            pending.push_back(Bytes::from(banner.to_string()));
        }
        Self {
            pending,
            script: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            hung: false,
        }
    }

    /// Expect `command`; answer with its echo, `output` and `prompt`.
    pub(crate) fn reply(self, command: &str, output: &str, prompt: &str) -> Self {
        let text = if output.is_empty() {
            format!("{command}\r\n{prompt}")
        } else {
            format!("{command}\r\n{output}\r\n{prompt}")
        };
        self.chunks(command, &[text.as_str()])
    }

    /// Expect `command`; answer with exactly these chunks.
    pub(crate) fn chunks(mut self, command: &str, chunks: &[&str]) -> Self {
        self.script.push_back(Exchange {
            expect: command.to_string(),
            reply: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
            hang: false,
        });
        self
    }

    /// Expect `command`; answer with `partial` and then go silent.
    pub(crate) fn hang(mut self, command: &str, partial: &str) -> Self {
        self.script.push_back(Exchange {
            expect: command.to_string(),
            reply: vec![Bytes::from(partial.to_string())],
            hang: true,
        });
        self
    }

    pub(crate) fn sent_log(&self) -> SentLog {
        Arc::clone(&self.sent)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.sent.lock().unwrap().push(line.clone());

        match self.script.pop_front() {
            Some(exchange) if exchange.expect == line => {
                self.pending.extend(exchange.reply);
                self.hung = exchange.hang;
                Ok(())
            }
            Some(exchange) => panic!("expected {:?} but got {:?}", exchange.expect, line),
            None => panic!("unexpected line {:?}", line),
        }
    }

    async fn receive(&mut self) -> Result<Bytes> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(chunk);
        }
        if self.hung {
            std::future::pending::<()>().await;
        }
        Err(ChannelError::Closed.into())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
