//! Command execution results.

use std::fmt;
use std::time::Duration;

use crate::platform::SessionMode;

/// Output of one command.
#[derive(Debug, Clone)]
pub struct Response {
    pub command: String,

    /// Output with carriage returns, the command echo and the prompt removed.
    pub result: String,

    /// Everything received before the prompt.
    pub raw_result: String,

    /// Prompt the command finished at, trimmed.
    pub prompt: String,

    /// Mode the session was in afterwards, when the prompt identified one.
    pub mode: Option<SessionMode>,

    pub elapsed: Duration,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            mode: None,
            elapsed,
        }
    }

    pub(crate) fn with_mode(mut self, mode: Option<SessionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.result)
    }
}

/// Strip carriage returns and echoed command lines from raw output.
pub(crate) fn sanitize(raw: &str, command: &str) -> String {
    let command = command.trim();
    raw.replace('\r', "")
        .lines()
        .filter(|line| command.is_empty() || line.trim() != command)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
