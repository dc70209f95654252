//! Command requests, including commands that stop at an interactive prompt.
//!
//! A request is either a bare command line or a structured entry naming a
//! prompt the device may show and the answer to give it:
//!
//! ```rust
//! use sirconf::driver::CommandRequest;
//!
//! let plain = CommandRequest::from("show system information");
//! let confirm = CommandRequest::new("reset").with_prompt(r"\(y/n\)", "y");
//! assert!(plain.prompt.is_none());
//! assert_eq!(confirm.answer.as_deref(), Some("y"));
//! ```

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One command to send, with optional prompt handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RequestRepr")]
pub struct CommandRequest {
    pub command: String,

    /// Regex for a prompt the command may stop at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Text sent when `prompt` shows up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Terminate the command (and the answer) with a newline.
    pub newline: bool,

    /// Send without waiting for any output.
    pub sendonly: bool,

    /// Requested output format. Text is the only format, so any value is
    /// rejected by the operations that check it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

fn default_newline() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestRepr {
    Line(String),
    Full {
        command: String,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        answer: Option<String>,
        #[serde(default = "default_newline")]
        newline: bool,
        #[serde(default)]
        sendonly: bool,
        #[serde(default)]
        output: Option<String>,
    },
}

impl From<RequestRepr> for CommandRequest {
    fn from(repr: RequestRepr) -> Self {
        match repr {
            RequestRepr::Line(command) => Self::new(command),
            RequestRepr::Full {
                command,
                prompt,
                answer,
                newline,
                sendonly,
                output,
            } => Self {
                command,
                prompt,
                answer,
                newline,
                sendonly,
                output,
            },
        }
    }
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prompt: None,
            answer: None,
            newline: true,
            sendonly: false,
            output: None,
        }
    }

    /// Answer `answer` when output matching `prompt` appears.
    pub fn with_prompt(mut self, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self.answer = Some(answer.into());
        self
    }

    pub fn sendonly(mut self) -> Self {
        self.sendonly = true;
        self
    }

    pub fn without_newline(mut self) -> Self {
        self.newline = false;
        self
    }

    /// Compile the prompt handling this request asks for.
    pub(crate) fn interactions(&self) -> Result<Vec<Interaction>> {
        match &self.prompt {
            Some(prompt) => Ok(vec![Interaction {
                pattern: Regex::new(prompt)?,
                answer: self.answer.clone(),
                hidden: false,
            }]),
            None => Ok(vec![]),
        }
    }
}

impl From<&str> for CommandRequest {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for CommandRequest {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}

/// A prompt the driver answers while waiting for the device prompt.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub pattern: Regex,
    /// `None` means the prompt is recognised but cannot be answered.
    pub answer: Option<String>,
    /// Keep the answer out of the logs.
    pub hidden: bool,
}
