//! Session modes and their prompt definitions.

use std::fmt;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// CLI mode of an interactive session.
///
/// Modes are strictly layered: `Configuring` is only reachable from
/// `Privileged`, which is only reachable from `Normal`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Normal,
    Privileged,
    Configuring,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Privileged => "privileged",
            Self::Configuring => "configuring",
        }
    }

    /// The mode one step below this one.
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Normal => None,
            Self::Privileged => Some(Self::Normal),
            Self::Configuring => Some(Self::Privileged),
        }
    }

    /// The mode one step above this one.
    pub fn child(self) -> Option<Self> {
        match self {
            Self::Normal => Some(Self::Privileged),
            Self::Privileged => Some(Self::Configuring),
            Self::Configuring => None,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt and transition commands for one session mode.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// Mode this level describes.
    pub mode: SessionMode,

    /// Regex matching the prompt shown in this mode.
    pub pattern: Regex,

    /// Command to enter this mode from its parent.
    pub escalate_command: Option<String>,

    /// Command to leave this mode for its parent.
    pub deescalate_command: Option<String>,

    /// Password prompt that may follow the escalate command.
    pub escalate_prompt: Option<Regex>,

    /// Strings that must NOT be in the prompt for this level to match.
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    pub fn new(mode: SessionMode, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            mode,
            pattern: Regex::new(pattern)?,
            escalate_command: None,
            deescalate_command: None,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = Some(command.into());
        self
    }

    /// Escalation may be answered with a password at this prompt.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Check if this level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc.as_str())) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_layering() {
        assert_eq!(SessionMode::Normal.child(), Some(SessionMode::Privileged));
        assert_eq!(SessionMode::Configuring.parent(), Some(SessionMode::Privileged));
        assert_eq!(SessionMode::Normal.parent(), None);
        assert_eq!(SessionMode::Configuring.child(), None);
        assert!(SessionMode::Normal < SessionMode::Configuring);
    }

    #[test]
    fn test_not_contains() {
        let level = PrivilegeLevel::new(SessionMode::Privileged, r"# $")
            .unwrap()
            .with_not_contains("(config)");
        assert!(level.matches("router# "));
        assert!(!level.matches("router(config)# "));
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionMode::Configuring).unwrap(),
            "\"configuring\""
        );
    }
}
