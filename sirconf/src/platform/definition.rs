//! Platform definition: everything profile-specific in one value.

use indexmap::IndexMap;
use regex::Regex;
use regex::bytes::Regex as BytesRegex;

use super::capabilities::Capabilities;
use super::privilege_level::{PrivilegeLevel, SessionMode};
use crate::channel::PatternSet;
use crate::config::Syntax;
use crate::error::{PlatformError, Result};

/// Commands a profile uses for its device operations.
#[derive(Debug, Clone)]
pub struct PlatformCommands {
    pub commit: String,
    /// Builds the timed-commit command from a number of minutes.
    pub commit_timer: Option<fn(u32) -> String>,
    pub discard: String,
    pub save: String,
    pub show_running: String,
    pub show_startup: String,
    pub system_info: String,
    pub hostname: String,
}

/// Regexes that pull identity facts out of `system_info` output.
#[derive(Debug, Clone)]
pub struct DeviceInfoPatterns {
    pub version: Regex,
    pub model: Regex,
}

/// Platform definition containing all vendor-specific configuration.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "fujitsu_sir").
    pub name: String,

    /// Prompt and transition definition per mode.
    pub privilege_levels: IndexMap<SessionMode, PrivilegeLevel>,

    /// Mode expected after login.
    pub default_mode: SessionMode,

    /// Patterns that mark device-reported command failures.
    pub error_patterns: PatternSet,

    /// Commands to run when the session is opened.
    pub on_open_commands: Vec<String>,

    /// Commands to run before the session is closed.
    pub on_close_commands: Vec<String>,

    /// How configuration text nests.
    pub config_syntax: Syntax,

    pub capabilities: Capabilities,

    pub commands: PlatformCommands,

    pub device_info: DeviceInfoPatterns,
}

impl PlatformDefinition {
    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.mode, level);
        self
    }

    pub fn with_default_mode(mut self, mode: SessionMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Add an error-marker pattern.
    pub fn with_error_pattern(mut self, pattern: &str) -> std::result::Result<Self, regex::Error> {
        self.error_patterns.push(BytesRegex::new(pattern)?);
        Ok(self)
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_on_close_command(mut self, command: impl Into<String>) -> Self {
        self.on_close_commands.push(command.into());
        self
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.config_syntax = syntax;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_commands(mut self, commands: PlatformCommands) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn get_privilege(&self, mode: SessionMode) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(&mode)
    }

    /// One regex matching the prompt of any mode.
    pub fn prompt_pattern(&self) -> Result<BytesRegex> {
        if self.privilege_levels.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' defines no privilege levels", self.name),
            }
            .into());
        }
        let combined = self
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Ok(BytesRegex::new(&combined)?)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| -> crate::error::Error {
            PlatformError::InvalidDefinition { message }.into()
        };

        if !self.privilege_levels.contains_key(&self.default_mode) {
            return Err(invalid(format!(
                "default mode '{}' has no privilege level",
                self.default_mode
            )));
        }
        for level in self.privilege_levels.values() {
            if let Some(parent) = level.mode.parent() {
                if self.privilege_levels.contains_key(&parent) && level.escalate_command.is_none() {
                    return Err(invalid(format!(
                        "mode '{}' has no command to enter it",
                        level.mode
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    #[test]
    fn test_prompt_pattern_matches_every_mode() {
        let platform = Platform::FujitsuSir.definition().unwrap();
        let prompt = platform.prompt_pattern().unwrap();
        assert!(prompt.is_match(b"\r\nrouter> "));
        assert!(prompt.is_match(b"\r\nrouter# "));
        assert!(prompt.is_match(b"\r\nrouter(config)# "));
        assert!(!prompt.is_match(b"\r\nrouter#"));
    }

    #[test]
    fn test_validate_rejects_missing_default_mode() {
        let mut platform = Platform::FujitsuSir
            .definition()
            .unwrap()
            .with_default_mode(SessionMode::Configuring);
        platform.privilege_levels.shift_remove(&SessionMode::Configuring);
        assert!(platform.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unreachable_mode() {
        let mut platform = Platform::FujitsuSir.definition().unwrap();
        if let Some(level) = platform.privilege_levels.get_mut(&SessionMode::Privileged) {
            level.escalate_command = None;
        }
        assert!(platform.validate().is_err());
    }

    #[test]
    fn test_empty_definition_has_no_prompt() {
        let mut platform = Platform::FujitsuSir.definition().unwrap();
        platform.privilege_levels.clear();
        assert!(platform.prompt_pattern().is_err());
    }
}
