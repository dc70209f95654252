//! Typed capability descriptor for a device profile.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{MatchPolicy, ReplacePolicy};
use crate::error::{PlatformError, Result};

/// Formats configuration can be fetched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    #[default]
    Text,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
        }
    }
}

/// Optional operations a profile may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Commit,
    CommitComment,
    CommitTimer,
    Rollback,
    Defaults,
    OnboxDiff,
    MultilineDelimiter,
    DiffMatch,
    DiffReplace,
    DiffIgnoreLines,
    GenerateDiff,
    Replace,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::CommitComment => "commit comment",
            Self::CommitTimer => "commit timer",
            Self::Rollback => "rollback",
            Self::Defaults => "defaults",
            Self::OnboxDiff => "onbox diff",
            Self::MultilineDelimiter => "multiline delimiter",
            Self::DiffMatch => "diff match",
            Self::DiffReplace => "diff replace",
            Self::DiffIgnoreLines => "diff_ignore_lines",
            Self::GenerateDiff => "generate diff",
            Self::Replace => "configuration replace",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a profile supports. Checked before any device interaction.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub network_os: String,
    /// Device operations exposed by the driver.
    pub rpc: Vec<String>,
    pub formats: Vec<ConfigFormat>,
    pub diff_match: Vec<MatchPolicy>,
    pub diff_replace: Vec<ReplacePolicy>,
    pub operations: Vec<Operation>,
    /// Flag appended to `show running-config` to include defaults.
    pub defaults_flag: Option<String>,
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Capabilities {
    pub fn new(network_os: impl Into<String>) -> Self {
        Self {
            network_os: network_os.into(),
            rpc: [
                "get_config",
                "edit_config",
                "get_capabilities",
                "get",
                "commit",
                "discard_changes",
                "get_diff",
                "run_commands",
                "get_defaults_flag",
                "get_device_info",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            formats: vec![ConfigFormat::Text],
            diff_match: vec![],
            diff_replace: vec![],
            operations: vec![],
            defaults_flag: None,
        }
    }

    pub fn with_diff_match(mut self, policies: &[MatchPolicy]) -> Self {
        self.diff_match = policies.to_vec();
        self
    }

    pub fn with_diff_replace(mut self, policies: &[ReplacePolicy]) -> Self {
        self.diff_replace = policies.to_vec();
        self
    }

    pub fn with_operations(mut self, operations: &[Operation]) -> Self {
        self.operations = operations.to_vec();
        self
    }

    pub fn with_defaults_flag(mut self, flag: impl Into<String>) -> Self {
        self.defaults_flag = Some(flag.into());
        self
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    /// Fail unless the operation is offered.
    pub fn require(&self, operation: Operation) -> Result<()> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(PlatformError::UnsupportedOperation {
                operation: operation.to_string(),
            }
            .into())
        }
    }

    pub fn check_format(&self, format: ConfigFormat) -> Result<()> {
        if self.formats.contains(&format) {
            return Ok(());
        }
        Err(PlatformError::UnsupportedValue {
            option: "format",
            value: format.to_string(),
            supported: join(&self.formats),
        }
        .into())
    }

    pub fn check_match(&self, policy: MatchPolicy) -> Result<()> {
        if self.diff_match.contains(&policy) {
            return Ok(());
        }
        Err(PlatformError::UnsupportedValue {
            option: "match",
            value: policy.to_string(),
            supported: join(&self.diff_match),
        }
        .into())
    }

    pub fn check_replace(&self, policy: ReplacePolicy) -> Result<()> {
        if self.diff_replace.contains(&policy) {
            return Ok(());
        }
        Err(PlatformError::UnsupportedValue {
            option: "replace",
            value: policy.to_string(),
            supported: join(&self.diff_replace),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn caps() -> Capabilities {
        Capabilities::new("sir")
            .with_diff_match(&[MatchPolicy::Line, MatchPolicy::None])
            .with_operations(&[Operation::Commit, Operation::CommitTimer])
            .with_defaults_flag("all")
    }

    #[test]
    fn test_supported_values_pass() {
        let caps = caps();
        caps.check_match(MatchPolicy::Line).unwrap();
        caps.check_format(ConfigFormat::Text).unwrap();
        caps.require(Operation::CommitTimer).unwrap();
    }

    #[test]
    fn test_unsupported_match_lists_valid_values() {
        let err = caps().check_match(MatchPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::UnsupportedValue { option: "match", .. })
        ));
        assert_eq!(
            err.to_string(),
            "Platform error: 'match' value strict is not supported, valid values are line, none"
        );
    }

    #[test]
    fn test_empty_replace_set_rejects_everything() {
        assert!(caps().check_replace(ReplacePolicy::Line).is_err());
        assert!(caps().check_replace(ReplacePolicy::Block).is_err());
    }

    #[test]
    fn test_unsupported_operation() {
        let err = caps().require(Operation::CommitComment).unwrap_err();
        assert_eq!(err.to_string(), "Platform error: commit comment is not supported");
    }

    #[test]
    fn test_serializes_for_reporting() {
        let value = serde_json::to_value(caps()).unwrap();
        assert_eq!(value["network_os"], "sir");
        assert_eq!(value["diff_match"], serde_json::json!(["line", "none"]));
        assert_eq!(value["operations"], serde_json::json!(["commit", "commit_timer"]));
        assert_eq!(value["defaults_flag"], "all");
    }
}
