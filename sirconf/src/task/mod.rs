//! Calling-layer workflows.
//!
//! Each task takes serde-deserializable parameters, so an automation layer
//! can load them from YAML or JSON, and returns a serializable result.
//!
//! - [`config`]: converge the running configuration toward a candidate,
//!   with optional backup, save and before/after diff.
//! - [`command`]: run commands, optionally until wait conditions hold.
//! - [`ping`]: run a ping and check the outcome against the expected state.

pub mod backup;
pub mod command;
pub mod config;
pub mod ping;

pub use backup::{BackupInfo, BackupOptions, write_backup};
pub use command::{CommandParams, CommandResult};
pub use config::{ConfigCache, ConfigParams, ConfigResult, DiffAgainst, SaveWhen, TextDiff};
pub use ping::{Afi, PingParams, PingParser, PingResult, PingState, PingStats, Rtt};

use crate::error::Result;

/// Turns raw command output into a typed value.
pub trait OutputParser {
    type Output;

    fn parse(&self, raw: &str) -> Result<Self::Output>;
}

/// How a task is being run.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    /// Report what would change without changing anything.
    pub check_mode: bool,
    /// Produce before/after configuration text.
    pub diff_mode: bool,
    /// Inventory name of the device, used for backup file names.
    pub host: String,
}

impl TaskContext {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn check_mode(mut self, enabled: bool) -> Self {
        self.check_mode = enabled;
        self
    }

    pub fn diff_mode(mut self, enabled: bool) -> Self {
        self.diff_mode = enabled;
        self
    }
}
