//! Fujitsu Si-R / SR-S / SR-X profile.
//!
//! Configuration is flat, one statement per line. Commits can be made
//! tentative with a rollback timer.

use crate::config::{MatchPolicy, Syntax};
use crate::error::Result;
use crate::platform::capabilities::{Capabilities, Operation};
use crate::platform::definition::PlatformDefinition;

pub const PLATFORM_NAME: &str = "fujitsu_sir";

fn commit_try(minutes: u32) -> String {
    format!("commit try time {}m", minutes)
}

/// Create the Si-R platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    let capabilities = Capabilities::new("sir")
        .with_diff_match(&[MatchPolicy::Line, MatchPolicy::None])
        .with_diff_replace(&[])
        .with_operations(&[
            Operation::Commit,
            Operation::CommitTimer,
            Operation::Defaults,
            Operation::DiffMatch,
            Operation::GenerateDiff,
        ])
        .with_defaults_flag("all");

    let mut platform = super::admin_class_cli(PLATFORM_NAME, capabilities)?.with_syntax(Syntax::Flat);
    platform.commands.commit_timer = Some(commit_try);
    Ok(platform)
}
