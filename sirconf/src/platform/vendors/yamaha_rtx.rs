//! Yamaha RTX / NVR / FWX / vRX profile.
//!
//! Configuration nests by one space per level. Diffs may replace whole
//! blocks and skip ignored lines; there is no commit timer.

use crate::config::{MatchPolicy, ReplacePolicy, Syntax};
use crate::error::Result;
use crate::platform::capabilities::{Capabilities, Operation};
use crate::platform::definition::PlatformDefinition;

pub const PLATFORM_NAME: &str = "yamaha_rtx";

/// Create the RTX platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    let capabilities = Capabilities::new("rtx")
        .with_diff_match(&[MatchPolicy::Line, MatchPolicy::None])
        .with_diff_replace(&[ReplacePolicy::Line, ReplacePolicy::Block])
        .with_operations(&[
            Operation::Commit,
            Operation::Defaults,
            Operation::DiffMatch,
            Operation::DiffReplace,
            Operation::DiffIgnoreLines,
            Operation::GenerateDiff,
        ])
        .with_defaults_flag("all");

    Ok(super::admin_class_cli(PLATFORM_NAME, capabilities)?
        .with_syntax(Syntax::Indented { width: 1 }))
}
