//! Device profiles.
//!
//! A profile bundles the prompt patterns, privilege transitions, error
//! markers, configuration syntax and capability set of one device family.
//! Custom profiles start from a built-in definition and override fields.

mod capabilities;
mod definition;
mod privilege_level;
pub mod vendors;

pub use capabilities::{Capabilities, ConfigFormat, Operation};
pub use definition::{DeviceInfoPatterns, PlatformCommands, PlatformDefinition};
pub use privilege_level::{PrivilegeLevel, SessionMode};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, PlatformError, Result};

/// Built-in device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    FujitsuSir,
    YamahaRtx,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Self::FujitsuSir => vendors::fujitsu_sir::PLATFORM_NAME,
            Self::YamahaRtx => vendors::yamaha_rtx::PLATFORM_NAME,
        }
    }

    /// Build the profile definition.
    pub fn definition(self) -> Result<PlatformDefinition> {
        match self {
            Self::FujitsuSir => vendors::fujitsu_sir::platform(),
            Self::YamahaRtx => vendors::yamaha_rtx::platform(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fujitsu_sir" | "sir" => Ok(Self::FujitsuSir),
            "yamaha_rtx" | "rtx" => Ok(Self::YamahaRtx),
            other => Err(PlatformError::UnknownPlatform {
                name: other.to_string(),
            }
            .into()),
        }
    }
}
