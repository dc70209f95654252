//! Built-in device profiles.
//!
//! Both profiles drive the same admin-class CLI: `admin` to elevate,
//! `configure` to enter configuration mode, and `<ERROR> ` as the device
//! error marker. They differ in capabilities and configuration syntax.

pub mod fujitsu_sir;
pub mod yamaha_rtx;

use indexmap::IndexMap;
use regex::Regex;

use super::capabilities::Capabilities;
use super::definition::{DeviceInfoPatterns, PlatformCommands, PlatformDefinition};
use super::privilege_level::{PrivilegeLevel, SessionMode};
use crate::channel::PatternSet;
use crate::config::Syntax;
use crate::error::Result;

const NORMAL_PROMPT: &str = r"[\r\n]?[\w+\-.:/\[\]]+> $";
const ADMIN_PROMPT: &str = r"[\r\n]?[\w+\-.:/\[\]]+# $";
const CONFIG_PROMPT: &str = r"[\r\n]?[\w+\-.:/\[\]]+\(config\)# $";
const PASSWORD_PROMPT: &str = r"[\r\n]?Password: $";
const ERROR_MARKER: &str = r"<ERROR> ";

/// The admin-class CLI shared by the built-in profiles.
pub(crate) fn admin_class_cli(name: &str, capabilities: Capabilities) -> Result<PlatformDefinition> {
    let normal = PrivilegeLevel::new(SessionMode::Normal, NORMAL_PROMPT)?;

    let admin = PrivilegeLevel::new(SessionMode::Privileged, ADMIN_PROMPT)?
        .with_escalate("admin")
        .with_deescalate("exit")
        .with_auth(PASSWORD_PROMPT)?
        .with_not_contains("(config)");

    let config = PrivilegeLevel::new(SessionMode::Configuring, CONFIG_PROMPT)?
        .with_escalate("configure")
        .with_deescalate("end");

    let definition = PlatformDefinition {
        name: name.to_string(),
        privilege_levels: IndexMap::new(),
        default_mode: SessionMode::Normal,
        error_patterns: PatternSet::default(),
        on_open_commands: vec![],
        on_close_commands: vec![],
        config_syntax: Syntax::Flat,
        capabilities,
        commands: PlatformCommands {
            commit: "commit".to_string(),
            commit_timer: None,
            discard: "discard".to_string(),
            save: "save".to_string(),
            show_running: "show running-config".to_string(),
            show_startup: "show startup-config".to_string(),
            system_info: "show system information".to_string(),
            hostname: "show running-config sysname".to_string(),
        },
        device_info: DeviceInfoPatterns {
            version: Regex::new(r"Firm Ver. : V(\d\d\.\d\d)")?,
            model: Regex::new(r"System : ((Si-R|SR-S|SR-X) ?\w{2,6})")?,
        },
    };

    Ok(definition
        .with_privilege(normal)
        .with_privilege(admin)
        .with_privilege(config)
        .with_error_pattern(ERROR_MARKER)?
        .with_on_open_command("terminal pager disable"))
}
