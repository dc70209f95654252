//! Session mode tracking and transitions.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Result};
use crate::platform::{PrivilegeLevel, SessionMode};

/// Tracks the current session mode and plans moves between modes.
///
/// Modes form a chain, so the route between two modes is a run of single
/// steps through [`SessionMode::child`] or [`SessionMode::parent`].
#[derive(Debug, Clone)]
pub struct PrivilegeManager {
    levels: IndexMap<SessionMode, PrivilegeLevel>,
    current: Option<SessionMode>,
}

/// One step of a mode change.
#[derive(Debug, Clone)]
pub struct Transition {
    pub command: String,
    /// Mode expected once the command completes.
    pub target: SessionMode,
    /// Password prompt the step may stop at.
    pub auth_prompt: Option<Regex>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<SessionMode, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// Identify the mode shown by `prompt`.
    ///
    /// Levels are tried in definition order; a level whose `not_contains`
    /// strings appear in the prompt is skipped.
    pub fn determine_from_prompt(&self, prompt: &str) -> Result<SessionMode> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .map(|level| level.mode)
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.trim().to_string(),
                }
                .into()
            })
    }

    pub fn current(&self) -> Option<SessionMode> {
        self.current
    }

    pub fn set_current(&mut self, mode: Option<SessionMode>) {
        self.current = mode;
    }

    pub fn level(&self, mode: SessionMode) -> Option<&PrivilegeLevel> {
        self.levels.get(&mode)
    }

    /// Steps leading from `from` to `to`. Empty when they are equal.
    pub fn path(&self, from: SessionMode, to: SessionMode) -> Result<Vec<Transition>> {
        let no_path = || -> crate::error::Error {
            DriverError::NoPrivilegePath {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into()
        };

        let mut steps = Vec::new();
        let mut mode = from;
        while mode != to {
            let step = if to > mode {
                let next = mode.child().ok_or_else(no_path)?;
                let level = self.levels.get(&next).ok_or_else(no_path)?;
                Transition {
                    command: level.escalate_command.clone().ok_or_else(no_path)?,
                    target: next,
                    auth_prompt: level.escalate_prompt.clone(),
                }
            } else {
                let next = mode.parent().ok_or_else(no_path)?;
                let level = self.levels.get(&mode).ok_or_else(no_path)?;
                if !self.levels.contains_key(&next) {
                    return Err(no_path());
                }
                Transition {
                    command: level.deescalate_command.clone().ok_or_else(no_path)?,
                    target: next,
                    auth_prompt: None,
                }
            };
            mode = step.target;
            steps.push(step);
        }
        Ok(steps)
    }
}
