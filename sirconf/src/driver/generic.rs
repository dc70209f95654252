//! Generic driver that works with any platform definition.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::Driver;
use super::cliconf::DeviceInfo;
use super::privilege::PrivilegeManager;
use super::request::{CommandRequest, Interaction};
use super::response::{Response, sanitize};
use crate::channel::{PtyChannel, PtyConfig};
use crate::error::{ChannelError, DriverError, Error, Result};
use crate::platform::{PlatformDefinition, SessionMode};
use crate::transport::Transport;

/// Drives an interactive CLI session over any [`Transport`].
///
/// The driver owns the channel, remembers the last prompt it saw and the
/// mode that prompt implies, and turns device error markers into
/// [`DriverError::CommandFailed`].
pub struct GenericDriver<T> {
    platform: PlatformDefinition,
    channel: PtyChannel<T>,
    privilege_manager: PrivilegeManager,
    /// Union of all mode prompts.
    prompt_pattern: Regex,
    become_password: Option<SecretString>,
    last_prompt: Option<String>,
    is_open: bool,
    pub(super) device_info: Option<DeviceInfo>,
}

impl<T: Transport> GenericDriver<T> {
    pub fn new(transport: T, platform: PlatformDefinition, config: PtyConfig) -> Result<Self> {
        platform.validate()?;
        let prompt_pattern = platform.prompt_pattern()?;
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());

        Ok(Self {
            platform,
            channel: PtyChannel::new(transport, config),
            privilege_manager,
            prompt_pattern,
            become_password: None,
            last_prompt: None,
            is_open: false,
            device_info: None,
        })
    }

    /// Password answered at the admin-class prompt.
    pub fn set_become_password(&mut self, password: SecretString) {
        self.become_password = Some(password);
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    pub fn privilege_manager(&self) -> &PrivilegeManager {
        &self.privilege_manager
    }

    /// Trimmed text of the most recent prompt.
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.channel.timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.channel.set_timeout(timeout);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(DriverError::NotConnected.into())
        }
    }

    /// Record a prompt and the mode it implies.
    fn observe_prompt(&mut self, prompt: &str) {
        let mode = match self.privilege_manager.determine_from_prompt(prompt) {
            Ok(mode) => Some(mode),
            Err(err) => {
                warn!("{}", err);
                None
            }
        };
        self.privilege_manager.set_current(mode);
        self.last_prompt = Some(prompt.trim().to_string());
    }

    /// Send `command` and collect output up to the next prompt, answering
    /// `interactions` on the way. Each interaction is answered at most once.
    async fn exchange(
        &mut self,
        command: &str,
        newline: bool,
        sendonly: bool,
        interactions: &[Interaction],
    ) -> Result<Response> {
        self.ensure_open()?;
        if self.channel.needs_resync() {
            self.channel.drain(&self.prompt_pattern).await?;
        }

        let start = Instant::now();
        debug!("sending: {:?}", command);
        self.channel.send(command, newline).await?;

        if sendonly {
            let prompt = self.last_prompt.clone().unwrap_or_default();
            return Ok(Response::new(command, "", "", prompt, start.elapsed())
                .with_mode(self.privilege_manager.current()));
        }

        let mut raw = Vec::new();
        let mut answered = vec![false; interactions.len()];
        let prompt_start = loop {
            let mut targets = Vec::with_capacity(interactions.len() + 1);
            targets.push(&self.prompt_pattern);
            targets.extend(interactions.iter().map(|i| &i.pattern));

            let read = self
                .channel
                .read_until(&targets, Some(&self.platform.error_patterns))
                .await
                .map_err(|err| command_failed(command, err))?;

            if read.matched == 0 {
                let prompt_start = raw.len() + read.match_start;
                raw.extend_from_slice(&read.data);
                break prompt_start;
            }

            let index = read.matched - 1;
            let interaction = &interactions[index];
            let prompt_text = read.matched_text().trim().to_string();
            raw.extend_from_slice(&read.data);

            if answered[index] {
                return Err(DriverError::CommandFailed {
                    command: command.to_string(),
                    output: format!("prompt '{}' repeated after it was answered", prompt_text),
                }
                .into());
            }
            answered[index] = true;

            let Some(answer) = interaction.answer.as_deref() else {
                return Err(DriverError::MissingAnswer {
                    prompt: prompt_text,
                }
                .into());
            };
            if interaction.hidden {
                debug!("answering {:?} with hidden input", prompt_text);
            } else {
                debug!("answering {:?} with {:?}", prompt_text, answer);
            }
            self.channel.send(answer, newline).await?;
        };

        let output = String::from_utf8_lossy(&raw[..prompt_start]).into_owned();
        let prompt = String::from_utf8_lossy(&raw[prompt_start..]).into_owned();
        self.observe_prompt(&prompt);

        Ok(Response::new(
            command,
            sanitize(&output, command),
            output,
            prompt.trim(),
            start.elapsed(),
        )
        .with_mode(self.privilege_manager.current()))
    }

    /// Enter the admin class unless the prompt already shows it.
    pub async fn become_privileged(&mut self) -> Result<()> {
        if self.last_prompt.as_deref().is_some_and(|p| p.ends_with('#')) {
            return Ok(());
        }
        self.acquire_privilege(SessionMode::Privileged)
            .await
            .map_err(|err| {
                DriverError::ElevationFailed {
                    prompt: self.last_prompt.clone().unwrap_or_default(),
                    message: err.to_string(),
                }
                .into()
            })
    }

    /// Drop back to normal mode. Does nothing before any prompt was seen.
    pub async fn unbecome(&mut self) -> Result<()> {
        if self.last_prompt.is_none() {
            return Ok(());
        }
        match self.privilege_manager.current() {
            Some(mode) if mode > SessionMode::Normal => {
                self.acquire_privilege(SessionMode::Normal).await
            }
            _ => Ok(()),
        }
    }
}

/// Attach the command to a device-reported error.
fn command_failed(command: &str, err: Error) -> Error {
    match err {
        Error::Channel(ChannelError::ErrorMarker { output }) => DriverError::CommandFailed {
            command: command.to_string(),
            output: sanitize(&output, command),
        }
        .into(),
        other => other,
    }
}

impl<T: Transport> Driver for GenericDriver<T> {
    async fn open(&mut self) -> Result<()> {
        if self.is_open {
            return Err(DriverError::AlreadyConnected.into());
        }

        let read = self.channel.read_until(&[&self.prompt_pattern], None).await?;
        let prompt = read.matched_text().into_owned();
        self.observe_prompt(&prompt);
        self.is_open = true;
        info!(
            "session open at {:?} ({})",
            self.last_prompt.as_deref().unwrap_or_default(),
            self.privilege_manager
                .current()
                .map_or("unknown mode", |mode| mode.as_str())
        );

        for command in self.platform.on_open_commands.clone() {
            if let Err(err) = self.send_command(&command).await {
                self.is_open = false;
                return Err(DriverError::TerminalSetup {
                    command,
                    reason: err.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        for command in self.platform.on_close_commands.clone() {
            if let Err(err) = self.send_command(&command).await {
                warn!("closing command {:?} failed: {}", command, err);
            }
        }
        self.is_open = false;
        self.last_prompt = None;
        self.privilege_manager.set_current(None);
        info!("session closed");
        self.channel.close().await
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.exchange(command, true, false, &[]).await
    }

    async fn send_request(&mut self, request: &CommandRequest) -> Result<Response> {
        let interactions = request.interactions()?;
        self.exchange(
            &request.command,
            request.newline,
            request.sendonly,
            &interactions,
        )
        .await
    }

    async fn acquire_privilege(&mut self, target: SessionMode) -> Result<()> {
        self.ensure_open()?;
        let current = self.privilege_manager.current().ok_or_else(|| {
            DriverError::UnknownPrivilege {
                prompt: self.last_prompt.clone().unwrap_or_default(),
            }
        })?;
        if current == target {
            return Ok(());
        }

        for step in self.privilege_manager.path(current, target)? {
            debug!("moving to {} mode with {:?}", step.target, step.command);
            let interactions = match &step.auth_prompt {
                Some(pattern) => vec![Interaction {
                    pattern: pattern.clone(),
                    answer: self
                        .become_password
                        .as_ref()
                        .map(|p| p.expose_secret().to_string()),
                    hidden: true,
                }],
                None => vec![],
            };
            self.exchange(&step.command, true, false, &interactions)
                .await?;

            if self.privilege_manager.current() != Some(step.target) {
                return Err(DriverError::PrivilegeAcquisitionFailed {
                    target: step.target.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn current_mode(&self) -> Option<SessionMode> {
        self.privilege_manager.current()
    }
}
