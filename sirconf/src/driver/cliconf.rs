//! Device operations built on the generic driver: fetching and diffing
//! configuration, applying it, committing, and running arbitrary commands.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::Driver;
use super::config_session::{ConfigSession, ConfirmableCommit, GenericConfigSession};
use super::generic::GenericDriver;
use super::request::CommandRequest;
use crate::condition::CommandRunner;
use crate::config::{
    ConfigTree, DiffOptions, MatchPolicy, ParseOptions, ReplacePolicy, difference,
    is_noop_command, render,
};
use crate::error::{DriverError, Error, PlatformError, Result};
use crate::platform::{Capabilities, ConfigFormat, Operation, PlatformDefinition};
use crate::transport::Transport;

/// Which stored configuration to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    #[default]
    Running,
    Startup,
}

/// Identity facts about the connected device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub network_os: String,
    pub network_os_version: Option<String>,
    pub network_os_model: Option<String>,
    pub network_os_hostname: Option<String>,
}

/// Input to [`get_diff`].
#[derive(Debug, Clone, Default)]
pub struct DiffRequest {
    pub candidate: String,
    /// Configuration to diff against; everything is new without it.
    pub running: Option<String>,
    pub match_policy: MatchPolicy,
    pub replace: Option<ReplacePolicy>,
    /// Lines left out of both configurations before comparing.
    pub ignore_lines: Option<Vec<String>>,
    /// Restrict the diff to the block at this path.
    pub path: Vec<String>,
    /// Commands placed ahead of a non-empty diff.
    pub before: Vec<String>,
    /// Commands placed after a non-empty diff.
    pub after: Vec<String>,
}

impl DiffRequest {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            ..Default::default()
        }
    }

    pub fn running(mut self, running: impl Into<String>) -> Self {
        self.running = Some(running.into());
        self
    }

    pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn replace(mut self, policy: ReplacePolicy) -> Self {
        self.replace = Some(policy);
        self
    }

    pub fn ignore_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_lines = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    pub fn path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn before<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn after<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = commands.into_iter().map(Into::into).collect();
        self
    }
}

/// Commands needed to bring the device to the candidate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    /// Newline-joined commands; empty when nothing changes.
    pub config_diff: String,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.config_diff.is_empty()
    }

    pub fn commands(&self) -> Vec<&str> {
        self.config_diff.lines().collect()
    }
}

/// Knobs for [`GenericDriver::edit_config`].
#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Commit after loading; otherwise just leave configuration mode.
    pub commit: bool,
    /// Minutes before a provisional commit rolls back.
    pub commit_timer: Option<u32>,
    /// Full configuration to replace the running one with.
    pub replace: Option<String>,
    pub comment: Option<String>,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            commit: true,
            commit_timer: None,
            replace: None,
            comment: None,
        }
    }
}

/// What was sent by [`GenericDriver::edit_config`] and what came back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditResponse {
    pub requests: Vec<String>,
    pub responses: Vec<String>,
}

/// Compute the commands that turn `request.running` into
/// `request.candidate`, after checking the options against the profile.
pub fn get_diff(platform: &PlatformDefinition, request: &DiffRequest) -> Result<ConfigDiff> {
    let capabilities = &platform.capabilities;
    capabilities.check_match(request.match_policy)?;
    if let Some(replace) = request.replace {
        capabilities.check_replace(replace)?;
    }
    if request.ignore_lines.is_some() {
        capabilities.require(Operation::DiffIgnoreLines)?;
    }

    let options = ParseOptions::new(platform.config_syntax).with_ignore_lines(
        request
            .ignore_lines
            .iter()
            .flatten()
            .map(String::as_str),
    );
    let candidate = ConfigTree::parse(&request.candidate, &options)?;
    let running = match &request.running {
        Some(running) if request.match_policy != MatchPolicy::None => {
            ConfigTree::parse(running, &options)?
        }
        _ => ConfigTree::empty(platform.config_syntax),
    };

    let diff = difference(
        &candidate,
        &running,
        &DiffOptions {
            match_policy: request.match_policy,
            replace: request.replace.unwrap_or_default(),
            path: request.path.clone(),
        },
    );
    if diff.statements().all(|s| is_noop_command(s.text())) {
        debug!("diff produced no commands");
        return Ok(ConfigDiff::default());
    }
    let commands = render(&diff, &request.before, &request.after);
    debug!("diff produced {} command(s)", commands.len());

    Ok(ConfigDiff {
        config_diff: commands.join("\n"),
    })
}

fn check_edit(capabilities: &Capabilities, candidate: &[CommandRequest], options: &EditOptions) -> Result<()> {
    if candidate.is_empty() && options.replace.is_none() {
        return Err(PlatformError::InvalidValue {
            message: "must provide a candidate or replace to load configuration".to_string(),
        }
        .into());
    }
    if options.replace.is_some() {
        capabilities.require(Operation::Replace)?;
    }
    if options.comment.is_some() {
        capabilities.require(Operation::CommitComment)?;
    }
    if options.commit_timer.is_some_and(|minutes| minutes > 0) {
        capabilities.require(Operation::CommitTimer)?;
    }
    Ok(())
}

impl<T: Transport> GenericDriver<T> {
    /// Read a stored configuration from the admin class.
    pub async fn get_config(
        &mut self,
        source: ConfigSource,
        format: ConfigFormat,
        flags: &[String],
    ) -> Result<String> {
        self.platform().capabilities.check_format(format)?;
        let base = match source {
            ConfigSource::Running => &self.platform().commands.show_running,
            ConfigSource::Startup => &self.platform().commands.show_startup,
        };
        let command = std::iter::once(base.as_str())
            .chain(flags.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        self.become_privileged().await?;
        Ok(self.send_command(&command).await?.result)
    }

    /// Run one request and return its output.
    pub async fn get(&mut self, request: &CommandRequest) -> Result<String> {
        reject_output_format(request)?;
        Ok(self.send_request(request).await?.result)
    }

    /// [`get_diff`] against this driver's profile.
    pub fn get_diff(&self, request: &DiffRequest) -> Result<ConfigDiff> {
        get_diff(self.platform(), request)
    }

    /// Load `candidate` in configuration mode and commit it.
    ///
    /// Navigation commands and comments in the candidate are skipped. A
    /// refused commit discards the pending changes.
    pub async fn edit_config(
        &mut self,
        candidate: &[CommandRequest],
        options: &EditOptions,
    ) -> Result<EditResponse> {
        check_edit(&self.platform().capabilities, candidate, options)?;

        let mut session = GenericConfigSession::new(self).await?;
        let mut response = EditResponse::default();
        for request in candidate {
            if is_noop_command(&request.command) {
                continue;
            }
            let reply = session.send_request(request).await?;
            response.requests.push(request.command.clone());
            response.responses.push(reply.result);
        }

        match (options.commit, options.commit_timer) {
            (true, Some(minutes)) => session.commit_confirmed(minutes).await?,
            (true, None) => session.commit().await?,
            (false, _) => session.end().await?,
        }
        info!("loaded {} configuration line(s)", response.requests.len());
        Ok(response)
    }

    /// Run each request in order and collect the outputs.
    ///
    /// With `check_rc` off, a device-reported error is returned as that
    /// command's output instead of failing the batch.
    pub async fn run_commands(
        &mut self,
        commands: &[CommandRequest],
        check_rc: bool,
    ) -> Result<Vec<String>> {
        for request in commands {
            reject_output_format(request)?;
        }

        let mut responses = Vec::with_capacity(commands.len());
        for request in commands {
            match self.send_request(request).await {
                Ok(response) => responses.push(response.result),
                Err(Error::Driver(DriverError::CommandFailed { output, .. })) if !check_rc => {
                    responses.push(output)
                }
                Err(err) => return Err(err),
            }
        }
        Ok(responses)
    }

    /// Send the commit command. Must be called in configuration mode.
    pub async fn commit(&mut self, comment: Option<&str>, timer: Option<u32>) -> Result<()> {
        let platform = self.platform();
        if comment.is_some() {
            platform.capabilities.require(Operation::CommitComment)?;
        }
        let command = match timer {
            Some(minutes) if minutes > 0 => {
                platform.capabilities.require(Operation::CommitTimer)?;
                let build = platform.commands.commit_timer.ok_or_else(|| {
                    PlatformError::UnsupportedOperation {
                        operation: Operation::CommitTimer.to_string(),
                    }
                })?;
                build(minutes)
            }
            _ => platform.commands.commit.clone(),
        };
        self.send_command(&command).await?;
        Ok(())
    }

    /// Throw away uncommitted changes.
    pub async fn discard_changes(&mut self) -> Result<()> {
        let command = self.platform().commands.discard.clone();
        self.send_command(&command).await?;
        Ok(())
    }

    /// Firmware version, model and hostname. Read once per driver.
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        if let Some(info) = &self.device_info {
            return Ok(info.clone());
        }

        let commands = self.platform().commands.clone();
        self.become_privileged().await?;
        let system = self.send_command(&commands.system_info).await?.result;
        let hostname = self.send_command(&commands.hostname).await?.result;

        let patterns = &self.platform().device_info;
        let info = DeviceInfo {
            network_os: self.platform().capabilities.network_os.clone(),
            network_os_version: patterns
                .version
                .captures(&system)
                .map(|caps| caps[1].to_string()),
            network_os_model: patterns
                .model
                .captures(&system)
                .map(|caps| caps[1].to_string()),
            network_os_hostname: Some(hostname.trim().to_string()).filter(|h| !h.is_empty()),
        };
        self.device_info = Some(info.clone());
        Ok(info)
    }

    pub fn get_capabilities(&self) -> &Capabilities {
        &self.platform().capabilities
    }

    /// Flag that makes `show running-config` include default values.
    pub fn get_defaults_flag(&self) -> Option<&str> {
        self.platform().capabilities.defaults_flag.as_deref()
    }
}

fn reject_output_format(request: &CommandRequest) -> Result<()> {
    match &request.output {
        Some(output) => Err(PlatformError::InvalidValue {
            message: format!("'output' value {} is not supported for run_commands", output),
        }
        .into()),
        None => Ok(()),
    }
}

impl<T: Transport> CommandRunner for GenericDriver<T> {
    async fn run_batch(&mut self, commands: &[CommandRequest]) -> Result<Vec<String>> {
        self.run_commands(commands, true).await
    }
}
