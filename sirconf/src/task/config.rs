//! Converging a device's running configuration toward a candidate.
//!
//! The candidate comes from `lines` or `src`. It is diffed against the
//! running configuration (fetched, or supplied as `running_config`) and
//! the missing statements are loaded and committed. Around that, the task
//! can back up the configuration first, save it to startup afterwards and
//! produce a before/after text diff.

use std::collections::HashMap;

use chrono::Local;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::TaskContext;
use super::backup::{BackupInfo, BackupOptions, write_backup};
use crate::config::{ConfigTree, MatchPolicy, ParseOptions};
use crate::driver::{CommandRequest, ConfigSource, DiffRequest, EditOptions, GenericDriver};
use crate::error::{Result, TaskError};
use crate::platform::ConfigFormat;
use crate::transport::Transport;

/// When the running configuration is written to startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveWhen {
    Always,
    #[default]
    Never,
    /// When running and startup differ.
    Modified,
    /// When this task changed something.
    Changed,
}

/// What diff mode compares the running configuration with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAgainst {
    /// The configuration before this task ran.
    Running,
    Startup,
    /// `intended_config`.
    Intended,
}

/// Parameters of a configuration run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigParams {
    /// Candidate configuration text.
    pub src: Option<String>,
    /// Candidate configuration lines; exclusive with `src`.
    #[serde(alias = "commands")]
    pub lines: Option<Vec<String>>,
    /// Commands sent ahead of the updates when there are any.
    pub before: Vec<String>,
    /// Commands sent after the updates when there are any.
    pub after: Vec<String>,
    #[serde(rename = "match")]
    pub match_policy: MatchPolicy,
    /// Use this instead of reading the running configuration.
    #[serde(alias = "config")]
    pub running_config: Option<String>,
    pub intended_config: Option<String>,
    /// Read the running configuration with default values included.
    pub defaults: bool,
    pub backup: bool,
    pub backup_options: BackupOptions,
    pub save_when: SaveWhen,
    pub diff_against: Option<DiffAgainst>,
    pub diff_ignore_lines: Option<Vec<String>>,
}

impl ConfigParams {
    pub fn validate(&self) -> Result<()> {
        if self.lines.is_some() && self.src.is_some() {
            return Err(TaskError::InvalidParams {
                message: "parameters are mutually exclusive: lines|src".to_string(),
            }
            .into());
        }
        if self.diff_against == Some(DiffAgainst::Intended) && self.intended_config.is_none() {
            return Err(TaskError::InvalidParams {
                message: "diff_against is intended but all of the following are missing: intended_config"
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn candidate(&self) -> Option<String> {
        match (&self.src, &self.lines) {
            (Some(src), _) => Some(src.clone()),
            (None, Some(lines)) if !lines.is_empty() => Some(lines.join("\n")),
            _ => None,
        }
    }

    fn ignore_lines(&self) -> impl Iterator<Item = &str> {
        self.diff_ignore_lines.iter().flatten().map(String::as_str)
    }
}

/// Before and after configuration text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigResult {
    pub changed: bool,
    /// Commands sent, or that would be sent in check mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<TextDiff>,
}

/// Running configurations read during one task run, keyed by flags.
#[derive(Debug, Default)]
pub struct ConfigCache {
    configs: HashMap<String, String>,
    warnings: Vec<String>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the running configuration with `flags`, at most once per key.
    ///
    /// When the device refuses a trailing `section` filter the read is
    /// retried without it; the result is still stored under the original
    /// flags.
    pub async fn get<T: Transport>(
        &mut self,
        driver: &mut GenericDriver<T>,
        flags: &[String],
    ) -> Result<String> {
        let key = flags.join(" ");
        if let Some(config) = self.configs.get(&key) {
            debug!("running config for {:?} served from cache", key);
            return Ok(config.clone());
        }

        let mut flags = flags.to_vec();
        let config = loop {
            match driver.get_config(ConfigSource::Running, ConfigFormat::Text, &flags).await {
                Ok(config) => break config,
                Err(err) if flags.last().is_some_and(|f| f.contains("section")) => {
                    let dropped = flags.pop().unwrap_or_default();
                    warn!("section filter {:?} rejected ({}), reading without it", dropped, err);
                    self.warnings
                        .push(format!("section filter '{}' not supported, read the full configuration", dropped));
                }
                Err(err) => return Err(err),
            }
        };

        let config = config.trim().to_string();
        self.configs.insert(key, config.clone());
        Ok(config)
    }

    /// Warnings raised by reads so far.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Converge the device toward the candidate in `params`.
pub async fn run<T: Transport>(
    driver: &mut GenericDriver<T>,
    params: &ConfigParams,
    context: &TaskContext,
) -> Result<ConfigResult> {
    params.validate()?;
    driver.become_privileged().await?;

    let mut result = ConfigResult::default();
    let mut cache = ConfigCache::new();
    let commands = driver.platform().commands.clone();
    let parse_options =
        ParseOptions::new(driver.platform().config_syntax).with_ignore_lines(params.ignore_lines());
    let flags: Vec<String> = if params.defaults {
        driver.get_defaults_flag().map(str::to_string).into_iter().collect()
    } else {
        vec![]
    };

    // Snapshot taken before any change.
    let mut snapshot = None;
    if params.backup || (context.diff_mode && params.diff_against == Some(DiffAgainst::Running)) {
        let config = cache.get(driver, &flags).await?;
        if params.backup {
            let info = write_backup(&config, &context.host, &params.backup_options, Local::now()).await?;
            result.backup = Some(info);
        }
        snapshot = Some(config);
    }

    if let Some(candidate) = params.candidate() {
        let running = match &params.running_config {
            Some(running) => running.clone(),
            None => cache.get(driver, &flags).await?,
        };
        let request = DiffRequest {
            candidate,
            running: Some(running),
            match_policy: params.match_policy,
            replace: None,
            ignore_lines: params.diff_ignore_lines.clone(),
            path: vec![],
            before: params.before.clone(),
            after: params.after.clone(),
        };
        let diff = driver.get_diff(&request)?;

        if !diff.is_empty() {
            let updates: Vec<String> = diff.commands().into_iter().map(str::to_string).collect();

            if !context.check_mode {
                let requests: Vec<CommandRequest> =
                    updates.iter().map(|c| CommandRequest::new(c.as_str())).collect();
                driver.edit_config(&requests, &EditOptions::default()).await?;
            }
            info!("{} configuration update(s)", updates.len());
            result.commands = updates.clone();
            result.updates = updates;
            result.changed = true;
        }
    }
    result.warnings.extend(cache.take_warnings());

    let mut running_text = params.running_config.clone();
    let mut startup_text = None;
    let save = match params.save_when {
        SaveWhen::Always => true,
        SaveWhen::Never => false,
        SaveWhen::Changed => result.changed,
        SaveWhen::Modified => {
            let outputs = driver
                .run_commands(
                    &[
                        CommandRequest::new(commands.show_running.as_str()),
                        CommandRequest::new(commands.show_startup.as_str()),
                    ],
                    true,
                )
                .await?;
            let [running, startup]: [String; 2] = outputs.try_into().map_err(|_| {
                TaskError::UnparsableOutput {
                    message: "expected running and startup configuration".to_string(),
                }
            })?;
            let modified = ConfigTree::parse(&running, &parse_options)?.fingerprint()
                != ConfigTree::parse(&startup, &parse_options)?.fingerprint();
            running_text = Some(running);
            startup_text = Some(startup);
            modified
        }
    };
    if save {
        result.changed = true;
        if context.check_mode {
            result
                .warnings
                .push("configuration not saved in check mode".to_string());
        } else {
            driver
                .run_commands(&[CommandRequest::new(commands.save.as_str())], true)
                .await?;
            info!("running configuration saved");
        }
    }

    if context.diff_mode {
        let current = match running_text {
            Some(text) => text,
            None => show(driver, &commands.show_running).await?,
        };
        let running_tree = ConfigTree::parse(&current, &parse_options)?;

        let base = match params.diff_against {
            Some(DiffAgainst::Running) if context.check_mode => {
                let message = "unable to perform diff against running-config due to check mode";
                warn!("{}", message);
                result.warnings.push(message.to_string());
                None
            }
            Some(DiffAgainst::Running) => snapshot,
            Some(DiffAgainst::Startup) => match startup_text {
                Some(text) => Some(text),
                None => Some(show(driver, &commands.show_startup).await?),
            },
            Some(DiffAgainst::Intended) => params.intended_config.clone(),
            None => None,
        };

        if let Some(base) = base {
            let base_tree = ConfigTree::parse(&base, &parse_options)?;
            if running_tree.fingerprint() != base_tree.fingerprint() {
                let (before, after) = match params.diff_against {
                    Some(DiffAgainst::Intended) => (running_tree, base_tree),
                    _ => (base_tree, running_tree),
                };
                result.changed = true;
                result.diff = Some(TextDiff {
                    before: before.to_text(),
                    after: after.to_text(),
                });
            }
        }
    }

    Ok(result)
}

async fn show<T: Transport>(driver: &mut GenericDriver<T>, command: &str) -> Result<String> {
    let outputs = driver
        .run_commands(&[CommandRequest::new(command)], true)
        .await?;
    Ok(outputs.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::driver::generic::tests::{ADMIN, CONFIG, driver, session};
    use crate::error::Error;

    fn lines(lines: &[&str]) -> ConfigParams {
        ConfigParams {
            lines: Some(lines.iter().map(|l| l.to_string()).collect()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pushes_missing_lines() {
        let transport = session(ADMIN)
            .reply("show running-config", "ether 1 1 vlan untag 1", ADMIN)
            .reply("configure", "", CONFIG)
            .reply("ether 1 1 description foo", "", CONFIG)
            .reply("commit", "", CONFIG)
            .reply("end", "", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = lines(&["ether 1 1 description foo", "ether 1 1 vlan untag 1"]);
        let result = run(&mut driver, &params, &TaskContext::default()).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.commands, vec!["ether 1 1 description foo"]);
        assert_eq!(result.updates, result.commands);
    }

    #[tokio::test]
    async fn test_check_mode_reports_without_loading() {
        let transport = session(ADMIN);
        let sent = transport.sent_log();
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let mut params = lines(&["ether 1 1 description foo"]);
        params.running_config = Some(String::new());
        params.before = vec!["lan 0 disable".to_string()];
        let context = TaskContext::default().check_mode(true);

        let result = run(&mut driver, &params, &context).await.unwrap();
        assert!(result.changed);
        assert_eq!(
            result.commands,
            vec!["lan 0 disable", "ether 1 1 description foo"]
        );
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_do_is_unchanged() {
        let transport = session(ADMIN).reply(
            "show running-config",
            "ether 1 1 description foo",
            ADMIN,
        );
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let result = run(
            &mut driver,
            &lines(&["ether 1 1 description foo"]),
            &TaskContext::default(),
        )
        .await
        .unwrap();
        assert!(!result.changed);
        assert!(result.commands.is_empty());
    }

    #[tokio::test]
    async fn test_lines_and_src_are_exclusive() {
        let mut driver = driver(session(ADMIN));
        driver.open().await.unwrap();

        let mut params = lines(&["a"]);
        params.src = Some("a".to_string());
        let err = run(&mut driver, &params, &TaskContext::default()).await.unwrap_err();
        assert!(matches!(err, Error::Task(TaskError::InvalidParams { .. })));
        assert_eq!(err.to_string(), "Task error: parameters are mutually exclusive: lines|src");
    }

    #[test]
    fn test_intended_diff_requires_intended_config() {
        let params = ConfigParams {
            diff_against: Some(DiffAgainst::Intended),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_when_modified_compares_fingerprints() {
        let transport = session(ADMIN)
            .reply("show running-config", "a\r\nb", ADMIN)
            .reply("show startup-config", "a", ADMIN)
            .reply("save", "", ADMIN);
        let sent = transport.sent_log();
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = ConfigParams {
            save_when: SaveWhen::Modified,
            ..Default::default()
        };
        let result = run(&mut driver, &params, &TaskContext::default()).await.unwrap();
        assert!(result.changed);
        assert_eq!(sent.lock().unwrap().last().map(String::as_str), Some("save"));
    }

    #[tokio::test]
    async fn test_save_when_modified_skips_identical_configs() {
        let transport = session(ADMIN)
            .reply("show running-config", "a\r\nb", ADMIN)
            .reply("show startup-config", "a\r\n\r\nb", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = ConfigParams {
            save_when: SaveWhen::Modified,
            ..Default::default()
        };
        let result = run(&mut driver, &params, &TaskContext::default()).await.unwrap();
        assert!(!result.changed);
    }

    #[tokio::test]
    async fn test_diff_against_intended() {
        let transport = session(ADMIN).reply("show running-config", "a\r\nb", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = ConfigParams {
            diff_against: Some(DiffAgainst::Intended),
            intended_config: Some("a\nc".to_string()),
            ..Default::default()
        };
        let context = TaskContext::default().diff_mode(true);
        let result = run(&mut driver, &params, &context).await.unwrap();
        assert_eq!(
            result.diff,
            Some(TextDiff {
                before: "a\nb".to_string(),
                after: "a\nc".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_diff_against_running_in_check_mode_warns() {
        let transport = session(ADMIN).reply("show running-config", "a", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = ConfigParams {
            running_config: Some("a".to_string()),
            diff_against: Some(DiffAgainst::Running),
            ..Default::default()
        };
        let context = TaskContext::default().diff_mode(true).check_mode(true);
        let result = run(&mut driver, &params, &context).await.unwrap();
        assert!(result.diff.is_none());
        assert_eq!(
            result.warnings,
            vec!["unable to perform diff against running-config due to check mode"]
        );
    }

    #[tokio::test]
    async fn test_backup_writes_running_config() {
        let root = tempfile::tempdir().unwrap();
        let transport = session(ADMIN).reply("show running-config", "a\r\nb", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let params = ConfigParams {
            backup: true,
            backup_options: BackupOptions {
                filename: Some("edge01.cfg".to_string()),
                dir_path: Some(root.path().to_path_buf()),
                append_eof: false,
            },
            ..Default::default()
        };
        let result = run(&mut driver, &params, &TaskContext::new("edge01")).await.unwrap();
        let backup = result.backup.unwrap();
        assert_eq!(std::fs::read_to_string(backup.backup_path).unwrap(), "a\nb");
        assert!(!result.changed);
    }

    #[tokio::test]
    async fn test_cache_reads_each_flag_set_once() {
        let transport = session(ADMIN)
            .reply("show running-config section lan", "<ERROR> invalid parameter", ADMIN)
            .reply("show running-config", "lan 0 ip dhcp service server", ADMIN);
        let sent = transport.sent_log();
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let mut cache = ConfigCache::new();
        let flags = vec!["section lan".to_string()];
        let first = cache.get(&mut driver, &flags).await.unwrap();
        let second = cache.get(&mut driver, &flags).await.unwrap();
        assert_eq!(first, "lan 0 ip dhcp service server");
        assert_eq!(first, second);
        assert_eq!(sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_section_filter_is_reported() {
        let transport = session(ADMIN)
            .reply("show running-config section lan", "<ERROR> invalid parameter", ADMIN)
            .reply("show running-config", "lan 0 ip dhcp service server", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let mut cache = ConfigCache::new();
        cache.get(&mut driver, &["section lan".to_string()]).await.unwrap();
        assert_eq!(
            cache.take_warnings(),
            vec!["section filter 'section lan' not supported, read the full configuration"]
        );
        assert!(cache.take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_before_and_after_need_updates() {
        let mut driver = driver(session(ADMIN));
        driver.open().await.unwrap();

        let mut params = lines(&["ether 1 1 description foo"]);
        params.running_config = Some("ether 1 1 description foo".to_string());
        params.before = vec!["lan 0 disable".to_string()];
        params.after = vec!["lan 0 enable".to_string()];

        let result = run(&mut driver, &params, &TaskContext::default()).await.unwrap();
        assert!(!result.changed);
        assert!(result.commands.is_empty());
    }

    #[test]
    fn test_params_deserialize() {
        let params: ConfigParams = serde_json::from_str(
            r#"{"commands": ["a"], "match": "none", "save_when": "changed",
                "diff_against": "startup", "config": "b"}"#,
        )
        .unwrap();
        assert_eq!(params.lines, Some(vec!["a".to_string()]));
        assert_eq!(params.match_policy, MatchPolicy::None);
        assert_eq!(params.save_when, SaveWhen::Changed);
        assert_eq!(params.diff_against, Some(DiffAgainst::Startup));
        assert_eq!(params.running_config.as_deref(), Some("b"));
    }
}
