//! Running commands, optionally until their output satisfies conditions.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use super::TaskContext;
use crate::condition::{CommandRunner, Conditional, WaitMatch, WaitPolicy, wait_for};
use crate::driver::CommandRequest;
use crate::error::Result;

fn default_retries() -> u32 {
    9
}

fn default_interval() -> u64 {
    1
}

/// Parameters of a command run.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandParams {
    pub commands: Vec<CommandRequest>,

    /// Conditions on the outputs, e.g. `result[0] contains up`.
    #[serde(default, alias = "waitfor")]
    pub wait_for: Vec<String>,

    #[serde(default, rename = "match")]
    pub match_policy: WaitMatch,

    /// Extra rounds when conditions are not yet met.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Seconds between rounds.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl CommandParams {
    pub fn new<I, C>(commands: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CommandRequest>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            wait_for: vec![],
            match_policy: WaitMatch::All,
            retries: default_retries(),
            interval: default_interval(),
        }
    }
}

/// Outputs of the last round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub stdout: Vec<String>,
    pub stdout_lines: Vec<Vec<String>>,
    pub warnings: Vec<String>,
}

/// Run the commands, retrying until the wait conditions hold.
///
/// In check mode only `show` commands are executed; the others are
/// reported in `warnings`.
pub async fn run<R: CommandRunner>(
    runner: &mut R,
    params: &CommandParams,
    context: &TaskContext,
) -> Result<CommandResult> {
    let conditions = params
        .wait_for
        .iter()
        .map(|expression| Conditional::parse(expression))
        .collect::<Result<Vec<_>>>()?;

    let mut warnings = Vec::new();
    let commands: Vec<CommandRequest> = params
        .commands
        .iter()
        .filter(|request| {
            if context.check_mode && !request.command.starts_with("show") {
                let message = format!(
                    "Only show commands are supported when using check mode, not executing {}",
                    request.command
                );
                warn!("{}", message);
                warnings.push(message);
                return false;
            }
            true
        })
        .cloned()
        .collect();

    let policy = WaitPolicy {
        retries: params.retries,
        interval: Duration::from_secs(params.interval),
        match_policy: params.match_policy,
    };
    let stdout = wait_for(runner, &commands, &conditions, &policy).await?;
    let stdout_lines = stdout
        .iter()
        .map(|out| out.lines().map(str::to_string).collect())
        .collect();

    Ok(CommandResult {
        stdout,
        stdout_lines,
        warnings,
    })
}
