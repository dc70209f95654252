//! Re-running a command batch until conditions hold.

use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use super::Conditional;
use crate::driver::CommandRequest;
use crate::error::{ConditionError, Result};

/// Whether all conditions or any single one must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMatch {
    #[default]
    All,
    Any,
}

/// Retry schedule for [`wait_for`].
#[derive(Debug, Clone)]
pub struct WaitPolicy {
    /// Extra rounds after the first one.
    pub retries: u32,
    /// Pause between rounds.
    pub interval: Duration,
    pub match_policy: WaitMatch,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            retries: 9,
            interval: Duration::from_secs(1),
            match_policy: WaitMatch::All,
        }
    }
}

/// Something that can execute a batch of commands and return their outputs.
pub trait CommandRunner: Send {
    fn run_batch(
        &mut self,
        commands: &[CommandRequest],
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Run `commands` until `conditions` hold or retries run out.
///
/// Each round runs the full batch and tests the still-pending conditions
/// against that round's responses. Returns the responses of the last
/// round. With `retries = N` at most `N + 1` rounds are executed and the
/// runner never sleeps after the final one.
pub async fn wait_for<R: CommandRunner>(
    runner: &mut R,
    commands: &[CommandRequest],
    conditions: &[Conditional],
    policy: &WaitPolicy,
) -> Result<Vec<String>> {
    let mut pending: Vec<&Conditional> = conditions.iter().collect();
    let mut passed: Vec<&Conditional> = Vec::new();
    let mut retries_left = policy.retries;

    loop {
        let responses = runner.run_batch(commands).await?;

        let mut still_pending = Vec::with_capacity(pending.len());
        let mut satisfied_any = false;
        for conditional in pending {
            if conditional.evaluate(&responses)? {
                satisfied_any = true;
                passed.push(conditional);
            } else {
                still_pending.push(conditional);
            }
        }
        if policy.match_policy == WaitMatch::Any && satisfied_any {
            still_pending.clear();
        }
        pending = still_pending;

        if pending.is_empty() {
            return Ok(responses);
        }

        if retries_left == 0 {
            return Err(ConditionError::Timeout {
                failed: pending.iter().map(|c| c.raw().to_string()).collect(),
                passed: passed.iter().map(|c| c.raw().to_string()).collect(),
                responses,
            }
            .into());
        }
        retries_left -= 1;

        debug!(
            "{} condition(s) not yet satisfied, retrying in {:?} ({} retries left)",
            pending.len(),
            policy.interval,
            retries_left
        );
        tokio::time::sleep(policy.interval).await;
    }
}
