//! Ping diagnostics: command construction, output parsing, outcome check.

use std::net::IpAddr;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::OutputParser;
use crate::condition::CommandRunner;
use crate::driver::CommandRequest;
use crate::error::{Result, TaskError};

/// Address family hint for destinations given by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Afi {
    Ip,
    Ipv6,
}

/// Whether the destination is expected to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingState {
    #[default]
    Present,
    Absent,
}

fn default_count() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingParams {
    pub dest: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub afi: Option<Afi>,
    #[serde(default)]
    pub df_bit: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub state: PingState,
}

impl PingParams {
    pub fn new(dest: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            count: default_count(),
            afi: None,
            df_bit: false,
            source: None,
            size: None,
            timeout: None,
            ttl: None,
            state: PingState::Present,
        }
    }

    /// The device command for these parameters.
    ///
    /// The address family suffix is only added for destinations that are
    /// not literal addresses.
    pub fn command(&self) -> String {
        let mut cmd = format!("ping {}", self.dest);
        if self.dest.parse::<IpAddr>().is_err() {
            match self.afi {
                Some(Afi::Ip) => cmd.push_str(" v4"),
                Some(Afi::Ipv6) => cmd.push_str(" v6"),
                None => {}
            }
        }
        if let Some(source) = &self.source {
            cmd.push_str(&format!(" source {}", source));
        }
        cmd.push_str(&format!(" repeat {}", self.count));
        if let Some(size) = self.size.filter(|&s| s > 0) {
            cmd.push_str(&format!(" size {}", size));
        }
        if let Some(ttl) = self.ttl.filter(|&t| t > 0) {
            cmd.push_str(&format!(" ttl {}", ttl));
        }
        if let Some(timeout) = self.timeout.filter(|&t| t > 0) {
            cmd.push_str(&format!(" timeout {}", timeout));
        }
        if self.df_bit {
            cmd.push_str(" df");
        }
        cmd
    }
}

/// Round-trip times in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rtt {
    pub min: u32,
    pub avg: u32,
    pub max: u32,
}

/// Statistics from a ping run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingStats {
    /// Loss as the device reports it, e.g. `"20%"`.
    pub packet_loss: String,
    pub packets_rx: u32,
    pub packets_tx: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt: Option<Rtt>,
    #[serde(skip)]
    pub loss: u32,
}

/// Parses the summary lines of the device's ping output.
#[derive(Debug, Clone)]
pub struct PingParser {
    count: u32,
    rate: Regex,
    rtt: Regex,
}

impl PingParser {
    /// `count` is the repeat count the ping was sent with.
    pub fn new(count: u32) -> Result<Self> {
        Ok(Self {
            count,
            rate: Regex::new(
                r"^(\d+) packets transmitted, (\d+) packets received, (\d+)% packet loss",
            )?,
            rtt: Regex::new(
                r"^round-trip \(ms\)\s+min/ave/max = (\d+)(?:\.\d*)?/(\d+)(?:\.\d*)?/(\d+)(?:\.\d*)?",
            )?,
        })
    }
}

fn number(text: &str) -> Result<u32> {
    text.parse().map_err(|_| {
        TaskError::UnparsableOutput {
            message: format!("'{}' is not a number", text),
        }
        .into()
    })
}

impl OutputParser for PingParser {
    type Output = PingStats;

    fn parse(&self, raw: &str) -> Result<PingStats> {
        let rate_prefix = format!("{} packets transmitted", self.count);
        let mut rate_line = None;
        let mut rtt_line = None;
        for line in raw.lines().map(str::trim) {
            if line.starts_with("round-trip") {
                rtt_line = Some(line);
            }
            if line.starts_with(&rate_prefix) {
                rate_line = Some(line);
            }
        }

        let rate = rate_line
            .and_then(|line| self.rate.captures(line))
            .ok_or_else(|| TaskError::UnparsableOutput {
                message: format!("no '{}' summary in ping output", rate_prefix),
            })?;
        let loss = number(&rate[3])?;

        let rtt = match rtt_line.and_then(|line| self.rtt.captures(line)) {
            Some(caps) => Some(Rtt {
                min: number(&caps[1])?,
                avg: number(&caps[2])?,
                max: number(&caps[3])?,
            }),
            None => None,
        };

        Ok(PingStats {
            packet_loss: format!("{}%", loss),
            packets_rx: number(&rate[2])?,
            packets_tx: number(&rate[1])?,
            rtt,
            loss,
        })
    }
}

/// Outcome of a ping task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingResult {
    pub commands: String,
    #[serde(flatten)]
    pub stats: PingStats,
}

/// Fail when the statistics contradict the expected state.
pub fn validate(state: PingState, stats: PingStats) -> Result<PingStats> {
    let message = match state {
        PingState::Present if stats.loss == 100 => "Ping failed unexpectedly",
        PingState::Absent if stats.loss < 100 => "Ping succeeded unexpectedly",
        _ => return Ok(stats),
    };
    Err(TaskError::PingFailed {
        message: message.to_string(),
        stats: Box::new(stats),
    }
    .into())
}

/// Ping from the device and check the result against `params.state`.
pub async fn run<R: CommandRunner>(runner: &mut R, params: &PingParams) -> Result<PingResult> {
    let command = params.command();
    debug!("running {:?}", command);
    let output = runner
        .run_batch(&[CommandRequest::new(command.as_str())])
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();

    let stats = PingParser::new(params.count)?.parse(&output)?;
    let stats = validate(params.state, stats)?;
    Ok(PingResult {
        commands: command,
        stats,
    })
}
