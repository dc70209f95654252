//! Error types for sirconf.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::task::ping::PingStats;

/// Main error type for sirconf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Byte transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/profile errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Configuration parsing errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Conditional evaluation errors
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// Task-level errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Peer closed the byte stream
    #[error("Connection disconnected")]
    Disconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, output collection).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Nothing more will arrive on the channel
    #[error("Channel closed")]
    Closed,

    /// Device reported an error marker in its output
    #[error("{output}")]
    ErrorMarker { output: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, privilege changes).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Device rejected a command
    #[error("command '{command}' failed: {output}")]
    CommandFailed { command: String, output: String },

    /// Session setup command was refused
    #[error("unable to set terminal parameters ({command}): {reason}")]
    TerminalSetup { command: String, reason: String },

    /// Could not switch to the administrative class
    #[error("failed to switch admin class, at prompt [{prompt}] with error: {message}")]
    ElevationFailed { prompt: String, message: String },

    /// Device asked for an answer nobody supplied
    #[error("prompt '{prompt}' requires an answer but none was configured")]
    MissingAnswer { prompt: String },

    /// Commit was refused; pending changes were discarded
    #[error("commit failed: {message}")]
    CommitFailed { message: String },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

/// Platform/profile errors, including capability checks.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// Platform name not known
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// Option value outside the supported set
    #[error("'{option}' value {value} is not supported, valid values are {supported}")]
    UnsupportedValue {
        option: &'static str,
        value: String,
        supported: String,
    },

    /// Operation the profile does not offer
    #[error("{operation} is not supported")]
    UnsupportedOperation { operation: String },

    /// Malformed option value
    #[error("{message}")]
    InvalidValue { message: String },
}

/// Configuration text parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Dedent that does not return to an enclosing level
    #[error("malformed indentation at line {line_number}: '{line}'")]
    MalformedIndentation { line_number: usize, line: String },
}

/// Conditional expression errors.
#[derive(Error, Debug)]
pub enum ConditionError {
    /// Expression text could not be parsed
    #[error("failed to parse conditional '{expression}': {message}")]
    Parse { expression: String, message: String },

    /// Expression refers to a response that does not exist
    #[error("conditional '{expression}' refers to result[{index}] but only {len} response(s) exist")]
    IndexOutOfRange {
        expression: String,
        index: usize,
        len: usize,
    },

    /// Retries exhausted with conditions still pending
    #[error("One or more conditional statements have not been satisfied")]
    Timeout {
        failed: Vec<String>,
        passed: Vec<String>,
        responses: Vec<String>,
    },
}

/// Task-level errors.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Invalid parameter combination
    #[error("{message}")]
    InvalidParams { message: String },

    /// Device output did not have the expected shape
    #[error("unable to parse output: {message}")]
    UnparsableOutput { message: String },

    /// Ping result contradicted the requested state
    #[error("{message}")]
    PingFailed {
        message: String,
        stats: Box<PingStats>,
    },

    /// Writing the backup file failed
    #[error("unable to write backup to {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        ChannelError::InvalidPattern(err).into()
    }
}

/// Result type alias using sirconf's Error.
pub type Result<T> = std::result::Result<T, Error>;
