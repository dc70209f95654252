//! High-level driver for device interaction.
//!
//! The driver layer sends commands, tracks the session mode from prompts,
//! and implements the device operations (fetching, diffing and applying
//! configuration).

mod builder;
pub mod cliconf;
pub mod config_session;
pub(crate) mod generic;
mod privilege;
mod request;
pub(crate) mod response;

pub use builder::DriverBuilder;
pub use cliconf::{
    ConfigDiff, ConfigSource, DeviceInfo, DiffRequest, EditOptions, EditResponse, get_diff,
};
pub use config_session::{ConfigSession, ConfirmableCommit, GenericConfigSession};
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, Transition};
pub use request::{CommandRequest, Interaction};
pub use response::Response;

use std::future::Future;

use crate::error::Result;
use crate::platform::SessionMode;

/// Trait for device drivers.
pub trait Driver: Send {
    /// Read the initial prompt and prepare the terminal.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send a request, answering its prompt if the device shows it.
    fn send_request(
        &mut self,
        request: &CommandRequest,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Send multiple commands sequentially, stopping at the first failure.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for cmd in commands {
                responses.push(self.send_command(cmd).await?);
            }
            Ok(responses)
        }
    }

    /// Walk the session to `mode`, answering password prompts on the way.
    fn acquire_privilege(&mut self, mode: SessionMode) -> impl Future<Output = Result<()>> + Send;

    fn is_open(&self) -> bool;

    /// Mode implied by the last prompt, if it was recognised.
    fn current_mode(&self) -> Option<SessionMode>;
}
