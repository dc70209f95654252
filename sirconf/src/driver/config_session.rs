//! Configuration sessions as consumable guards.
//!
//! A session holds `&mut GenericDriver` for its whole life, so nothing else
//! can talk to the device while configuration mode is open. `commit()`,
//! `abort()` and `detach()` take the session by value.
//!
//! ```rust,no_run
//! use sirconf::driver::{ConfigSession, GenericConfigSession, GenericDriver};
//! use sirconf::transport::Transport;
//!
//! # async fn example<T: Transport>(driver: &mut GenericDriver<T>) -> Result<(), sirconf::Error> {
//! let mut session = GenericConfigSession::new(driver).await?;
//! session.send_command("lan 0 ip address 192.168.1.1/24 3").await?;
//! session.commit().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use log::warn;

use super::Driver;
use super::generic::GenericDriver;
use super::request::CommandRequest;
use super::response::Response;
use crate::error::{DriverError, Error, Result};
use crate::platform::SessionMode;
use crate::transport::Transport;

/// Core configuration session operations.
pub trait ConfigSession: Send {
    fn send_command(&mut self, cmd: &str) -> impl Future<Output = Result<Response>> + Send;

    fn send_request(
        &mut self,
        request: &CommandRequest,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Commit and return to the admin class. A refused commit discards the
    /// pending changes and fails with [`DriverError::CommitFailed`].
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    /// Discard pending changes and return to the admin class.
    fn abort(self) -> impl Future<Output = Result<()>> + Send;

    /// Release the guard and stay in configuration mode.
    fn detach(self) -> Result<()>;
}

/// Sessions whose commit can be made provisional.
pub trait ConfirmableCommit: ConfigSession {
    /// Commit with an automatic rollback after `timeout_minutes`.
    fn commit_confirmed(self, timeout_minutes: u32) -> impl Future<Output = Result<()>> + Send;
}

/// Configuration mode guard for the admin-class CLI.
pub struct GenericConfigSession<'a, T> {
    driver: &'a mut GenericDriver<T>,
    consumed: bool,
}

impl<'a, T: Transport> GenericConfigSession<'a, T> {
    /// Enter configuration mode, elevating first when needed.
    pub async fn new(driver: &'a mut GenericDriver<T>) -> Result<Self> {
        driver.become_privileged().await?;
        driver.acquire_privilege(SessionMode::Configuring).await?;
        Ok(Self {
            driver,
            consumed: false,
        })
    }

    /// Leave configuration mode without committing.
    pub async fn end(mut self) -> Result<()> {
        self.consumed = true;
        self.driver.acquire_privilege(SessionMode::Privileged).await
    }

    async fn finish(&mut self, timer: Option<u32>) -> Result<()> {
        self.consumed = true;
        if let Err(err) = self.driver.commit(None, timer).await {
            warn!("commit failed, discarding pending changes: {}", err);
            if let Err(discard) = self.driver.discard_changes().await {
                warn!("discard after failed commit also failed: {}", discard);
            }
            return Err(DriverError::CommitFailed {
                message: failure_text(err),
            }
            .into());
        }
        self.driver.acquire_privilege(SessionMode::Privileged).await
    }
}

/// Device text for a refused command, the error text otherwise.
fn failure_text(err: Error) -> String {
    match err {
        Error::Driver(DriverError::CommandFailed { output, .. }) => output,
        other => other.to_string(),
    }
}

impl<T: Transport> ConfigSession for GenericConfigSession<'_, T> {
    async fn send_command(&mut self, cmd: &str) -> Result<Response> {
        self.driver.send_command(cmd).await
    }

    async fn send_request(&mut self, request: &CommandRequest) -> Result<Response> {
        self.driver.send_request(request).await
    }

    async fn commit(mut self) -> Result<()> {
        self.finish(None).await
    }

    async fn abort(mut self) -> Result<()> {
        self.consumed = true;
        self.driver.discard_changes().await?;
        self.driver.acquire_privilege(SessionMode::Privileged).await
    }

    fn detach(mut self) -> Result<()> {
        self.consumed = true;
        Ok(())
    }
}

impl<T: Transport> ConfirmableCommit for GenericConfigSession<'_, T> {
    async fn commit_confirmed(mut self, timeout_minutes: u32) -> Result<()> {
        self.finish(Some(timeout_minutes)).await
    }
}

impl<T> Drop for GenericConfigSession<'_, T> {
    fn drop(&mut self) {
        if !self.consumed {
            warn!("configuration session dropped without commit(), abort() or detach()");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::generic::tests::{ADMIN, CONFIG, NORMAL, driver, session};

    #[tokio::test]
    async fn test_commit_returns_to_admin_class() {
        let transport = session(ADMIN)
            .reply("configure", "", CONFIG)
            .reply("lan 0 ip address 192.168.1.1/24 3", "", CONFIG)
            .reply("commit", "", CONFIG)
            .reply("end", "", ADMIN);
        let sent = transport.sent_log();
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let mut session = GenericConfigSession::new(&mut driver).await.unwrap();
        session
            .send_command("lan 0 ip address 192.168.1.1/24 3")
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert_eq!(driver.current_mode(), Some(SessionMode::Privileged));
        assert_eq!(sent.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_new_elevates_from_normal_mode() {
        let transport = session(NORMAL)
            .chunks("admin", &["admin\r\nPassword: "])
            .reply("secret", "", ADMIN)
            .reply("configure", "", CONFIG)
            .reply("end", "", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let session = GenericConfigSession::new(&mut driver).await.unwrap();
        session.end().await.unwrap();
        assert_eq!(driver.current_mode(), Some(SessionMode::Privileged));
    }

    #[tokio::test]
    async fn test_refused_commit_discards_changes() {
        let transport = session(ADMIN)
            .reply("configure", "", CONFIG)
            .reply("commit", "<ERROR> configuration is inconsistent", CONFIG)
            .reply("discard", "", CONFIG);
        let sent = transport.sent_log();
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let session = GenericConfigSession::new(&mut driver).await.unwrap();
        let err = session.commit().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Driver error: commit failed: <ERROR> configuration is inconsistent"
        );
        assert_eq!(sent.lock().unwrap().last().map(String::as_str), Some("discard"));
        assert_eq!(driver.current_mode(), Some(SessionMode::Configuring));
    }

    #[tokio::test]
    async fn test_commit_confirmed_uses_timer_command() {
        let transport = session(ADMIN)
            .reply("configure", "", CONFIG)
            .reply("commit try time 5m", "", CONFIG)
            .reply("end", "", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let session = GenericConfigSession::new(&mut driver).await.unwrap();
        session.commit_confirmed(5).await.unwrap();
    }

    #[tokio::test]
    async fn test_abort_discards() {
        let transport = session(ADMIN)
            .reply("configure", "", CONFIG)
            .reply("discard", "", CONFIG)
            .reply("end", "", ADMIN);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let session = GenericConfigSession::new(&mut driver).await.unwrap();
        session.abort().await.unwrap();
        assert_eq!(driver.current_mode(), Some(SessionMode::Privileged));
    }

    #[tokio::test]
    async fn test_detach_stays_in_configuration_mode() {
        let transport = session(ADMIN).reply("configure", "", CONFIG);
        let mut driver = driver(transport);
        driver.open().await.unwrap();

        let session = GenericConfigSession::new(&mut driver).await.unwrap();
        session.detach().unwrap();
        assert_eq!(driver.current_mode(), Some(SessionMode::Configuring));
    }
}
