//! Builder for creating device drivers.

use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::channel::PtyConfig;
use crate::error::{DriverError, Result};
use crate::platform::{Platform, PlatformDefinition};
use crate::transport::Transport;

/// Builder for [`GenericDriver`].
///
/// ```rust,no_run
/// use sirconf::{Driver, DriverBuilder, Platform};
/// use sirconf::transport::StreamTransport;
///
/// # async fn example(stream: tokio::net::TcpStream) -> Result<(), sirconf::Error> {
/// let mut driver = DriverBuilder::new()
///     .platform(Platform::FujitsuSir)
///     .become_password("secret")
///     .build(StreamTransport::new(stream))?;
///
/// driver.open().await?;
/// let config = driver.get_config(Default::default(), Default::default(), &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    platform: Option<Platform>,
    custom_platform: Option<PlatformDefinition>,
    timeout: Duration,
    search_depth: usize,
    newline: String,
    become_password: Option<SecretString>,
}

impl DriverBuilder {
    pub fn new() -> Self {
        let defaults = PtyConfig::default();
        Self {
            platform: None,
            custom_platform: None,
            timeout: defaults.timeout,
            search_depth: defaults.search_depth,
            newline: defaults.newline,
            become_password: None,
        }
    }

    /// Use a built-in profile.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Use a hand-built profile. Takes precedence over [`Self::platform`].
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// How long to wait for a prompt (default: 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How many trailing bytes are searched for a prompt (default: 1000).
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Password for entering the admin class.
    pub fn become_password(mut self, password: impl Into<String>) -> Self {
        self.become_password = Some(SecretString::from(password.into()));
        self
    }

    /// Build a driver over `transport`. The session is not opened.
    pub fn build<T: Transport>(self, transport: T) -> Result<GenericDriver<T>> {
        if self.search_depth == 0 {
            return Err(DriverError::InvalidConfig {
                message: "search depth must be greater than zero".to_string(),
            }
            .into());
        }

        let platform = match (self.custom_platform, self.platform) {
            (Some(custom), _) => custom,
            (None, Some(platform)) => platform.definition()?,
            (None, None) => {
                return Err(DriverError::InvalidConfig {
                    message: "a platform is required".to_string(),
                }
                .into());
            }
        };

        let config = PtyConfig {
            timeout: self.timeout,
            search_depth: self.search_depth,
            newline: self.newline,
        };
        let mut driver = GenericDriver::new(transport, platform, config)?;
        if let Some(password) = self.become_password {
            driver.set_become_password(password);
        }
        Ok(driver)
    }
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
