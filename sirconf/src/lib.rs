//! # sirconf
//!
//! Async CLI driver and configuration reconciliation for Fujitsu Si-R and
//! Yamaha RTX routers.
//!
//! sirconf drives the router's interactive CLI over any established byte
//! stream, diffs block-structured configuration and loads only what is
//! missing, and offers task-level workflows for configuration, commands
//! and ping.
//!
//! ## Features
//!
//! - Prompt-driven session handling with admin-class elevation
//! - Block configuration model with line, strict, exact and no-op matching
//! - Commit, timed commit and discard on the router's configuration mode
//! - Wait-for conditions evaluated over command output
//! - Backups, save-on-change and before/after diffs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sirconf::{Driver, DriverBuilder, Platform, StreamTransport};
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sirconf::Error> {
//!     let stream = TcpStream::connect("192.168.1.1:23")
//!         .await
//!         .map_err(sirconf::error::TransportError::Io)?;
//!     let mut driver = DriverBuilder::new()
//!         .platform(Platform::FujitsuSir)
//!         .become_password("secret")
//!         .build(StreamTransport::new(stream))?;
//!
//!     driver.open().await?;
//!
//!     let response = driver.send_command("show date").await?;
//!     println!("{}", response.result);
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod condition;
pub mod config;
pub mod driver;
pub mod error;
pub mod platform;
pub mod task;
pub mod transport;

pub use driver::{CommandRequest, Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, Result};
pub use platform::{Platform, PlatformDefinition, PrivilegeLevel, SessionMode};
pub use transport::{StreamTransport, Transport};
