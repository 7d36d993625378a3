//! Remote shell port.
//!
//! The inspection runner depends only on these traits; the SSH adapter lives in
//! `patrol-core`, and tests plug in scripted fakes.

use async_trait::async_trait;

use crate::config::Credentials;
use crate::device::Device;
use crate::error::InspectError;

/// Opens interactive sessions to devices.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Establishes one authenticated session, ready to accept commands.
    ///
    /// Any failure here is reported as [`InspectError::Connection`].
    async fn open(
        &self,
        device: &Device,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, InspectError>;
}

/// An open session owned exclusively by one device task.
///
/// Dropping a session must release its socket, so an unwinding task never leaks it.
#[async_trait]
pub trait RemoteSession: Send {
    /// Sends `command` and returns its cleaned output once the prompt reappears.
    async fn execute(&mut self, command: &str) -> Result<String, InspectError>;

    /// Ends the session. Called exactly once on every exit path of a device run.
    async fn close(&mut self) -> Result<(), InspectError>;
}
