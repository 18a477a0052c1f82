//! Remote execution seam.
//!
//! The reconciler never talks to a host directly; it hands a
//! [`RemoteCommand`] to a [`RemoteExecutor`]. [`crate::PsExecutor`] is the
//! PowerShell implementation, tests plug in in-memory hosts.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::security::RemoteCommand;

/// Runs remote commands against a Hyper-V host.
///
/// Cancellation is by dropping the returned future.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command whose only outcome is success or failure.
    async fn run_fire_and_forget(&self, command: &RemoteCommand) -> Result<()>;

    /// Run a command and return the structured payload it produced.
    ///
    /// An empty response is returned as `Value::Null`.
    async fn run_with_result(&self, command: &RemoteCommand) -> Result<serde_json::Value>;
}

#[async_trait]
impl<E: RemoteExecutor + ?Sized> RemoteExecutor for Arc<E> {
    async fn run_fire_and_forget(&self, command: &RemoteCommand) -> Result<()> {
        (**self).run_fire_and_forget(command).await
    }

    async fn run_with_result(&self, command: &RemoteCommand) -> Result<serde_json::Value> {
        (**self).run_with_result(command).await
    }
}
