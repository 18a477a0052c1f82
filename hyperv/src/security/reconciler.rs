//! Reconciliation of a VM's security settings against the host.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::command::RemoteCommand;
use super::types::VmSecurity;
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;

/// Client interface for the `vm_security` sub-resource of a VM.
///
/// Implementors supply the single-setting primitives; the collection-shaped
/// methods are built on top of them and enforce one setting per VM.
#[async_trait]
pub trait VmSecurityClient: Send + Sync {
    /// Overwrite the VM's security settings with `security`.
    async fn create_or_update(&self, vm_name: &str, security: &VmSecurity) -> Result<()>;

    /// Read the VM's security settings, `None` when the host has no object.
    async fn find(&self, vm_name: &str) -> Result<Option<VmSecurity>>;

    /// Read the VM's security settings.
    ///
    /// A missing object reads as all flags false; use [`Self::find`] to tell
    /// the two apart.
    async fn get(&self, vm_name: &str) -> Result<VmSecurity> {
        Ok(self
            .find(vm_name)
            .await?
            .unwrap_or_else(|| VmSecurity::new(vm_name)))
    }

    /// Read the settings as a one-element collection.
    async fn get_all(&self, vm_name: &str) -> Result<Vec<VmSecurity>> {
        let security = self.get(vm_name).await?;
        Ok(vec![security])
    }

    /// Empty collection, for VMs whose security block is not managed.
    fn no_securities(&self) -> Vec<VmSecurity> {
        Vec::new()
    }

    /// Apply a collection of at most one setting.
    ///
    /// An empty collection leaves the host untouched. More than one setting
    /// fails before anything is sent.
    async fn create_or_update_all(&self, vm_name: &str, securities: &[VmSecurity]) -> Result<()> {
        match securities {
            [] => Ok(()),
            [security] => self.create_or_update(vm_name, security).await,
            _ => Err(Error::TooManySettings {
                vm_name: vm_name.to_string(),
                count: securities.len(),
            }),
        }
    }
}

/// [`VmSecurityClient`] that plans [`RemoteCommand`]s and hands them to an
/// executor.
#[derive(Debug, Clone)]
pub struct SecurityReconciler<E> {
    executor: E,
}

impl<E: RemoteExecutor> SecurityReconciler<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

fn validate_vm_name(vm_name: &str) -> Result<()> {
    if vm_name.trim().is_empty() {
        return Err(Error::validation("vm_name", "VM name must not be empty"));
    }
    Ok(())
}

/// Decode a `GetSecurity` response. `null` and `{}` mean no object.
fn decode_security(vm_name: &str, value: Value) -> Result<Option<VmSecurity>> {
    let is_absent = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if is_absent {
        return Ok(None);
    }

    let raw = value.to_string();
    let mut security: VmSecurity =
        serde_json::from_value(value).map_err(|e| Error::decode(e.to_string(), &raw))?;
    security.vm_name = vm_name.to_string();
    Ok(Some(security))
}

#[async_trait]
impl<E: RemoteExecutor> VmSecurityClient for SecurityReconciler<E> {
    async fn create_or_update(&self, vm_name: &str, security: &VmSecurity) -> Result<()> {
        validate_vm_name(vm_name)?;

        let desired = VmSecurity {
            vm_name: vm_name.to_string(),
            ..security.clone()
        };
        let command = RemoteCommand::create_or_update(&desired);
        debug!(
            vm = vm_name,
            operations = command.operations.len(),
            tpm_enabled = desired.tpm_enabled,
            shielded = desired.shielded,
            "dispatching {}",
            command.name
        );

        self.executor.run_fire_and_forget(&command).await
    }

    async fn find(&self, vm_name: &str) -> Result<Option<VmSecurity>> {
        validate_vm_name(vm_name)?;

        let command = RemoteCommand::get(vm_name);
        debug!(vm = vm_name, "dispatching {}", command.name);

        let value = self.executor.run_with_result(&command).await?;
        decode_security(vm_name, value)
    }
}
