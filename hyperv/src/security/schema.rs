//! Bridge between the declarative `vm_security` block and [`VmSecurity`].
//!
//! The block is a list of maps keyed by the snake_case names below.

use serde_json::{Map, Value};
use tracing::debug;

use super::types::VmSecurity;
use crate::error::{Error, Result};

/// Name of the block in the declarative configuration.
pub const VM_SECURITY_BLOCK: &str = "vm_security";

pub const KEY_ENCRYPT_STATE_AND_VM_MIGRATION_TRAFFIC: &str =
    "encrypt_state_and_vm_migration_traffic";
pub const KEY_VIRTUALIZATION_BASED_SECURITY_OPTOUT: &str = "virtualization_based_security_optout";
pub const KEY_TPM_ENABLED: &str = "tpm_enabled";
pub const KEY_SHIELDED: &str = "shielded";
pub const KEY_BIND_TO_HOST_TPM: &str = "bind_to_host_tpm";

fn read_flag(entry: &Map<String, Value>, key: &'static str) -> Result<bool> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::validation(
            VM_SECURITY_BLOCK,
            format!("'{key}' should be a bool - was '{other}'"),
        )),
    }
}

fn expand_entry(entry: &Value) -> Result<VmSecurity> {
    let Some(entry) = entry.as_object() else {
        return Err(Error::validation(
            VM_SECURITY_BLOCK,
            format!("vm_security should be a Hash - was '{entry}'"),
        ));
    };
    debug!(?entry, "expanding vm_security entry");

    Ok(VmSecurity {
        vm_name: String::new(),
        encrypt_state_and_vm_migration_traffic: read_flag(
            entry,
            KEY_ENCRYPT_STATE_AND_VM_MIGRATION_TRAFFIC,
        )?,
        virtualization_based_security_opt_out: read_flag(
            entry,
            KEY_VIRTUALIZATION_BASED_SECURITY_OPTOUT,
        )?,
        tpm_enabled: read_flag(entry, KEY_TPM_ENABLED)?,
        shielded: read_flag(entry, KEY_SHIELDED)?,
        bind_to_host_tpm: read_flag(entry, KEY_BIND_TO_HOST_TPM)?,
    })
}

/// Turn a `vm_security` block into settings.
///
/// An absent, `null` or empty block yields a single all-false setting, so the
/// VM is always reconciled to a known state.
pub fn expand_vm_securities(block: Option<&Value>) -> Result<Vec<VmSecurity>> {
    let mut expanded = match block {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(expand_entry)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(Error::validation(
                VM_SECURITY_BLOCK,
                format!("vm_security should be a list - was '{other}'"),
            ))
        }
    };

    if expanded.is_empty() {
        expanded.push(VmSecurity::default());
    }

    Ok(expanded)
}

/// Turn settings into a `vm_security` block, `None` when there are none.
pub fn flatten_vm_securities(securities: &[VmSecurity]) -> Option<Value> {
    if securities.is_empty() {
        return None;
    }

    let flattened = securities
        .iter()
        .map(|security| {
            let mut entry = Map::new();
            entry.insert(
                KEY_ENCRYPT_STATE_AND_VM_MIGRATION_TRAFFIC.to_string(),
                Value::Bool(security.encrypt_state_and_vm_migration_traffic),
            );
            entry.insert(
                KEY_VIRTUALIZATION_BASED_SECURITY_OPTOUT.to_string(),
                Value::Bool(security.virtualization_based_security_opt_out),
            );
            entry.insert(
                KEY_TPM_ENABLED.to_string(),
                Value::Bool(security.tpm_enabled),
            );
            entry.insert(KEY_SHIELDED.to_string(), Value::Bool(security.shielded));
            entry.insert(
                KEY_BIND_TO_HOST_TPM.to_string(),
                Value::Bool(security.bind_to_host_tpm),
            );
            Value::Object(entry)
        })
        .collect();

    Some(Value::Array(flattened))
}
