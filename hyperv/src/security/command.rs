//! Typed remote commands for VM security.
//!
//! A [`RemoteCommand`] is an ordered list of [`SecurityOperation`]s. The
//! order is the order the host must run them in; executors may not reorder.

use serde::{Deserialize, Serialize};

use super::types::VmSecurity;
use crate::error::{Error, Result};

/// Command name for the write path.
pub const CREATE_OR_UPDATE_VM_SECURITY: &str = "CreateOrUpdateVmSecurity";
/// Command name for the read path.
pub const GET_VM_SECURITY: &str = "GetVmSecurity";

/// Fields selected from the host object by [`SecurityOperation::GetSecurity`].
pub const SECURITY_FIELDS: [&str; 5] = [
    "EncryptStateAndVmMigrationTraffic",
    "VirtualizationBasedSecurityOptOut",
    "TpmEnabled",
    "Shielded",
    "BindToHostTpm",
];

/// A single host-side operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Operation")]
pub enum SecurityOperation {
    /// Create a new local key protector unless a non-empty one exists.
    EnsureLocalKeyProtector {
        #[serde(rename = "VmName")]
        vm_name: String,
    },
    EnableTpm {
        #[serde(rename = "VmName")]
        vm_name: String,
    },
    DisableTpm {
        #[serde(rename = "VmName")]
        vm_name: String,
    },
    SetSecurity {
        #[serde(rename = "VmName")]
        vm_name: String,
        #[serde(rename = "EncryptStateAndVmMigrationTraffic")]
        encrypt_state_and_vm_migration_traffic: bool,
        #[serde(rename = "VirtualizationBasedSecurityOptOut")]
        virtualization_based_security_opt_out: bool,
    },
    SetSecurityPolicy {
        #[serde(rename = "VmName")]
        vm_name: String,
        #[serde(rename = "Shielded")]
        shielded: bool,
        #[serde(rename = "BindToHostTpm")]
        bind_to_host_tpm: bool,
    },
    /// Read the security object; the host answers `{}` when there is none.
    GetSecurity {
        #[serde(rename = "VmName")]
        vm_name: String,
    },
}

impl SecurityOperation {
    pub fn vm_name(&self) -> &str {
        match self {
            SecurityOperation::EnsureLocalKeyProtector { vm_name }
            | SecurityOperation::EnableTpm { vm_name }
            | SecurityOperation::DisableTpm { vm_name }
            | SecurityOperation::SetSecurity { vm_name, .. }
            | SecurityOperation::SetSecurityPolicy { vm_name, .. }
            | SecurityOperation::GetSecurity { vm_name } => vm_name,
        }
    }

    /// Name of the Hyper-V cmdlet that carries out this operation.
    pub fn cmdlet(&self) -> &'static str {
        match self {
            SecurityOperation::EnsureLocalKeyProtector { .. } => "Set-VMKeyProtector",
            SecurityOperation::EnableTpm { .. } => "Enable-VMTPM",
            SecurityOperation::DisableTpm { .. } => "Disable-VMTPM",
            SecurityOperation::SetSecurity { .. } => "Set-VMSecurity",
            SecurityOperation::SetSecurityPolicy { .. } => "Set-VMSecurityPolicy",
            SecurityOperation::GetSecurity { .. } => "Get-VMSecurity",
        }
    }
}

/// Named, ordered list of operations sent to a remote executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Operations")]
    pub operations: Vec<SecurityOperation>,
}

impl RemoteCommand {
    /// Plan the operations that converge a VM to `security`.
    ///
    /// The key protector is ensured before TPM is touched whenever TPM or
    /// shielding is requested, and TPM is always either enabled or
    /// explicitly disabled.
    pub fn create_or_update(security: &VmSecurity) -> Self {
        let vm_name = security.vm_name.clone();
        let mut operations = Vec::with_capacity(4);

        if security.requires_key_protector() {
            operations.push(SecurityOperation::EnsureLocalKeyProtector {
                vm_name: vm_name.clone(),
            });
        }

        if security.tpm_enabled {
            operations.push(SecurityOperation::EnableTpm {
                vm_name: vm_name.clone(),
            });
        } else {
            operations.push(SecurityOperation::DisableTpm {
                vm_name: vm_name.clone(),
            });
        }

        operations.push(SecurityOperation::SetSecurity {
            vm_name: vm_name.clone(),
            encrypt_state_and_vm_migration_traffic: security
                .encrypt_state_and_vm_migration_traffic,
            virtualization_based_security_opt_out: security.virtualization_based_security_opt_out,
        });

        operations.push(SecurityOperation::SetSecurityPolicy {
            vm_name,
            shielded: security.shielded,
            bind_to_host_tpm: security.bind_to_host_tpm,
        });

        Self {
            name: CREATE_OR_UPDATE_VM_SECURITY.to_string(),
            operations,
        }
    }

    /// Plan the read of a VM's security object.
    pub fn get(vm_name: &str) -> Self {
        Self {
            name: GET_VM_SECURITY.to_string(),
            operations: vec![SecurityOperation::GetSecurity {
                vm_name: vm_name.to_string(),
            }],
        }
    }

    /// Rebuild the setting a create-or-update command converges to.
    ///
    /// Returns `None` for commands that do not carry a complete setting.
    pub fn desired_setting(&self) -> Option<VmSecurity> {
        let mut security = VmSecurity::default();
        let mut seen_tpm = false;
        let mut seen_security = false;
        let mut seen_policy = false;

        for op in &self.operations {
            match op {
                SecurityOperation::EnsureLocalKeyProtector { .. } => {}
                SecurityOperation::EnableTpm { vm_name } => {
                    security.vm_name = vm_name.clone();
                    security.tpm_enabled = true;
                    seen_tpm = true;
                }
                SecurityOperation::DisableTpm { vm_name } => {
                    security.vm_name = vm_name.clone();
                    security.tpm_enabled = false;
                    seen_tpm = true;
                }
                SecurityOperation::SetSecurity {
                    encrypt_state_and_vm_migration_traffic,
                    virtualization_based_security_opt_out,
                    ..
                } => {
                    security.encrypt_state_and_vm_migration_traffic =
                        *encrypt_state_and_vm_migration_traffic;
                    security.virtualization_based_security_opt_out =
                        *virtualization_based_security_opt_out;
                    seen_security = true;
                }
                SecurityOperation::SetSecurityPolicy {
                    shielded,
                    bind_to_host_tpm,
                    ..
                } => {
                    security.shielded = *shielded;
                    security.bind_to_host_tpm = *bind_to_host_tpm;
                    seen_policy = true;
                }
                SecurityOperation::GetSecurity { .. } => return None,
            }
        }

        (seen_tpm && seen_security && seen_policy).then_some(security)
    }

    /// Encode the command as a JSON payload.
    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    /// Decode a command from a JSON payload.
    pub fn from_payload(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| Error::decode(e.to_string(), payload))
    }
}
