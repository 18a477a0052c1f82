//! Data Transfer Objects for API requests and responses

use hyperv_security::VmSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// VM security settings as exposed over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSecurityDto {
    pub vm_name: String,
    pub encrypt_state_and_vm_migration_traffic: bool,
    pub virtualization_based_security_optout: bool,
    pub tpm_enabled: bool,
    pub shielded: bool,
    pub bind_to_host_tpm: bool,
}

impl From<VmSecurity> for VmSecurityDto {
    fn from(s: VmSecurity) -> Self {
        Self {
            vm_name: s.vm_name,
            encrypt_state_and_vm_migration_traffic: s.encrypt_state_and_vm_migration_traffic,
            virtualization_based_security_optout: s.virtualization_based_security_opt_out,
            tpm_enabled: s.tpm_enabled,
            shielded: s.shielded,
            bind_to_host_tpm: s.bind_to_host_tpm,
        }
    }
}

impl From<VmSecurityDto> for VmSecurity {
    fn from(d: VmSecurityDto) -> Self {
        Self {
            vm_name: d.vm_name,
            encrypt_state_and_vm_migration_traffic: d.encrypt_state_and_vm_migration_traffic,
            virtualization_based_security_opt_out: d.virtualization_based_security_optout,
            tpm_enabled: d.tpm_enabled,
            shielded: d.shielded,
            bind_to_host_tpm: d.bind_to_host_tpm,
        }
    }
}

/// The declarative `vm_security` block, in either direction.
///
/// `vm_security` is `null` when there is nothing to report, and may be
/// omitted on requests to reset the VM to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmSecurityBlockDto {
    #[serde(default)]
    pub vm_security: Option<Value>,
}
