//! Security-related types for Hyper-V VMs.

use serde::{Deserialize, Serialize};

/// Base64 form of the key protector the host reports when none has been set.
pub const EMPTY_KEY_PROTECTOR_BASE64: &str = "AAAABA==";

/// Security settings for a VM.
///
/// Mirrors the fields of `Get-VMSecurity` that can be reconciled: state
/// encryption, VBS opt-out, vTPM and shielding. Exactly one of these exists
/// per VM on the host.
///
/// Serialized names match the host object properties, and every field has a
/// default so a partial or empty object (`{}`) still decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSecurity {
    /// Name of the VM the setting belongs to. Not part of the host object.
    #[serde(rename = "VmName")]
    pub vm_name: String,
    /// Encrypt saved state and live migration traffic.
    #[serde(rename = "EncryptStateAndVmMigrationTraffic")]
    pub encrypt_state_and_vm_migration_traffic: bool,
    /// Opt the VM out of virtualization-based security.
    #[serde(rename = "VirtualizationBasedSecurityOptOut")]
    pub virtualization_based_security_opt_out: bool,
    /// Whether the virtual TPM is enabled.
    #[serde(rename = "TpmEnabled")]
    pub tpm_enabled: bool,
    /// Whether the VM is shielded.
    #[serde(rename = "Shielded")]
    pub shielded: bool,
    /// Bind the vTPM to the host TPM.
    #[serde(rename = "BindToHostTpm")]
    pub bind_to_host_tpm: bool,
}

impl VmSecurity {
    /// Create an all-false setting for the named VM.
    pub fn new(vm_name: impl Into<String>) -> Self {
        Self {
            vm_name: vm_name.into(),
            ..Self::default()
        }
    }

    pub fn with_encrypt_state_and_vm_migration_traffic(mut self, enabled: bool) -> Self {
        self.encrypt_state_and_vm_migration_traffic = enabled;
        self
    }

    pub fn with_virtualization_based_security_opt_out(mut self, opt_out: bool) -> Self {
        self.virtualization_based_security_opt_out = opt_out;
        self
    }

    pub fn with_tpm(mut self, enabled: bool) -> Self {
        self.tpm_enabled = enabled;
        self
    }

    pub fn with_shielded(mut self, shielded: bool) -> Self {
        self.shielded = shielded;
        self
    }

    pub fn with_bind_to_host_tpm(mut self, bind: bool) -> Self {
        self.bind_to_host_tpm = bind;
        self
    }

    /// Check if any security feature is switched on.
    pub fn has_security_features(&self) -> bool {
        self.encrypt_state_and_vm_migration_traffic
            || self.tpm_enabled
            || self.shielded
            || self.bind_to_host_tpm
    }

    /// A key protector must exist before TPM or shielding can be turned on.
    pub fn requires_key_protector(&self) -> bool {
        self.tpm_enabled || self.shielded
    }
}
