//! Security settings for Hyper-V VMs.
//!
//! This module provides support for:
//! - The [`VmSecurity`] model (state encryption, VBS opt-out, vTPM, shielding)
//! - Typed [`RemoteCommand`] planning with key protector ordering
//! - The [`VmSecurityClient`] reconciler and its one-setting-per-VM rule
//! - Expanding / flattening the declarative `vm_security` block
//!
//! # Example
//!
//! ```no_run
//! use hyperv_security::security::{RemoteCommand, VmSecurity};
//!
//! let security = VmSecurity::new("web01").with_tpm(true);
//! let command = RemoteCommand::create_or_update(&security);
//! assert_eq!(command.operations[0].cmdlet(), "Set-VMKeyProtector");
//! ```

mod command;
mod reconciler;
mod schema;
mod types;

pub use command::{
    RemoteCommand, SecurityOperation, CREATE_OR_UPDATE_VM_SECURITY, GET_VM_SECURITY,
    SECURITY_FIELDS,
};
pub use reconciler::{SecurityReconciler, VmSecurityClient};
pub use schema::{
    expand_vm_securities, flatten_vm_securities, KEY_BIND_TO_HOST_TPM,
    KEY_ENCRYPT_STATE_AND_VM_MIGRATION_TRAFFIC, KEY_SHIELDED, KEY_TPM_ENABLED,
    KEY_VIRTUALIZATION_BASED_SECURITY_OPTOUT, VM_SECURITY_BLOCK,
};
pub use types::{VmSecurity, EMPTY_KEY_PROTECTOR_BASE64};
