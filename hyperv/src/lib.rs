//! # hyperv-security
//!
//! Typed reconciliation of Hyper-V VM security settings.
//!
//! This crate converges a VM's security configuration (state encryption,
//! VBS opt-out, virtual TPM, shielding) to a desired [`VmSecurity`] and reads
//! it back. Every write fully overwrites the host's settings; every read goes
//! to the host, there is no cache.
//!
//! ## Features
//!
//! - **Typed remote commands**: writes are planned as an ordered list of
//!   [`SecurityOperation`]s instead of templated script text
//! - **Key protector ordering**: a local key protector is provisioned before
//!   TPM or shielding is enabled
//! - **One setting per VM**: collection-shaped writes reject more than one
//!   setting before contacting the host
//! - **Pluggable execution**: anything implementing [`RemoteExecutor`];
//!   [`PsExecutor`] runs PowerShell locally or through `Invoke-Command`
//!
//! ## Example
//!
//! ```no_run
//! use hyperv_security::{
//!     ConnectionConfig, PsExecutor, SecurityReconciler, VmSecurity, VmSecurityClient,
//! };
//!
//! # async fn run() -> hyperv_security::Result<()> {
//! let client = SecurityReconciler::new(PsExecutor::new(ConnectionConfig::remote("hv01")));
//!
//! let desired = VmSecurity::new("web01").with_tpm(true);
//! client.create_or_update("web01", &desired).await?;
//!
//! let actual = client.get("web01").await?;
//! assert!(actual.tpm_enabled);
//! # Ok(())
//! # }
//! ```
//!
//! ## Requirements
//!
//! - Windows Server 2016+ or Windows 10/11 host with Hyper-V
//! - Hyper-V PowerShell module on the target host
//! - Administrator privileges

pub mod error;
pub mod executor;
pub mod powershell;
pub mod security;

// Re-export main types at crate root
pub use error::{Error, FailureType, Result};
pub use executor::RemoteExecutor;

pub use security::{
    expand_vm_securities, flatten_vm_securities, RemoteCommand, SecurityOperation,
    SecurityReconciler, VmSecurity, VmSecurityClient,
};

pub use powershell::{ConnectionConfig, Credentials, PsExecutor};
