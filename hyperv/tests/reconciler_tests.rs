//! Reconciler tests against an in-memory Hyper-V host.
//!
//! `FakeHost` implements `RemoteExecutor` by interpreting each operation
//! against per-VM state, and records every command it receives.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hyperv_security::{
    expand_vm_securities, flatten_vm_securities, Error, RemoteCommand,
    RemoteExecutor, Result, SecurityOperation, SecurityReconciler, VmSecurity, VmSecurityClient,
};

/// Key protector blob as the host stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyProtector(Vec<u8>);

impl KeyProtector {
    fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Zero-length or the host's well-known empty protector (`AAAABA==`).
    fn is_empty(&self) -> bool {
        self.0.is_empty() || self.0 == [0x00, 0x00, 0x00, 0x04]
    }
}

fn needs_provisioning(current: Option<&KeyProtector>) -> bool {
    current.map_or(true, KeyProtector::is_empty)
}

#[derive(Debug, Default, Clone)]
struct HostVm {
    key_protector: Option<KeyProtector>,
    security: Option<VmSecurity>,
}

#[derive(Default)]
struct FakeHost {
    vms: Mutex<HashMap<String, HostVm>>,
    commands: Mutex<Vec<RemoteCommand>>,
    applied: Mutex<Vec<String>>,
    fail_with: Mutex<Option<String>>,
}

impl FakeHost {
    fn with_vm(name: &str) -> Self {
        let host = FakeHost::default();
        host.vms
            .lock()
            .unwrap()
            .insert(name.to_string(), HostVm::default());
        host
    }

    fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    fn commands(&self) -> Vec<RemoteCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    fn vm(&self, name: &str) -> HostVm {
        self.vms.lock().unwrap().get(name).cloned().unwrap_or_default()
    }

    fn set_vm(&self, name: &str, vm: HostVm) {
        self.vms.lock().unwrap().insert(name.to_string(), vm);
    }

    fn execute(&self, command: &RemoteCommand) -> Result<Value> {
        self.commands.lock().unwrap().push(command.clone());
        if let Some(message) = self.fail_with.lock().unwrap().take() {
            return Err(Error::remote(command.name.clone(), message));
        }

        let mut vms = self.vms.lock().unwrap();
        let mut applied = self.applied.lock().unwrap();
        let mut result = Value::Null;

        for op in &command.operations {
            let vm = vms
                .get_mut(op.vm_name())
                .ok_or_else(|| Error::remote(command.name.clone(), "VM not found"))?;
            let security = vm
                .security
                .get_or_insert_with(|| VmSecurity::new(op.vm_name()));

            match op {
                SecurityOperation::EnsureLocalKeyProtector { .. } => {
                    if needs_provisioning(vm.key_protector.as_ref()) {
                        vm.key_protector = Some(KeyProtector::new(vec![7; 32]));
                        applied.push("Set-VMKeyProtector".to_string());
                    }
                    continue;
                }
                SecurityOperation::EnableTpm { .. } => {
                    if needs_provisioning(vm.key_protector.as_ref()) {
                        return Err(Error::remote(
                            command.name.clone(),
                            "a key protector is required to enable TPM",
                        ));
                    }
                    security.tpm_enabled = true;
                }
                SecurityOperation::DisableTpm { .. } => security.tpm_enabled = false,
                SecurityOperation::SetSecurity {
                    encrypt_state_and_vm_migration_traffic,
                    virtualization_based_security_opt_out,
                    ..
                } => {
                    security.encrypt_state_and_vm_migration_traffic =
                        *encrypt_state_and_vm_migration_traffic;
                    security.virtualization_based_security_opt_out =
                        *virtualization_based_security_opt_out;
                }
                SecurityOperation::SetSecurityPolicy {
                    shielded,
                    bind_to_host_tpm,
                    ..
                } => {
                    security.shielded = *shielded;
                    security.bind_to_host_tpm = *bind_to_host_tpm;
                }
                SecurityOperation::GetSecurity { .. } => {
                    result = json!({
                        "EncryptStateAndVmMigrationTraffic": security.encrypt_state_and_vm_migration_traffic,
                        "VirtualizationBasedSecurityOptOut": security.virtualization_based_security_opt_out,
                        "TpmEnabled": security.tpm_enabled,
                        "Shielded": security.shielded,
                        "BindToHostTpm": security.bind_to_host_tpm,
                    });
                }
            }
            applied.push(op.cmdlet().to_string());
        }

        Ok(result)
    }
}

#[async_trait]
impl RemoteExecutor for FakeHost {
    async fn run_fire_and_forget(&self, command: &RemoteCommand) -> Result<()> {
        self.execute(command).map(|_| ())
    }

    async fn run_with_result(&self, command: &RemoteCommand) -> Result<Value> {
        self.execute(command)
    }
}

/// Executor that answers every query with a fixed payload.
struct CannedHost {
    response: Value,
    calls: Mutex<usize>,
}

impl CannedHost {
    fn new(response: Value) -> Self {
        Self {
            response,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl RemoteExecutor for CannedHost {
    async fn run_fire_and_forget(&self, _command: &RemoteCommand) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn run_with_result(&self, _command: &RemoteCommand) -> Result<Value> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.response.clone())
    }
}

fn reconciler(host: &Arc<FakeHost>) -> SecurityReconciler<Arc<FakeHost>> {
    SecurityReconciler::new(Arc::clone(host))
}

// =============================================================================
// Cardinality
// =============================================================================

#[tokio::test]
async fn test_create_or_update_all_empty_is_noop() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    client.create_or_update_all("web01", &[]).await.unwrap();

    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_create_or_update_all_rejects_many_without_remote_call() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    for count in [2usize, 3, 5] {
        let settings = vec![VmSecurity::default().with_tpm(true); count];
        let err = client
            .create_or_update_all("web01", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TooManySettings { count: c, .. } if c == count));
        assert!(err.is_validation());
    }

    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_create_or_update_all_single_delegates_with_same_fields() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    host.set_vm(
        "web01",
        HostVm {
            key_protector: Some(KeyProtector::new(vec![1; 16])),
            security: None,
        },
    );
    let client = reconciler(&host);

    let desired = VmSecurity::default()
        .with_encrypt_state_and_vm_migration_traffic(true)
        .with_virtualization_based_security_opt_out(true)
        .with_tpm(true)
        .with_bind_to_host_tpm(true);
    client
        .create_or_update_all("web01", std::slice::from_ref(&desired))
        .await
        .unwrap();

    let commands = host.commands();
    assert_eq!(commands.len(), 1);

    let payload = commands[0].to_payload().unwrap();
    let dispatched = RemoteCommand::from_payload(&payload)
        .unwrap()
        .desired_setting()
        .unwrap();
    assert_eq!(
        dispatched,
        VmSecurity {
            vm_name: "web01".to_string(),
            ..desired
        }
    );
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_tpm_without_protector_provisions_protector_first() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    let desired = VmSecurity::default().with_tpm(true).with_shielded(false);
    client.create_or_update("web01", &desired).await.unwrap();

    let applied = host.applied();
    let protector = applied
        .iter()
        .position(|c| c == "Set-VMKeyProtector")
        .expect("key protector was not created");
    let enable = applied
        .iter()
        .position(|c| c == "Enable-VMTPM")
        .expect("TPM was not enabled");
    assert!(protector < enable);
    assert!(host.vm("web01").security.unwrap().tpm_enabled);
}

#[tokio::test]
async fn test_empty_protector_value_is_replaced() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    host.set_vm(
        "web01",
        HostVm {
            key_protector: Some(KeyProtector::new(vec![0, 0, 0, 4])),
            security: None,
        },
    );
    let client = reconciler(&host);

    client
        .create_or_update("web01", &VmSecurity::default().with_tpm(true))
        .await
        .unwrap();

    assert!(host.applied().contains(&"Set-VMKeyProtector".to_string()));
    assert!(!host.vm("web01").key_protector.unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_protector_is_kept() {
    let existing = KeyProtector::new(vec![3; 24]);
    let host = Arc::new(FakeHost::with_vm("web01"));
    host.set_vm(
        "web01",
        HostVm {
            key_protector: Some(existing.clone()),
            security: None,
        },
    );
    let client = reconciler(&host);

    client
        .create_or_update("web01", &VmSecurity::default().with_tpm(true))
        .await
        .unwrap();

    assert!(!host.applied().contains(&"Set-VMKeyProtector".to_string()));
    assert_eq!(host.vm("web01").key_protector, Some(existing));
}

#[tokio::test]
async fn test_tpm_disabled_sends_explicit_disable() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    client
        .create_or_update("web01", &VmSecurity::default().with_tpm(true))
        .await
        .unwrap();
    client
        .create_or_update("web01", &VmSecurity::default())
        .await
        .unwrap();

    let last = host.commands().pop().unwrap();
    assert!(last
        .operations
        .iter()
        .any(|op| matches!(op, SecurityOperation::DisableTpm { vm_name } if vm_name == "web01")));
    assert!(!last
        .operations
        .iter()
        .any(|op| matches!(op, SecurityOperation::EnableTpm { .. })));
    assert!(!host.vm("web01").security.unwrap().tpm_enabled);
}

#[tokio::test]
async fn test_write_overwrites_rather_than_merges() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    let first = VmSecurity::default()
        .with_tpm(true)
        .with_shielded(true)
        .with_encrypt_state_and_vm_migration_traffic(true);
    client.create_or_update("web01", &first).await.unwrap();

    let second = VmSecurity::default().with_bind_to_host_tpm(true);
    client.create_or_update("web01", &second).await.unwrap();

    let actual = client.get("web01").await.unwrap();
    assert_eq!(
        actual,
        VmSecurity {
            vm_name: "web01".to_string(),
            ..second
        }
    );
}

#[tokio::test]
async fn test_vm_name_argument_wins_over_setting_field() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    let desired = VmSecurity::new("someone-else").with_shielded(true);
    client.create_or_update("web01", &desired).await.unwrap();

    let commands = host.commands();
    assert!(commands[0]
        .operations
        .iter()
        .all(|op| op.vm_name() == "web01"));
}

#[tokio::test]
async fn test_empty_vm_name_is_rejected_locally() {
    let host = Arc::new(FakeHost::default());
    let client = reconciler(&host);

    let err = client
        .create_or_update("", &VmSecurity::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "vm_name", .. }));

    let err = client.get("  ").await.unwrap_err();
    assert!(err.is_validation());

    assert!(host.commands().is_empty());
}

#[tokio::test]
async fn test_remote_failure_propagates_unmodified() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    host.fail_next("The operation failed because the VM is running");
    let client = reconciler(&host);

    let err = client
        .create_or_update("web01", &VmSecurity::default())
        .await
        .unwrap_err();
    match err {
        Error::Remote { operation, message } => {
            assert_eq!(operation, "CreateOrUpdateVmSecurity");
            assert_eq!(message, "The operation failed because the VM is running");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_get_empty_object_is_zero_valued() {
    let host = CannedHost::new(json!({}));
    let client = SecurityReconciler::new(host);

    let security = client.get("web01").await.unwrap();
    assert_eq!(security, VmSecurity::new("web01"));
    assert!(!security.has_security_features());
    assert_eq!(client.find("web01").await.unwrap(), None);
    assert_eq!(*client.executor().calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_get_decodes_host_object() {
    let host = CannedHost::new(json!({
        "EncryptStateAndVmMigrationTraffic": true,
        "VirtualizationBasedSecurityOptOut": false,
        "TpmEnabled": true,
        "Shielded": true,
        "BindToHostTpm": false
    }));
    let client = SecurityReconciler::new(host);

    let security = client.find("web01").await.unwrap().unwrap();
    assert_eq!(
        security,
        VmSecurity::new("web01")
            .with_encrypt_state_and_vm_migration_traffic(true)
            .with_tpm(true)
            .with_shielded(true)
    );
}

#[tokio::test]
async fn test_get_all_wraps_get() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);
    client
        .create_or_update("web01", &VmSecurity::default().with_shielded(true))
        .await
        .unwrap();

    let single = client.get("web01").await.unwrap();
    let all = client.get_all("web01").await.unwrap();
    assert_eq!(all, vec![single]);
}

#[tokio::test]
async fn test_get_all_propagates_error() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    host.fail_next("WinRM connection refused");
    let client = reconciler(&host);

    let err = client.get_all("web01").await.unwrap_err();
    assert!(matches!(err, Error::Remote { .. }));
}

#[tokio::test]
async fn test_no_securities_is_empty() {
    let host = Arc::new(FakeHost::default());
    assert!(reconciler(&host).no_securities().is_empty());
}

// =============================================================================
// Schema round trip through the host
// =============================================================================

#[tokio::test]
async fn test_block_applied_and_read_back() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);

    let block = json!([{
        "encrypt_state_and_vm_migration_traffic": true,
        "virtualization_based_security_optout": true,
        "tpm_enabled": true,
        "shielded": false,
        "bind_to_host_tpm": false
    }]);
    let desired = expand_vm_securities(Some(&block)).unwrap();
    client.create_or_update_all("web01", &desired).await.unwrap();

    let actual = client.get_all("web01").await.unwrap();
    assert_eq!(flatten_vm_securities(&actual), Some(block));
}

#[tokio::test]
async fn test_absent_block_resets_to_defaults() {
    let host = Arc::new(FakeHost::with_vm("web01"));
    let client = reconciler(&host);
    client
        .create_or_update("web01", &VmSecurity::default().with_tpm(true).with_shielded(true))
        .await
        .unwrap();

    let desired = expand_vm_securities(None).unwrap();
    client.create_or_update_all("web01", &desired).await.unwrap();

    let actual = client.get("web01").await.unwrap();
    assert!(!actual.has_security_features());
}
