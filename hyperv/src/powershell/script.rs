//! Rendering of [`RemoteCommand`]s into PowerShell.
//!
//! Values never reach the script unquoted: strings are single-quoted with
//! embedded quotes doubled, booleans become `$true` / `$false`.

use crate::security::{
    RemoteCommand, SecurityOperation, EMPTY_KEY_PROTECTOR_BASE64, SECURITY_FIELDS,
};

/// Characters PowerShell accepts as a single-quote delimiter.
const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// Escape a string value for embedding inside single-quoted PS strings.
///
/// Every quote character is doubled, including the typographic ones
/// PowerShell treats as `'`.
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if SINGLE_QUOTES.contains(&c) {
            escaped.push(c);
        }
        escaped.push(c);
    }
    escaped
}

/// Single-quote a string value.
pub fn quote(s: &str) -> String {
    format!("'{}'", escape(s))
}

fn ps_bool(b: bool) -> &'static str {
    if b {
        "$true"
    } else {
        "$false"
    }
}

/// Render a command body, one block per operation in command order.
pub fn render_script(command: &RemoteCommand) -> String {
    let mut script = String::from("$ErrorActionPreference = 'Stop'\nImport-Module Hyper-V\n");
    for op in &command.operations {
        script.push('\n');
        script.push_str(&render_operation(op));
    }
    script
}

fn render_operation(op: &SecurityOperation) -> String {
    let vm = quote(op.vm_name());
    match op {
        SecurityOperation::EnsureLocalKeyProtector { .. } => format!(
            "$currentKeyProtector = Get-VMKeyProtector -VMName {vm}\n\
             if (($null -eq $currentKeyProtector) -or ('{EMPTY_KEY_PROTECTOR_BASE64}' -eq [Convert]::ToBase64String($currentKeyProtector))) {{\n\
             \tSet-VMKeyProtector -VMName {vm} -NewLocalKeyProtector\n\
             }}\n"
        ),
        SecurityOperation::EnableTpm { .. } => format!("Enable-VMTPM -VMName {vm}\n"),
        SecurityOperation::DisableTpm { .. } => format!("Disable-VMTPM -VMName {vm}\n"),
        SecurityOperation::SetSecurity {
            encrypt_state_and_vm_migration_traffic,
            virtualization_based_security_opt_out,
            ..
        } => format!(
            "$setVMSecurityArgs = @{{\n\
             \tVMName = {vm}\n\
             \tEncryptStateAndVmMigrationTraffic = {}\n\
             \tVirtualizationBasedSecurityOptOut = {}\n\
             }}\n\
             Set-VMSecurity @setVMSecurityArgs\n",
            ps_bool(*encrypt_state_and_vm_migration_traffic),
            ps_bool(*virtualization_based_security_opt_out),
        ),
        SecurityOperation::SetSecurityPolicy {
            shielded,
            bind_to_host_tpm,
            ..
        } => format!(
            "$setVMSecurityPolicyArgs = @{{\n\
             \tVMName = {vm}\n\
             \tShielded = {}\n\
             \tBindToHostTpm = {}\n\
             }}\n\
             Set-VMSecurityPolicy @setVMSecurityPolicyArgs\n",
            ps_bool(*shielded),
            ps_bool(*bind_to_host_tpm),
        ),
        SecurityOperation::GetSecurity { .. } => format!(
            "$vmSecurityObject = Get-VMSecurity -VMName {vm} | Select-Object {}\n\
             if ($vmSecurityObject) {{\n\
             \tConvertTo-Json -InputObject $vmSecurityObject -Compress\n\
             }} else {{\n\
             \t\"{{}}\"\n\
             }}\n",
            SECURITY_FIELDS.join(","),
        ),
    }
}
