//! PowerShell process execution.
//!
//! Wraps `tokio::process::Command` to invoke PowerShell and parse JSON
//! output. Remote hosts are reached through `Invoke-Command -ComputerName`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::connection::ConnectionConfig;
use super::script::{quote, render_script};
use crate::error::{Error, Result};
use crate::executor::RemoteExecutor;
use crate::security::RemoteCommand;

/// Environment variable carrying the remote password into the child process.
const PASSWORD_ENV: &str = "HYPERV_SECURITY_PASSWORD";

/// Result of a PowerShell invocation.
#[derive(Debug, Clone)]
pub struct PsOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl PsOutput {
    /// Whether the command completed successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Parse stdout as a JSON value; empty output is `Null`.
    pub fn parse_json(&self) -> Result<serde_json::Value> {
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).map_err(|e| {
            Error::decode(
                format!("Failed to parse PowerShell JSON output: {}", e),
                trimmed,
            )
        })
    }

    /// Map a failed run to an error for `operation`.
    pub fn into_error(self, operation: &str) -> Error {
        let msg = if self.stderr.trim().is_empty() {
            format!("PowerShell exited with code {}", self.exit_code)
        } else {
            self.stderr.trim().to_string()
        };

        if msg.contains("is not recognized") {
            return Error::ModuleNotAvailable;
        }
        if msg.contains("Access is denied") || msg.contains("AccessDenied") {
            return Error::AccessDenied(msg);
        }
        Error::remote(operation, msg)
    }
}

/// [`RemoteExecutor`] that renders commands to PowerShell and runs them.
#[derive(Debug, Clone)]
pub struct PsExecutor {
    config: ConnectionConfig,
}

impl PsExecutor {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Wrap a script body so it targets the configured host.
    ///
    /// The password is never part of the script text; it is read from
    /// `HYPERV_SECURITY_PASSWORD`, which [`run`](Self::run) sets on the child only.
    pub fn wrap_script(&self, body: &str) -> String {
        let Some(machine) = self.config.machine_name.as_deref().filter(|m| !m.is_empty()) else {
            return body.to_string();
        };

        match self.config.credentials {
            Some(ref creds) => format!(
                "$ErrorActionPreference = 'Stop'\n\
                 $__cred = New-Object System.Management.Automation.PSCredential({}, (ConvertTo-SecureString $env:{PASSWORD_ENV} -AsPlainText -Force))\n\
                 Remove-Item Env:\\{PASSWORD_ENV}\n\
                 Invoke-Command -ComputerName {} -Credential $__cred -ScriptBlock {{\n{}}}\n",
                quote(&creds.full_username()),
                quote(machine),
                body
            ),
            None => format!(
                "$ErrorActionPreference = 'Stop'\n\
                 Invoke-Command -ComputerName {} -ScriptBlock {{\n{}}}\n",
                quote(machine),
                body
            ),
        }
    }

    /// Execute a script and return raw output.
    pub async fn run(&self, operation: &str, body: &str) -> Result<PsOutput> {
        let script = self.wrap_script(body);
        debug!(
            operation,
            remote = self.config.is_remote(),
            chars = script.len(),
            "running PowerShell"
        );
        // Logged before wrapping so credentials stay out of traces.
        trace!(operation, "script body:\n{}", body);

        let timeout = self.config.effective_timeout();
        let mut command = Command::new(&self.config.powershell_path);
        if let (true, Some(creds)) = (self.config.is_remote(), &self.config.credentials) {
            command.env(PASSWORD_ENV, creds.password_str());
        }
        let child = command
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                &script,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                operation: operation.to_string(),
                timeout,
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        trace!(
            operation,
            bytes = stdout.len(),
            "stdout: {}",
            stdout.chars().take(300).collect::<String>()
        );
        if !stderr.trim().is_empty() {
            warn!(
                operation,
                "PowerShell stderr: {}",
                stderr.chars().take(500).collect::<String>()
            );
        }

        Ok(PsOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Execute and fail on a non-zero exit code.
    pub async fn run_ok(&self, operation: &str, body: &str) -> Result<PsOutput> {
        let output = self.run(operation, body).await?;
        if !output.success() {
            return Err(output.into_error(operation));
        }
        Ok(output)
    }
}

#[async_trait]
impl RemoteExecutor for PsExecutor {
    async fn run_fire_and_forget(&self, command: &RemoteCommand) -> Result<()> {
        self.run_ok(&command.name, &render_script(command)).await?;
        Ok(())
    }

    async fn run_with_result(&self, command: &RemoteCommand) -> Result<serde_json::Value> {
        let output = self.run_ok(&command.name, &render_script(command)).await?;
        output.parse_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::powershell::Credentials;
    use std::time::Duration;

    fn output(stdout: &str, stderr: &str, exit_code: i32) -> PsOutput {
        PsOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    #[test]
    fn test_parse_json_empty_is_null() {
        assert_eq!(
            output("  \r\n", "", 0).parse_json().unwrap(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_parse_json_object() {
        let value = output("{\"TpmEnabled\":true}\r\n", "", 0)
            .parse_json()
            .unwrap();
        assert_eq!(value["TpmEnabled"], true);
    }

    #[test]
    fn test_parse_json_garbage_is_decode_error() {
        let err = output("WARNING: something", "", 0).parse_json().unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_into_error_classification() {
        let err = output("", "The term 'Get-VMSecurity' is not recognized", 1).into_error("Get");
        assert!(matches!(err, Error::ModuleNotAvailable));

        let err = output("", "Access is denied.", 1).into_error("Get");
        assert!(matches!(err, Error::AccessDenied(_)));

        let err = output("", "", 3).into_error("GetVmSecurity");
        match err {
            Error::Remote { operation, message } => {
                assert_eq!(operation, "GetVmSecurity");
                assert!(message.contains("code 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrap_script_local_is_unchanged() {
        let executor = PsExecutor::new(ConnectionConfig::local());
        assert_eq!(executor.wrap_script("Get-VM"), "Get-VM");
    }

    #[test]
    fn test_wrap_script_remote() {
        let executor = PsExecutor::new(ConnectionConfig::remote("hv'01"));
        let script = executor.wrap_script("Get-VM\n");
        assert!(script.contains("Invoke-Command -ComputerName 'hv''01' -ScriptBlock {"));
        assert!(script.trim_end().ends_with('}'));
        assert!(!script.contains("-Credential"));
    }

    #[test]
    fn test_wrap_script_keeps_password_out_of_command_line() {
        let config = ConnectionConfig::remote("hv01")
            .with_credentials(Credentials::with_domain("CONTOSO", "admin", "p'w"))
            .with_timeout(Duration::from_secs(30));
        let script = PsExecutor::new(config).wrap_script("Get-VM\n");
        assert!(script.contains("PSCredential('CONTOSO\\admin'"));
        assert!(script.contains("ConvertTo-SecureString $env:HYPERV_SECURITY_PASSWORD"));
        assert!(script.contains("-Credential $__cred"));
        assert!(!script.contains("p'w"));
        assert!(!script.contains("p''w"));
    }

    #[tokio::test]
    async fn test_missing_powershell_is_io_error() {
        let config = ConnectionConfig::local().with_powershell_path("/nonexistent/pwsh-does-not-exist");
        let executor = PsExecutor::new(config);
        let err = executor
            .run_fire_and_forget(&RemoteCommand::get("web01"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
