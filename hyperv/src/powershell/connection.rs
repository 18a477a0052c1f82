use std::time::Duration;

/// Default PowerShell executable.
pub const DEFAULT_POWERSHELL_PATH: &str = "powershell.exe";

/// Default time allowed for one remote command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Smallest timeout the executor will honour.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials for a remote host.
#[derive(Clone)]
pub struct Credentials {
    /// Domain (optional).
    pub domain: Option<String>,
    /// Username.
    pub username: String,
    /// Password (never printed).
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            domain: None,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create credentials with domain.
    pub fn with_domain(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: Some(domain.into()),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Get the full username (domain\user or just user).
    pub fn full_username(&self) -> String {
        if let Some(ref domain) = self.domain {
            format!("{}\\{}", domain, self.username)
        } else {
            self.username.clone()
        }
    }

    pub(crate) fn password_str(&self) -> &str {
        &self.password
    }
}

/// Where and how PowerShell runs.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Target machine name (None for local).
    pub machine_name: Option<String>,
    /// Credentials for the remote machine.
    pub credentials: Option<Credentials>,
    /// PowerShell executable to spawn.
    pub powershell_path: String,
    /// Time allowed for one command.
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            machine_name: None,
            credentials: None,
            powershell_path: DEFAULT_POWERSHELL_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create local connection config.
    pub fn local() -> Self {
        Self::default()
    }

    /// Create remote connection config.
    pub fn remote(machine_name: impl Into<String>) -> Self {
        Self {
            machine_name: Some(machine_name.into()),
            ..Default::default()
        }
    }

    /// Add credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the PowerShell executable.
    pub fn with_powershell_path(mut self, path: impl Into<String>) -> Self {
        self.powershell_path = path.into();
        self
    }

    pub fn is_remote(&self) -> bool {
        self.machine_name.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// Timeout actually applied, never below [`MIN_TIMEOUT`].
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.max(MIN_TIMEOUT)
    }
}
