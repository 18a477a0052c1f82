//! PowerShell implementation of [`crate::RemoteExecutor`].

mod connection;
mod process;
mod script;

pub use connection::{
    ConnectionConfig, Credentials, DEFAULT_POWERSHELL_PATH, DEFAULT_TIMEOUT, MIN_TIMEOUT,
};
pub use process::{PsExecutor, PsOutput};
pub use script::{escape, quote, render_script};
