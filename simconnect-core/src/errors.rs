//! Error types for `simconnect_core`.
//!
//! Only the failures that cannot degrade to a `false` return are funnelled
//! through [`SimConnectError`]: loading the native library, opening the
//! session, and reading configuration.  Native call failures during normal
//! operation are reported as `bool` / `Option` by the [`crate::session`]
//! methods instead.

use thiserror::Error;

/// Top-level error type for the `simconnect_core` library.
#[derive(Debug, Error)]
pub enum SimConnectError {
    /// `SimConnect.dll` could not be loaded or an entry point is missing.
    #[error("LibraryLoad: {0}")]
    LibraryLoad(String),

    /// `SimConnect_Open` failed (simulator not running or library absent).
    #[error("Open: {0}")]
    Open(String),

    /// No open confirmation arrived within the configured pump attempts.
    #[error("OpenTimeout: no open confirmation after {attempts} pump cycles")]
    OpenTimeout { attempts: u32 },

    /// The simulator sent a quit record before confirming the open.
    #[error("QuitBeforeOpen: simulator quit before the connection opened")]
    QuitBeforeOpen,

    /// Invalid or unreadable configuration.
    #[error("Config: {0}")]
    Config(String),

    /// Filesystem failure (configuration file).
    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a `windows::core::Error` (Win32 loader failure) into a
/// `SimConnectError::LibraryLoad`.
#[cfg(windows)]
impl From<windows::core::Error> for SimConnectError {
    fn from(err: windows::core::Error) -> Self {
        SimConnectError::LibraryLoad(format!("Windows error: {err}"))
    }
}

impl From<serde_json::Error> for SimConnectError {
    fn from(err: serde_json::Error) -> Self {
        SimConnectError::Config(format!("invalid JSON: {err}"))
    }
}
