//! Session configuration.
//!
//! [`SessionConfig`] is plain data with `serde` defaults, so a JSON file only
//! needs the keys it wants to override:
//!
//! ```json
//! { "app_name": "Flight Logger", "pump_interval_ms": 5 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::SimConnectError;

/// Application name passed to `SimConnect_Open` when none is configured.
pub const DEFAULT_APP_NAME: &str = "Request Data";

/// Library name resolved through the DLL search path.
pub const DEFAULT_LIBRARY: &str = "SimConnect.dll";

/// Sleep before every `CallDispatch`.
pub const DEFAULT_PUMP_INTERVAL_MS: u64 = 10;

/// Pump cycles `get_data` waits for a result.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name reported to the simulator.
    pub app_name: String,
    /// Explicit path to `SimConnect.dll`.  `None` uses the DLL search path.
    pub library_path: Option<PathBuf>,
    /// Milliseconds slept before each pump cycle.
    pub pump_interval_ms: u64,
    /// Pump cycles `get_data` waits before reporting a timeout.
    pub max_attempts: u32,
    /// Upper bound on pump cycles while waiting for the open confirmation.
    /// `None` waits until the simulator answers or quits.
    pub open_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_owned(),
            library_path: None,
            pump_interval_ms: DEFAULT_PUMP_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            open_attempts: None,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file; missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimConnectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the polling loop cannot work with.
    pub fn validate(&self) -> Result<(), SimConnectError> {
        if self.app_name.is_empty() {
            return Err(SimConnectError::Config("app_name must not be empty".into()));
        }
        if self.app_name.contains('\0') {
            return Err(SimConnectError::Config(
                "app_name must not contain NUL bytes".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SimConnectError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }

    /// Library to load: the configured path or [`DEFAULT_LIBRARY`].
    pub fn library(&self) -> PathBuf {
        self.library_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_polling_contract() {
        let c = SessionConfig::default();
        assert_eq!(c.app_name, "Request Data");
        assert_eq!(c.max_attempts, 4);
        assert_eq!(c.pump_interval(), Duration::from_millis(10));
        assert!(c.open_attempts.is_none());
        assert_eq!(c.library(), PathBuf::from("SimConnect.dll"));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let c: SessionConfig =
            serde_json::from_str(r#"{"app_name":"Logger","open_attempts":50}"#).unwrap();
        assert_eq!(c.app_name, "Logger");
        assert_eq!(c.open_attempts, Some(50));
        assert_eq!(c.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let c = SessionConfig {
            max_attempts: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(c.validate(), Err(SimConnectError::Config(_))));
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = SessionConfig::from_json_file("/nonexistent/simconnect.json").unwrap_err();
        assert!(matches!(err, SimConnectError::Io(_)));
    }
}
