//! `simconnect_cli` -- Shared plumbing for the SimConnect command-line tools.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`init_logging`] | `tracing-subscriber` fmt output on stderr, `RUST_LOG` aware |
//! | [`CommonArgs`] | Flags every tool accepts (config file, library, app name) |
//! | [`Worker`] | JSON-RPC method table used by `simconnect-worker` |

use std::io;
use std::path::PathBuf;

use clap::Args;
use serde_json::{json, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use simconnect_core::blocks::InitPosition;
use simconnect_core::config::SessionConfig;
use simconnect_core::dispatch::ConnectionState;
use simconnect_core::ids::{EventId, RequestId};
use simconnect_core::native::NativeLayer;
use simconnect_core::request::{Definition, OutData};
use simconnect_core::{Session, SimConnectError};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the stderr subscriber.  `RUST_LOG` wins; otherwise `info`, or
/// `debug` with `verbose`.  `log` records from `simconnect_core` are
/// bridged through `tracing-log`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    // A second init (e.g. in tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

// ---------------------------------------------------------------------------
// Common arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON session config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to SimConnect.dll
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Application name reported to the simulator
    #[arg(long)]
    pub app_name: Option<String>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Config file values (or defaults) with command-line overrides applied.
    pub fn session_config(&self) -> Result<SessionConfig, SimConnectError> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)?,
            None => SessionConfig::default(),
        };
        if let Some(library) = &self.library {
            config.library_path = Some(library.clone());
        }
        if let Some(name) = &self.app_name {
            config.app_name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Build the config or exit with the error logged.
    pub fn session_config_or_exit(&self) -> SessionConfig {
        match self.session_config() {
            Ok(config) => config,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(2);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Numbers stay numbers; byte strings are rendered as (lossy) UTF-8 text.
pub fn out_data_json(data: Option<&OutData>) -> Value {
    match data {
        Some(OutData::Float(v)) => json!(v),
        Some(OutData::Bytes(b)) => Value::String(String::from_utf8_lossy(b).into_owned()),
        None => Value::Null,
    }
}

pub fn state_name(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::NotOpen => "not_open",
        ConnectionState::Open => "open",
        ConnectionState::QuitRequested => "quit_requested",
    }
}

fn param_u32(params: &Value, key: &str) -> Result<u32, String> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("missing or invalid '{key}'"))
}

fn param_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing or invalid '{key}'"))
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Method table of the JSON-RPC worker, over any native layer.
pub struct Worker<N: NativeLayer> {
    session: Session<N>,
}

impl<N: NativeLayer> Worker<N> {
    pub fn new(session: Session<N>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<N> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<N> {
        &mut self.session
    }

    /// Run one method.  Errors are returned as the response's error string.
    pub fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, String> {
        match method {
            "ping" => Ok(Value::String("pong".to_owned())),
            "state" => Ok(json!({ "state": state_name(self.session.state()) })),
            "new_request" => {
                let fields: Vec<(String, String)> = params
                    .get("fields")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| format!("invalid 'fields': {e}"))?
                    .unwrap_or_default();
                if fields.is_empty() {
                    return Err("'fields' must list at least one [name, units] pair".into());
                }
                let fields = fields
                    .into_iter()
                    .map(|(name, units)| Definition::new(name, units))
                    .collect();
                self.session
                    .new_request(fields)
                    .map(|id| json!(id))
                    .ok_or_else(|| "AddToDataDefinition failed".to_owned())
            }
            "get_data" => {
                let id = RequestId(param_u32(params, "request_id")?);
                let ok = self.session.get_data(id);
                Ok(json!({
                    "ok": ok,
                    "value": out_data_json(self.session.out_data(id)),
                }))
            }
            "set_data" => {
                let id = RequestId(param_u32(params, "request_id")?);
                if let Some(value) = params.get("value") {
                    let data = match value {
                        Value::String(s) => OutData::Bytes(s.clone().into_bytes()),
                        other => OutData::Float(
                            other
                                .as_f64()
                                .ok_or_else(|| "'value' must be a number or string".to_owned())?,
                        ),
                    };
                    let request = self
                        .session
                        .request_mut(id)
                        .ok_or_else(|| format!("unknown request {id}"))?;
                    request.out_data = Some(data);
                }
                Ok(Value::Bool(self.session.set_data(id)))
            }
            "map_event" => {
                let name = param_str(params, "name")?;
                self.session
                    .map_to_sim_event(name)
                    .map(|id| json!(id))
                    .ok_or_else(|| format!("MapToSimEvent failed for {name}"))
            }
            "send_event" => {
                let event = match params.get("name").and_then(Value::as_str) {
                    Some(name) => self
                        .session
                        .map_to_sim_event(name)
                        .ok_or_else(|| format!("MapToSimEvent failed for {name}"))?,
                    None => EventId(param_u32(params, "event_id")?),
                };
                let data = params
                    .get("data")
                    .and_then(Value::as_u64)
                    .map(|d| d.min(u32::MAX as u64) as u32)
                    .unwrap_or(0);
                Ok(Value::Bool(self.session.send_event(event, data)))
            }
            "set_pos" => {
                let pos: InitPosition = serde_json::from_value(params.clone())
                    .map_err(|e| format!("invalid position: {e}"))?;
                Ok(Value::Bool(self.session.set_pos(&pos)))
            }
            _ => Err(format!("unknown method: {method}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use simconnect_core::native::scripted::{float_data_record, NativeCall, ScriptedNative};

    fn worker() -> Worker<ScriptedNative> {
        let config = SessionConfig {
            pump_interval_ms: 0,
            ..SessionConfig::default()
        };
        let mut session = Session::new(ScriptedNative::new(), config);
        session.connect().unwrap();
        Worker::new(session)
    }

    #[test]
    fn test_ping_and_state() {
        let mut w = worker();
        assert_eq!(w.dispatch("ping", &Value::Null).unwrap(), json!("pong"));
        assert_eq!(
            w.dispatch("state", &Value::Null).unwrap(),
            json!({ "state": "open" })
        );
    }

    #[test]
    fn test_new_request_then_get_data() {
        let mut w = worker();
        let id = w
            .dispatch("new_request", &json!({ "fields": [["PLANE ALTITUDE", "feet"]] }))
            .unwrap();
        let id = RequestId(id.as_u64().unwrap() as u32);
        let def = w.session().request(id).unwrap().definition_id;
        w.session_mut()
            .native_mut()
            .reply_to(id, float_data_record(id, def, &[4200.0]));

        let result = w
            .dispatch("get_data", &json!({ "request_id": id.0 }))
            .unwrap();
        assert_eq!(result, json!({ "ok": true, "value": 4200.0 }));
    }

    #[test]
    fn test_send_event_by_name() {
        let mut w = worker();
        let sent = w
            .dispatch("send_event", &json!({ "name": "GEAR_TOGGLE", "data": 1 }))
            .unwrap();
        assert_eq!(sent, json!(true));
        assert!(w.session().native().calls().iter().any(|c| matches!(
            c,
            NativeCall::TransmitClientEvent { data: 1, flags: 16, .. }
        )));
    }

    #[test]
    fn test_set_data_with_value() {
        let mut w = worker();
        let id = w
            .dispatch("new_request", &json!({ "fields": [["KOHLSMAN SETTING HG", "inHg"]] }))
            .unwrap();
        let result = w
            .dispatch("set_data", &json!({ "request_id": id, "value": 29.92 }))
            .unwrap();
        assert_eq!(result, json!(true));
        assert!(w.dispatch("set_data", &json!({ "request_id": 999, "value": 1.0 })).is_err());
    }

    #[test]
    fn test_bad_params() {
        let mut w = worker();
        assert!(w.dispatch("get_data", &json!({})).is_err());
        assert!(w.dispatch("new_request", &json!({ "fields": [] })).is_err());
        assert!(w.dispatch("nope", &Value::Null).is_err());
    }

    #[test]
    fn test_set_pos_from_json() {
        let mut w = worker();
        let ok = w
            .dispatch(
                "set_pos",
                &json!({ "latitude": 47.45, "longitude": -122.31, "altitude": 2500.0, "airspeed": 120 }),
            )
            .unwrap();
        assert_eq!(ok, json!(true));
    }

    #[test]
    fn test_config_overrides() {
        let args = CommonArgs {
            app_name: Some("Logger".into()),
            library: Some(PathBuf::from("C:/MSFS SDK/SimConnect.dll")),
            ..CommonArgs::default()
        };
        let config = args.session_config().unwrap();
        assert_eq!(config.app_name, "Logger");
        assert!(config.library_path.is_some());
    }
}
