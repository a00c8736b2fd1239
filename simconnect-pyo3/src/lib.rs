//! `simconnect_native` -- Thin PyO3 wrapper around `simconnect_core`.
//!
//! Exposes one `SimConnect` class that owns a session.  The session holds the
//! native handle and is driven from the thread that created it, so the class
//! is `unsendable` and methods keep the GIL while they pump.  All business
//! logic lives in `simconnect_core`.

use pyo3::exceptions::{PyConnectionError, PyRuntimeError, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyFloat};

use simconnect_core::blocks::{InitPosition, Waypoint};
use simconnect_core::config::SessionConfig;
use simconnect_core::ids::{EventId, GroupId, RequestId};
use simconnect_core::native::NativeLayer;
use simconnect_core::request::{Definition, OutData};
use simconnect_core::{Session, SimConnectError};

// ---------------------------------------------------------------------------
// Error conversion helper
// ---------------------------------------------------------------------------

fn to_py_err(e: SimConnectError) -> PyErr {
    match e {
        SimConnectError::LibraryLoad(_)
        | SimConnectError::Open(_)
        | SimConnectError::OpenTimeout { .. }
        | SimConnectError::QuitBeforeOpen => PyConnectionError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn out_data_to_py(py: Python<'_>, data: Option<&OutData>) -> PyObject {
    match data {
        Some(OutData::Float(v)) => PyFloat::new(py, *v).into_any().unbind(),
        Some(OutData::Bytes(b)) => PyBytes::new(py, b).into_any().unbind(),
        None => py.None(),
    }
}

/// Accept `float`, `int`, `bytes` or `str` as a value to write.
fn out_data_from_py(value: &Bound<'_, PyAny>) -> PyResult<OutData> {
    if let Ok(bytes) = value.downcast::<PyBytes>() {
        return Ok(OutData::Bytes(bytes.as_bytes().to_vec()));
    }
    if let Ok(text) = value.extract::<String>() {
        return Ok(OutData::Bytes(text.into_bytes()));
    }
    if let Ok(v) = value.extract::<f64>() {
        return Ok(OutData::Float(v));
    }
    Err(PyTypeError::new_err("value must be float, int, bytes or str"))
}

// ---------------------------------------------------------------------------
// SimConnect class
// ---------------------------------------------------------------------------

/// A SimConnect session.
#[pyclass(unsendable, module = "simconnect_native")]
struct SimConnect {
    session: Session<Box<dyn NativeLayer>>,
}

#[pymethods]
impl SimConnect {
    #[new]
    #[pyo3(signature = (auto_connect=true, library_path=None, app_name=None))]
    fn new(
        auto_connect: bool,
        library_path: Option<String>,
        app_name: Option<String>,
    ) -> PyResult<Self> {
        let mut config = SessionConfig::default();
        if let Some(path) = library_path {
            config.library_path = Some(path.into());
        }
        if let Some(name) = app_name {
            config.app_name = name;
        }
        let mut session = Session::load(config).map_err(to_py_err)?;
        if auto_connect {
            session.connect().map_err(to_py_err)?;
        }
        Ok(Self { session })
    }

    /// Open the connection and wait for the simulator to answer.
    fn connect(&mut self) -> PyResult<()> {
        self.session.connect().map_err(to_py_err)
    }

    /// Run one pump cycle.
    fn run(&mut self) {
        self.session.pump_once();
    }

    /// Close the connection.
    fn exit(&mut self) -> bool {
        self.session.close()
    }

    #[getter]
    fn ok(&self) -> bool {
        self.session.is_open()
    }

    #[getter]
    fn quit(&self) -> bool {
        self.session.quit_requested()
    }

    /// Define a data block from `(name, units)` pairs and return its
    /// request id.
    fn new_request(&mut self, fields: Vec<(String, String)>) -> PyResult<u32> {
        let fields = fields
            .into_iter()
            .map(|(name, units)| Definition::new(name, units))
            .collect();
        self.session
            .new_request(fields)
            .map(u32::from)
            .ok_or_else(|| {
                PyRuntimeError::new_err("new_request: empty field list or AddToDataDefinition failed")
            })
    }

    fn request_data(&mut self, request_id: u32) -> bool {
        self.session.request_data(RequestId(request_id))
    }

    /// Request and wait; `True` when a value arrived in time.
    fn get_data(&mut self, request_id: u32) -> bool {
        self.session.get_data(RequestId(request_id))
    }

    /// Last value received for the request, or `None`.
    fn out_data(&self, py: Python<'_>, request_id: u32) -> PyObject {
        out_data_to_py(py, self.session.out_data(RequestId(request_id)))
    }

    /// Write the request's value back to the user aircraft.  When `value` is
    /// given it replaces the stored value first.
    #[pyo3(signature = (request_id, value=None))]
    fn set_data(&mut self, request_id: u32, value: Option<&Bound<'_, PyAny>>) -> PyResult<bool> {
        let id = RequestId(request_id);
        if let Some(value) = value {
            let data = out_data_from_py(value)?;
            let Some(request) = self.session.request_mut(id) else {
                return Ok(false);
            };
            request.out_data = Some(data);
        }
        Ok(self.session.set_data(id))
    }

    fn map_to_sim_event(&mut self, name: &str) -> Option<u32> {
        self.session.map_to_sim_event(name).map(u32::from)
    }

    #[pyo3(signature = (event_id, data=0))]
    fn send_event(&mut self, event_id: u32, data: u32) -> bool {
        self.session.send_event(EventId(event_id), data)
    }

    #[pyo3(signature = (group_id, event_id, maskable=false))]
    fn add_to_notification_group(&mut self, group_id: u32, event_id: u32, maskable: bool) -> bool {
        self.session
            .add_to_notification_group(GroupId(group_id), EventId(event_id), maskable)
    }

    /// Place the user aircraft.
    #[pyo3(signature = (altitude, latitude, longitude, airspeed, pitch=0.0, bank=0.0, heading=0.0, on_ground=false))]
    #[allow(clippy::too_many_arguments)]
    fn set_pos(
        &mut self,
        altitude: f64,
        latitude: f64,
        longitude: f64,
        airspeed: u32,
        pitch: f64,
        bank: f64,
        heading: f64,
        on_ground: bool,
    ) -> bool {
        let pos = InitPosition {
            pitch,
            bank,
            heading,
            on_ground,
            ..InitPosition::new(altitude, latitude, longitude, airspeed)
        };
        self.session.set_pos(&pos)
    }

    /// Hand `(latitude, longitude, altitude)` waypoints to the user object.
    fn add_waypoints(&mut self, waypoints: Vec<(f64, f64, f64)>) -> bool {
        let waypoints: Vec<Waypoint> = waypoints
            .into_iter()
            .map(|(lat, lon, alt)| Waypoint::new(lat, lon, alt))
            .collect();
        self.session.add_waypoints(&waypoints)
    }
}

// ---------------------------------------------------------------------------
// Module registration
// ---------------------------------------------------------------------------

/// Register the `simconnect_native` Python module.
#[pymodule]
fn simconnect_native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SimConnect>()?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Native Rust SimConnect client.")?;

    Ok(())
}
