//! Connection / polling loop and request lifecycle.
//!
//! A [`Session`] owns one native connection, the [`Dispatcher`] fed by it,
//! and the identifier pools.  All waiting is a bounded busy-poll: every
//! [`Session::pump_once`] sleeps the configured interval, then lets the
//! native layer deliver at most one record, which is dispatched in-line
//! before the call returns.
//!
//! # Failure model
//!
//! Native call failures degrade to `false` / `None` and a log line.  The
//! only fatal path is [`Session::connect_or_exit`] (and [`connect_or_exit`]),
//! which terminates the process when the simulator cannot be reached.
//!
//! # Thread safety
//!
//! A session is driven from one thread.  Abandoning [`Session::await_result`]
//! between iterations is the only way to cancel a wait.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::blocks::{InitPosition, Waypoint};
use crate::config::SessionConfig;
use crate::dispatch::{ConnectionState, Dispatcher};
use crate::errors::SimConnectError;
use crate::facility::{FacilityListener, SharedDump};
use crate::ids::{
    DefinitionId, EventId, GroupId, IdPool, RequestId, SIM_START_EVENT_NAME,
};
use crate::native::{
    self, DataType, NativeLayer, SimObjectType, EVENT_FLAG_GROUPID_IS_PRIORITY,
    GROUP_PRIORITY_HIGHEST, OBJECT_ID_USER, UNUSED,
};
use crate::recv::FacilityListKind;
use crate::request::{Definition, OutData, Request};

/// System event the session subscribes to on connect.
pub const SIM_START_SYSTEM_EVENT: &str = "SimStart";

/// Width of the string slot registered for string fields.
const STRING_FIELD_LEN: usize = 256;

pub struct Session<N: NativeLayer> {
    native: N,
    config: SessionConfig,
    dispatcher: Dispatcher,
    events: IdPool<EventId>,
    /// Events whose `MapClientEventToSimEvent` succeeded.
    mapped: HashSet<EventId>,
    definitions: IdPool<DefinitionId>,
    requests: IdPool<RequestId>,
    sim_start: EventId,
    definition_pos: Option<DefinitionId>,
    definition_waypoint: Option<DefinitionId>,
}

impl Session<Box<dyn NativeLayer>> {
    /// Load `SimConnect.dll` as configured and build an unopened session.
    pub fn load(config: SessionConfig) -> Result<Self, SimConnectError> {
        config.validate()?;
        let native = native::load(&config.library())?;
        Ok(Self::new(native, config))
    }
}

/// Load, open and wait for the simulator, or terminate the process.
///
/// This is the top-level fail-fast entry point used by the CLI tools.
pub fn connect_or_exit(config: SessionConfig) -> Session<Box<dyn NativeLayer>> {
    let mut session = match Session::load(config) {
        Ok(session) => session,
        Err(e) => {
            error!("Did not find Flight Simulator running: {e}");
            std::process::exit(1);
        }
    };
    session.connect_or_exit();
    session
}

impl<N: NativeLayer> Session<N> {
    pub fn new(native: N, config: SessionConfig) -> Self {
        let events = IdPool::events();
        let sim_start = events
            .find(SIM_START_EVENT_NAME)
            .unwrap_or(EventId(crate::ids::POOL_BASE));
        Self {
            native,
            config,
            dispatcher: Dispatcher::new(sim_start),
            events,
            mapped: HashSet::new(),
            definitions: IdPool::new("Definition"),
            requests: IdPool::new("Request"),
            sim_start,
            definition_pos: None,
            definition_waypoint: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn state(&self) -> ConnectionState {
        self.dispatcher.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn quit_requested(&self) -> bool {
        self.state() == ConnectionState::QuitRequested
    }

    pub fn sim_start_event(&self) -> EventId {
        self.sim_start
    }

    pub fn events(&self) -> &IdPool<EventId> {
        &self.events
    }

    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.dispatcher.registry().get(id)
    }

    pub fn request_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.dispatcher.registry_mut().get_mut(id)
    }

    /// Output slot of a request, if resolved.
    pub fn out_data(&self, id: RequestId) -> Option<&OutData> {
        self.request(id).and_then(|r| r.out_data.as_ref())
    }

    // -----------------------------------------------------------------------
    // Connection / polling loop
    // -----------------------------------------------------------------------

    /// Open the native session, subscribe to "SimStart", and pump until the
    /// open confirmation arrives.
    ///
    /// The wait ends early on a quit record, or after `open_attempts` pumps
    /// when that bound is configured.
    pub fn connect(&mut self) -> Result<(), SimConnectError> {
        self.native.open(&self.config.app_name)?;
        debug!("Connected to Flight Simulator!");

        let hr = self
            .native
            .subscribe_to_system_event(self.sim_start, SIM_START_SYSTEM_EVENT);
        if !hr.is_ok() {
            warn!("SubscribeToSystemEvent({SIM_START_SYSTEM_EVENT}) failed: {hr}");
        }

        let mut attempts: u32 = 0;
        loop {
            match self.state() {
                ConnectionState::Open => return Ok(()),
                ConnectionState::QuitRequested => return Err(SimConnectError::QuitBeforeOpen),
                ConnectionState::NotOpen => {}
            }
            if let Some(limit) = self.config.open_attempts {
                if attempts >= limit {
                    return Err(SimConnectError::OpenTimeout { attempts });
                }
            }
            self.pump_once();
            attempts += 1;
        }
    }

    /// [`Session::connect`], terminating the process on failure.
    pub fn connect_or_exit(&mut self) {
        if let Err(e) = self.connect() {
            error!("Did not find Flight Simulator running: {e}");
            std::process::exit(1);
        }
    }

    /// Sleep the configured interval, then deliver and dispatch at most one
    /// record.
    pub fn pump_once(&mut self) {
        let interval = self.config.pump_interval();
        self.pump_with(interval);
    }

    fn pump_with(&mut self, interval: Duration) {
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
        let dispatcher = &mut self.dispatcher;
        let hr = self
            .native
            .call_dispatch(&mut |raw: &[u8]| dispatcher.dispatch(raw));
        if !hr.is_ok() {
            debug!("CallDispatch failed: {hr}");
        }
    }

    /// `SimConnect_Close`.
    pub fn close(&mut self) -> bool {
        let hr = self.native.close();
        if !hr.is_ok() {
            warn!("Close failed: {hr}");
        }
        hr.is_ok()
    }

    // -----------------------------------------------------------------------
    // Identifier allocation
    // -----------------------------------------------------------------------

    pub fn new_def_id(&mut self) -> DefinitionId {
        self.definitions.allocate()
    }

    pub fn new_request_id(&mut self) -> RequestId {
        self.requests.allocate()
    }

    /// Map a simulator event name to a client event ID.
    ///
    /// Names already mapped return their existing ID without a native call.
    /// A name whose mapping failed keeps its ID and is mapped again on the
    /// next call.
    pub fn map_to_sim_event(&mut self, name: &str) -> Option<EventId> {
        let (event, _) = self.events.allocate_named(name);
        if self.mapped.contains(&event) {
            debug!("Already have event: {name} ({event})");
            return Some(event);
        }
        let hr = self.native.map_client_event_to_sim_event(event, name);
        if hr.is_ok() {
            self.mapped.insert(event);
            Some(event)
        } else {
            error!("Error: MapToSimEvent({name}): {hr}");
            None
        }
    }

    pub fn add_to_notification_group(
        &mut self,
        group: GroupId,
        event: EventId,
        maskable: bool,
    ) -> bool {
        let hr = self
            .native
            .add_client_event_to_notification_group(group, event, maskable);
        if !hr.is_ok() {
            warn!("AddClientEventToNotificationGroup({group}, {event}) failed: {hr}");
        }
        hr.is_ok()
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Insert or overwrite a request in the registry.
    pub fn register_request(&mut self, request: Request) {
        self.dispatcher.registry_mut().register(request);
    }

    /// Define a data block from `fields` and register a request for it.
    ///
    /// Returns `None` for an empty field list, or when any
    /// `AddToDataDefinition` call fails.  A failed definition ID is
    /// abandoned, never reused.
    pub fn new_request(&mut self, fields: Vec<Definition>) -> Option<RequestId> {
        if fields.is_empty() {
            warn!("new_request: no fields to define");
            return None;
        }
        let definition_id = self.new_def_id();
        for (index, field) in fields.iter().enumerate() {
            // String datums take no units.
            let units = if field.is_string() { "" } else { field.type_name.as_str() };
            let hr = self.native.add_to_data_definition(
                definition_id,
                &field.name,
                units,
                field.data_type(),
                0.0,
                UNUSED,
            );
            if !hr.is_ok() {
                error!(
                    "AddToDataDefinition({}) failed: {hr}; abandoning definition {definition_id} \
                     after {index} of {} fields",
                    field.name,
                    fields.len()
                );
                return None;
            }
        }
        let request_id = self.new_request_id();
        self.register_request(Request::new(request_id, definition_id, fields));
        Some(request_id)
    }

    /// Begin a send: clear the output slot, request the user object's data,
    /// and remember the packet ID for exception correlation.
    pub fn request_data(&mut self, id: RequestId) -> bool {
        let Some(request) = self.dispatcher.registry_mut().get_mut(id) else {
            warn!("request_data: request {id} is not registered");
            return false;
        };
        request.out_data = None;
        let definition = request.definition_id;

        let hr = self.native.request_data_on_sim_object_type(
            id,
            definition,
            0,
            SimObjectType::User,
        );
        // The last sent packet only belongs to this request if the send went out.
        let last_sent = if hr.is_ok() {
            self.native.get_last_sent_packet_id().ok()
        } else {
            warn!("RequestDataOnSimObjectType({id}) failed: {hr}");
            None
        };
        if let Some(request) = self.dispatcher.registry_mut().get_mut(id) {
            request.last_sent_id = last_sent;
        }
        hr.is_ok()
    }

    /// Pump until the request's output slot is filled, at most
    /// `max_attempts` times.  A timeout is `false`, not an error.
    pub fn await_result(&mut self, id: RequestId, max_attempts: u32, poll_interval: Duration) -> bool {
        if !self.dispatcher.registry().contains(id) {
            return false;
        }
        for _ in 0..max_attempts {
            if self.is_resolved(id) {
                return true;
            }
            self.pump_with(poll_interval);
        }
        self.is_resolved(id)
    }

    /// [`Session::request_data`] followed by [`Session::await_result`] with
    /// the configured attempts and interval.
    pub fn get_data(&mut self, id: RequestId) -> bool {
        if !self.request_data(id) {
            return false;
        }
        let attempts = self.config.max_attempts;
        let interval = self.config.pump_interval();
        self.await_result(id, attempts, interval)
    }

    fn is_resolved(&self, id: RequestId) -> bool {
        self.request(id).is_some_and(Request::is_resolved)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Write a request's output slot back to the user object.
    ///
    /// Numeric slots are written as one `f64`; byte slots as a NUL-padded
    /// 256-byte string.  An empty slot writes nothing and returns `false`.
    pub fn set_data(&mut self, id: RequestId) -> bool {
        let Some(request) = self.request(id) else {
            warn!("set_data: request {id} is not registered");
            return false;
        };
        let definition = request.definition_id;
        let payload = match &request.out_data {
            Some(OutData::Float(v)) => v.to_le_bytes().to_vec(),
            Some(OutData::Bytes(bytes)) => {
                let mut buf = vec![0u8; STRING_FIELD_LEN];
                let n = bytes.len().min(STRING_FIELD_LEN - 1);
                buf[..n].copy_from_slice(&bytes[..n]);
                buf
            }
            None => {
                warn!("set_data: request {id} has no value to write");
                return false;
            }
        };

        let hr = self.native.set_data_on_sim_object(
            definition,
            OBJECT_ID_USER,
            0,
            0,
            payload.len() as u32,
            &payload,
        );
        hr.is_ok()
    }

    /// Transmit a client event to the user object at highest priority.
    pub fn send_event(&mut self, event: EventId, data: u32) -> bool {
        let hr = self.native.transmit_client_event(
            OBJECT_ID_USER,
            event,
            data,
            GROUP_PRIORITY_HIGHEST,
            EVENT_FLAG_GROUPID_IS_PRIORITY,
        );
        hr.is_ok()
    }

    /// Place the user aircraft.  The "Initial Position" definition is
    /// registered on first use.
    pub fn set_pos(&mut self, pos: &InitPosition) -> bool {
        let Some(definition) = self.structured_definition(
            Structured::InitPosition,
            "Initial Position",
            "",
            DataType::InitPosition,
        ) else {
            return false;
        };
        let data = pos.to_bytes();
        let hr = self.native.set_data_on_sim_object(
            definition,
            OBJECT_ID_USER,
            0,
            0,
            data.len() as u32,
            &data,
        );
        hr.is_ok()
    }

    /// Hand a waypoint list to the user object's AI.  The
    /// "AI WAYPOINT LIST" definition is registered on first use.
    pub fn add_waypoints(&mut self, waypoints: &[Waypoint]) -> bool {
        if waypoints.is_empty() {
            warn!("add_waypoints: empty waypoint list");
            return false;
        }
        let Some(definition) = self.structured_definition(
            Structured::Waypoint,
            "AI WAYPOINT LIST",
            "number",
            DataType::Waypoint,
        ) else {
            return false;
        };
        let data: Vec<u8> = waypoints.iter().flat_map(Waypoint::to_bytes).collect();
        let hr = self.native.set_data_on_sim_object(
            definition,
            OBJECT_ID_USER,
            0,
            waypoints.len() as u32,
            Waypoint::SIZE as u32,
            &data,
        );
        hr.is_ok()
    }

    /// Cached single-field definition for a structured datatype.  A failed
    /// registration is not cached, so the next call retries.
    fn structured_definition(
        &mut self,
        kind: Structured,
        datum: &str,
        units: &str,
        data_type: DataType,
    ) -> Option<DefinitionId> {
        let cached = match kind {
            Structured::InitPosition => self.definition_pos,
            Structured::Waypoint => self.definition_waypoint,
        };
        if cached.is_some() {
            return cached;
        }

        let definition = self.new_def_id();
        let hr = self
            .native
            .add_to_data_definition(definition, datum, units, data_type, 0.0, UNUSED);
        if !hr.is_ok() {
            error!("AddToDataDefinition({datum}) failed: {hr}");
            return None;
        }
        match kind {
            Structured::InitPosition => self.definition_pos = Some(definition),
            Structured::Waypoint => self.definition_waypoint = Some(definition),
        }
        Some(definition)
    }

    // -----------------------------------------------------------------------
    // Facilities
    // -----------------------------------------------------------------------

    pub fn add_facility_listener(&mut self, listener: FacilityListener) {
        self.dispatcher.add_facility_listener(listener);
    }

    /// Request a facility list, routing the answer to `parent` then `sink`.
    pub fn request_facilities_list(
        &mut self,
        kind: FacilityListKind,
        parent: SharedDump,
        sink: SharedDump,
    ) -> Option<RequestId> {
        let request_id = self.new_request_id();
        self.add_facility_listener(FacilityListener::new(request_id, parent, sink));
        let hr = self.native.request_facilities_list(kind, request_id);
        if hr.is_ok() {
            info!("Requested {kind:?} list as request {request_id}");
            Some(request_id)
        } else {
            error!("RequestFacilitiesList({kind:?}) failed: {hr}");
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Structured {
    InitPosition,
    Waypoint,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
