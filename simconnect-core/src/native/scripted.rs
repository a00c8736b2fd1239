//! In-memory [`NativeLayer`] that replays prepared records.
//!
//! [`ScriptedNative`] records every call, delivers queued records one per
//! `call_dispatch`, answers data requests with records prepared per request
//! ID, and can be told to fail chosen entry points.  Together with the record
//! builders at the bottom of this module it lets the session run end to end
//! without a simulator.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{DataType, DispatchSink, HResult, NativeLayer, SimObjectType};
use crate::errors::SimConnectError;
use crate::ids::{DefinitionId, EventId, GroupId, RequestId};
use crate::recv::{
    Facility, FacilityListKind, RecvKind, APP_NAME_LEN, EVENT_SIZE, EXCEPTION_SIZE,
    FACILITY_LIST_HEADER_SIZE, HEADER_SIZE, ICAO_LEN, OBJECT_DATA_HEADER_SIZE, OPEN_SIZE,
};

/// Entry points, used to select calls to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    Open,
    Close,
    CallDispatch,
    SubscribeToSystemEvent,
    MapClientEventToSimEvent,
    AddClientEventToNotificationGroup,
    AddToDataDefinition,
    RequestDataOnSimObjectType,
    SetDataOnSimObject,
    TransmitClientEvent,
    GetLastSentPacketId,
    RequestFacilitiesList,
}

/// One recorded call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Open { app_name: String },
    Close,
    CallDispatch,
    SubscribeToSystemEvent { event: EventId, name: String },
    MapClientEventToSimEvent { event: EventId, name: String },
    AddClientEventToNotificationGroup { group: GroupId, event: EventId, maskable: bool },
    AddToDataDefinition { definition: DefinitionId, datum_name: String, units: String, data_type: DataType },
    RequestDataOnSimObjectType { request: RequestId, definition: DefinitionId, radius_meters: u32, object_type: SimObjectType },
    SetDataOnSimObject { definition: DefinitionId, object_id: u32, flags: u32, array_count: u32, unit_size: u32, data: Vec<u8> },
    TransmitClientEvent { object_id: u32, event: EventId, data: u32, group: u32, flags: u32 },
    GetLastSentPacketId,
    RequestFacilitiesList { kind: FacilityListKind, request: RequestId },
}

/// Scripted stand-in for `SimConnect.dll`.
#[derive(Debug)]
pub struct ScriptedNative {
    inbox: VecDeque<Vec<u8>>,
    replies: HashMap<RequestId, VecDeque<Vec<u8>>>,
    calls: Vec<NativeCall>,
    failing: HashSet<Entry>,
    /// Queue an open confirmation when `open` succeeds.
    auto_open: bool,
    next_packet_id: u32,
    opened: bool,
}

impl Default for ScriptedNative {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedNative {
    pub fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            replies: HashMap::new(),
            calls: Vec::new(),
            failing: HashSet::new(),
            auto_open: true,
            next_packet_id: 1,
            opened: false,
        }
    }

    /// Do not queue an open record on `open`; the test pushes its own.
    pub fn without_auto_open(mut self) -> Self {
        self.auto_open = false;
        self
    }

    /// Make `entry` fail from now on (`E_FAIL`, or an error for `Open`).
    pub fn fail(&mut self, entry: Entry) {
        self.failing.insert(entry);
    }

    pub fn recover(&mut self, entry: Entry) {
        self.failing.remove(&entry);
    }

    /// Queue a record for a later `call_dispatch`.
    pub fn push(&mut self, record: Vec<u8>) {
        self.inbox.push_back(record);
    }

    /// Queue `record` when data or facilities are requested under `request`.
    pub fn reply_to(&mut self, request: RequestId, record: Vec<u8>) {
        self.replies.entry(request).or_default().push_back(record);
    }

    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    /// Number of `call_dispatch` invocations so far.
    pub fn dispatch_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, NativeCall::CallDispatch))
            .count()
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    fn result(&self, entry: Entry) -> HResult {
        if self.failing.contains(&entry) {
            HResult::E_FAIL
        } else {
            HResult::S_OK
        }
    }

    /// Record a packet-producing call and return its status.
    fn send(&mut self, entry: Entry, call: NativeCall) -> HResult {
        self.calls.push(call);
        let hr = self.result(entry);
        if hr.is_ok() {
            self.next_packet_id += 1;
        }
        hr
    }

    fn release_replies(&mut self, request: RequestId) {
        if let Some(queued) = self.replies.get_mut(&request) {
            if let Some(record) = queued.pop_front() {
                self.inbox.push_back(record);
            }
        }
    }
}

impl NativeLayer for ScriptedNative {
    fn open(&mut self, app_name: &str) -> Result<(), SimConnectError> {
        self.calls.push(NativeCall::Open {
            app_name: app_name.to_owned(),
        });
        if self.failing.contains(&Entry::Open) {
            return Err(SimConnectError::Open(format!(
                "SimConnect_Open failed: {}",
                HResult::E_FAIL
            )));
        }
        self.opened = true;
        if self.auto_open {
            self.inbox.push_back(open_record(app_name));
        }
        Ok(())
    }

    fn close(&mut self) -> HResult {
        self.calls.push(NativeCall::Close);
        self.opened = false;
        self.result(Entry::Close)
    }

    fn call_dispatch(&mut self, sink: &mut DispatchSink<'_>) -> HResult {
        self.calls.push(NativeCall::CallDispatch);
        let hr = self.result(Entry::CallDispatch);
        if hr.is_ok() {
            if let Some(record) = self.inbox.pop_front() {
                sink(&record);
            }
        }
        hr
    }

    fn subscribe_to_system_event(&mut self, event: EventId, name: &str) -> HResult {
        self.send(
            Entry::SubscribeToSystemEvent,
            NativeCall::SubscribeToSystemEvent {
                event,
                name: name.to_owned(),
            },
        )
    }

    fn map_client_event_to_sim_event(&mut self, event: EventId, name: &str) -> HResult {
        self.send(
            Entry::MapClientEventToSimEvent,
            NativeCall::MapClientEventToSimEvent {
                event,
                name: name.to_owned(),
            },
        )
    }

    fn add_client_event_to_notification_group(
        &mut self,
        group: GroupId,
        event: EventId,
        maskable: bool,
    ) -> HResult {
        self.send(
            Entry::AddClientEventToNotificationGroup,
            NativeCall::AddClientEventToNotificationGroup {
                group,
                event,
                maskable,
            },
        )
    }

    fn add_to_data_definition(
        &mut self,
        definition: DefinitionId,
        datum_name: &str,
        units: &str,
        data_type: DataType,
        _epsilon: f32,
        _datum_id: u32,
    ) -> HResult {
        self.send(
            Entry::AddToDataDefinition,
            NativeCall::AddToDataDefinition {
                definition,
                datum_name: datum_name.to_owned(),
                units: units.to_owned(),
                data_type,
            },
        )
    }

    fn request_data_on_sim_object_type(
        &mut self,
        request: RequestId,
        definition: DefinitionId,
        radius_meters: u32,
        object_type: SimObjectType,
    ) -> HResult {
        let hr = self.send(
            Entry::RequestDataOnSimObjectType,
            NativeCall::RequestDataOnSimObjectType {
                request,
                definition,
                radius_meters,
                object_type,
            },
        );
        if hr.is_ok() {
            self.release_replies(request);
        }
        hr
    }

    fn set_data_on_sim_object(
        &mut self,
        definition: DefinitionId,
        object_id: u32,
        flags: u32,
        array_count: u32,
        unit_size: u32,
        data: &[u8],
    ) -> HResult {
        self.send(
            Entry::SetDataOnSimObject,
            NativeCall::SetDataOnSimObject {
                definition,
                object_id,
                flags,
                array_count,
                unit_size,
                data: data.to_vec(),
            },
        )
    }

    fn transmit_client_event(
        &mut self,
        object_id: u32,
        event: EventId,
        data: u32,
        group: u32,
        flags: u32,
    ) -> HResult {
        self.send(
            Entry::TransmitClientEvent,
            NativeCall::TransmitClientEvent {
                object_id,
                event,
                data,
                group,
                flags,
            },
        )
    }

    fn get_last_sent_packet_id(&mut self) -> Result<u32, HResult> {
        self.calls.push(NativeCall::GetLastSentPacketId);
        let hr = self.result(Entry::GetLastSentPacketId);
        if hr.is_ok() {
            Ok(self.next_packet_id - 1)
        } else {
            Err(hr)
        }
    }

    fn request_facilities_list(&mut self, kind: FacilityListKind, request: RequestId) -> HResult {
        let hr = self.send(
            Entry::RequestFacilitiesList,
            NativeCall::RequestFacilitiesList { kind, request },
        );
        if hr.is_ok() {
            while self.replies.get(&request).is_some_and(|q| !q.is_empty()) {
                self.release_replies(request);
            }
        }
        hr
    }
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

fn header(kind: RecvKind, size: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&(size as u32).to_le_bytes());
    // dwVersion
    buf.extend_from_slice(&4u32.to_le_bytes());
    buf.extend_from_slice(&kind.raw().to_le_bytes());
    buf
}

fn put_u32s(buf: &mut Vec<u8>, values: &[u32]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

/// Fixed-width, NUL-padded copy of `text` (truncated to leave a NUL).
fn fixed_str(buf: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(width.saturating_sub(1));
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

/// `SIMCONNECT_RECV_OPEN` for `app_name`.
pub fn open_record(app_name: &str) -> Vec<u8> {
    let mut buf = header(RecvKind::Open, OPEN_SIZE);
    fixed_str(&mut buf, app_name, APP_NAME_LEN);
    put_u32s(&mut buf, &[11, 0, 62651, 3, 11, 0, 62651, 3, 0, 0]);
    buf
}

/// `SIMCONNECT_RECV_QUIT`.
pub fn quit_record() -> Vec<u8> {
    header(RecvKind::Quit, HEADER_SIZE)
}

/// `SIMCONNECT_RECV_EVENT`.
pub fn event_record(group_id: u32, event: EventId, data: u32) -> Vec<u8> {
    let mut buf = header(RecvKind::Event, EVENT_SIZE);
    put_u32s(&mut buf, &[group_id, event.0, data]);
    buf
}

/// `SIMCONNECT_RECV_EXCEPTION`.
pub fn exception_record(exception: u32, send_id: u32, index: u32) -> Vec<u8> {
    let mut buf = header(RecvKind::Exception, EXCEPTION_SIZE);
    put_u32s(&mut buf, &[exception, send_id, index]);
    buf
}

/// `SIMCONNECT_RECV_SIMOBJECT_DATA_BYTYPE` with a raw payload.
pub fn object_data_record(
    request: RequestId,
    definition: DefinitionId,
    define_count: u32,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = header(
        RecvKind::SimObjectDataByType,
        OBJECT_DATA_HEADER_SIZE + payload.len(),
    );
    // dwRequestID, dwObjectID, dwDefineID, dwFlags, dwentrynumber, dwoutof, dwDefineCount
    put_u32s(&mut buf, &[request.0, 0, definition.0, 0, 1, 1, define_count]);
    buf.extend_from_slice(payload);
    buf
}

/// Object-data record carrying `values` as consecutive `f64`.
pub fn float_data_record(request: RequestId, definition: DefinitionId, values: &[f64]) -> Vec<u8> {
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    object_data_record(request, definition, values.len() as u32, &payload)
}

/// Facility list record of `kind` carrying `entries`.
pub fn facility_list_record(
    kind: FacilityListKind,
    request: RequestId,
    entry_number: u32,
    out_of: u32,
    entries: &[Facility],
) -> Vec<u8> {
    let size = FACILITY_LIST_HEADER_SIZE + entries.len() * kind.entry_size();
    let mut buf = header(kind.recv_kind(), size);
    put_u32s(&mut buf, &[request.0, entries.len() as u32, entry_number, out_of]);
    for entry in entries {
        fixed_str(&mut buf, &entry.icao, ICAO_LEN);
        for v in [entry.latitude, entry.longitude, entry.altitude] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        if kind != FacilityListKind::Airport {
            buf.extend_from_slice(&entry.mag_var.unwrap_or_default().to_le_bytes());
        }
        if matches!(kind, FacilityListKind::Ndb | FacilityListKind::Vor) {
            buf.extend_from_slice(&entry.frequency.unwrap_or_default().to_le_bytes());
        }
        if kind == FacilityListKind::Vor {
            let vor = entry.vor.unwrap_or(crate::recv::VorDetails {
                flags: 0,
                localizer: 0.0,
                glide_lat: 0.0,
                glide_lon: 0.0,
                glide_alt: 0.0,
                glide_slope_angle: 0.0,
            });
            buf.extend_from_slice(&vor.flags.to_le_bytes());
            buf.extend_from_slice(&vor.localizer.to_le_bytes());
            for v in [vor.glide_lat, vor.glide_lon, vor.glide_alt] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            buf.extend_from_slice(&vor.glide_slope_angle.to_le_bytes());
        }
    }
    debug_assert_eq!(buf.len(), size);
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
