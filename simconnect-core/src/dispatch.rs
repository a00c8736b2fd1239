//! Callback demultiplexer.
//!
//! [`Dispatcher::dispatch`] receives one raw record from `CallDispatch` and
//! routes it by kind.  It has no return value: its only effects are writes
//! to request output slots, connection-state transitions, and facility
//! listener calls.  Everything it needs is held in its own fields, so
//! several sessions can run side by side.

use log::{debug, info, warn};

use crate::facility::{FacilityListener, FacilityListeners};
use crate::ids::{EventId, RequestId};
use crate::recv::{EventRecord, ExceptionRecord, ObjectData, Recv};
use crate::registry::RequestRegistry;

/// Connection lifecycle.  `QuitRequested` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    NotOpen,
    Open,
    QuitRequested,
}

impl ConnectionState {
    fn on_open(self) -> Self {
        match self {
            ConnectionState::QuitRequested => self,
            _ => ConnectionState::Open,
        }
    }
}

/// The most recent exception and the request it was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionReport {
    pub record: ExceptionRecord,
    pub request: Option<RequestId>,
}

#[derive(Debug)]
pub struct Dispatcher {
    registry: RequestRegistry,
    facilities: FacilityListeners,
    state: ConnectionState,
    sim_start: EventId,
    last_exception: Option<ExceptionReport>,
}

impl Dispatcher {
    /// `sim_start` is the client event subscribed to the "SimStart" system
    /// event.
    pub fn new(sim_start: EventId) -> Self {
        Self {
            registry: RequestRegistry::new(),
            facilities: FacilityListeners::new(),
            state: ConnectionState::NotOpen,
            sim_start,
            last_exception: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RequestRegistry {
        &mut self.registry
    }

    pub fn last_exception(&self) -> Option<&ExceptionReport> {
        self.last_exception.as_ref()
    }

    pub fn facilities(&self) -> &FacilityListeners {
        &self.facilities
    }

    pub fn add_facility_listener(&mut self, listener: FacilityListener) {
        self.facilities.register(listener);
    }

    /// Route one raw record.
    pub fn dispatch(&mut self, raw: &[u8]) {
        match Recv::parse(raw) {
            Ok(record) => self.handle(record),
            Err(e) => debug!("Dropped record: {e}"),
        }
    }

    /// Route one decoded record.
    pub fn handle(&mut self, record: Recv<'_>) {
        match record {
            Recv::Event(event) => self.handle_event(&event),
            Recv::ObjectDataByType(data) => {
                self.handle_object_data(&data);
            }
            Recv::Open(open) => {
                info!("SIM OPEN ({})", open.application_name);
                self.state = self.state.on_open();
            }
            Recv::Exception(exc) => {
                let request = self.handle_exception(&exc);
                self.last_exception = Some(ExceptionReport {
                    record: exc,
                    request,
                });
            }
            Recv::FacilityList(list) => {
                self.facilities.fan_out(&list);
            }
            Recv::Quit => {
                info!("SIM QUIT");
                self.state = ConnectionState::QuitRequested;
            }
            Recv::Other(kind) => debug!("Received: {kind:?}"),
        }
    }

    fn handle_event(&self, event: &EventRecord) {
        if event.event_id == self.sim_start {
            info!("SIM START");
        }
        // Other client events have no handler yet.
    }

    /// Store the payload on the owning request.  Returns the request that
    /// was updated.
    fn handle_object_data(&mut self, data: &ObjectData<'_>) -> Option<RequestId> {
        let Some(request) = self.registry.get_mut(data.request_id) else {
            warn!("Event ID: {} Not Handled.", data.request_id);
            return None;
        };
        if !request.store_payload(data.data) {
            warn!(
                "Request {}: payload of {} bytes holds no value",
                data.request_id,
                data.data.len()
            );
            return None;
        }
        Some(data.request_id)
    }

    /// Log the exception, attributing it to the first request whose last
    /// send matches.  Returns that request, if any.
    fn handle_exception(&self, exc: &ExceptionRecord) -> Option<RequestId> {
        let name = exc.name();
        match self.registry.find_by_send_id(exc.send_id) {
            Some(request) => {
                match request.first_definition() {
                    Some(def) => warn!("{name}: in {def}"),
                    None => warn!("{name}: in request {}", request.request_id),
                }
                Some(request.request_id)
            }
            None => {
                warn!("{name}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::facility::{shared, SharedDump};
    use crate::ids::DefinitionId;
    use crate::native::scripted::{
        event_record, exception_record, facility_list_record, float_data_record,
        object_data_record, open_record, quit_record,
    };
    use crate::recv::{FacilityList, FacilityListKind};
    use crate::request::{Definition, OutData, Request};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(EventId(1))
    }

    fn register(d: &mut Dispatcher, id: u32, fields: &[(&str, &str)]) {
        d.registry_mut().register(Request::new(
            RequestId(id),
            DefinitionId(id),
            fields.iter().map(|(n, t)| Definition::new(*n, *t)).collect(),
        ));
    }

    fn out(d: &Dispatcher, id: u32) -> Option<OutData> {
        d.registry().get(RequestId(id)).and_then(|r| r.out_data.clone())
    }

    #[test]
    fn test_scenario_float_request() {
        let mut d = dispatcher();
        register(&mut d, 7, &[("ALTITUDE", "Float64")]);
        d.dispatch(&float_data_record(RequestId(7), DefinitionId(7), &[12345.0]));
        assert_eq!(out(&d, 7), Some(OutData::Float(12345.0)));
    }

    #[test]
    fn test_scenario_string_request() {
        let mut d = dispatcher();
        register(&mut d, 9, &[("TITLE", "String256")]);
        d.dispatch(&object_data_record(RequestId(9), DefinitionId(9), 1, b"Cessna 172\0"));
        assert_eq!(out(&d, 9), Some(OutData::Bytes(b"Cessna 172".to_vec())));
    }

    #[test]
    fn test_multi_field_keeps_first_value() {
        let mut d = dispatcher();
        register(&mut d, 2, &[("LAT", "degrees"), ("LON", "degrees"), ("ALT", "feet")]);
        d.dispatch(&float_data_record(RequestId(2), DefinitionId(2), &[47.0, -122.0, 500.0]));
        assert_eq!(out(&d, 2), Some(OutData::Float(47.0)));
    }

    #[test]
    fn test_unregistered_request_is_dropped() {
        let mut d = dispatcher();
        register(&mut d, 7, &[("ALTITUDE", "Float64")]);
        d.dispatch(&float_data_record(RequestId(8), DefinitionId(8), &[1.0]));
        assert_eq!(out(&d, 7), None);
        assert!(!d.registry().contains(RequestId(8)));
    }

    #[test]
    fn test_open_then_quit_transitions() {
        let mut d = dispatcher();
        assert_eq!(d.state(), ConnectionState::NotOpen);
        d.dispatch(&open_record("Test"));
        assert_eq!(d.state(), ConnectionState::Open);
        d.dispatch(&quit_record());
        assert_eq!(d.state(), ConnectionState::QuitRequested);
    }

    #[test]
    fn test_quit_is_terminal() {
        let mut d = dispatcher();
        d.dispatch(&quit_record());
        d.dispatch(&open_record("Late"));
        assert_eq!(d.state(), ConnectionState::QuitRequested);
    }

    #[test]
    fn test_events_do_not_touch_state() {
        let mut d = dispatcher();
        d.dispatch(&event_record(0, EventId(1), 0));
        d.dispatch(&event_record(0, EventId(42), 7));
        assert_eq!(d.state(), ConnectionState::NotOpen);
    }

    #[test]
    fn test_exception_first_match_wins() {
        let mut d = dispatcher();
        register(&mut d, 4, &[("FIRST", "feet")]);
        register(&mut d, 2, &[("SECOND", "feet")]);
        for id in [4, 2] {
            d.registry_mut().get_mut(RequestId(id)).unwrap().last_sent_id = Some(31);
        }
        let exc = match Recv::parse(&exception_record(3, 31, 0)).unwrap() {
            Recv::Exception(e) => e,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(d.handle_exception(&exc), Some(RequestId(4)));
    }

    #[test]
    fn test_exception_without_match() {
        let mut d = dispatcher();
        register(&mut d, 4, &[("ALT", "feet")]);
        d.dispatch(&exception_record(1, 99, 0));
        let exc = ExceptionRecord {
            exception: 1,
            send_id: 99,
            index: 0,
        };
        assert_eq!(d.handle_exception(&exc), None);
        assert_eq!(d.last_exception().map(|r| r.request), Some(None));
        assert_eq!(d.state(), ConnectionState::NotOpen);
    }

    #[test]
    fn test_facility_records_reach_listeners() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = |tag: &'static str| -> SharedDump {
            let hits = Arc::clone(&hits);
            shared(move |list: &FacilityList<'_>| hits.lock().push((tag, list.request_id)))
        };
        let mut d = dispatcher();
        d.add_facility_listener(FacilityListener::new(RequestId(3), sink("parent"), sink("own")));
        d.add_facility_listener(FacilityListener::new(RequestId(4), sink("parent"), sink("other")));

        d.dispatch(&facility_list_record(FacilityListKind::Waypoint, RequestId(3), 0, 1, &[]));
        assert_eq!(
            *hits.lock(),
            [("parent", RequestId(3)), ("own", RequestId(3))]
        );
    }

    #[test]
    fn test_garbage_is_ignored() {
        let mut d = dispatcher();
        d.dispatch(&[1, 2, 3]);
        d.dispatch(&[]);
        assert_eq!(d.state(), ConnectionState::NotOpen);
    }
}
