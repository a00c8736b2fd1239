//! End-to-end session tests against the scripted native layer.

use std::time::Duration;

use simconnect_core::blocks::InitPosition;
use simconnect_core::config::SessionConfig;
use simconnect_core::dispatch::ConnectionState;
use simconnect_core::facility::{shared, FacilityCollector, SharedDump};
use simconnect_core::ids::{GroupId, RequestId, POOL_BASE};
use simconnect_core::native::scripted::{
    event_record, exception_record, facility_list_record, float_data_record, object_data_record,
    quit_record, Entry, NativeCall, ScriptedNative,
};
use simconnect_core::recv::{Facility, FacilityListKind};
use simconnect_core::request::{Definition, OutData};
use simconnect_core::{Session, SimConnectError};

fn config() -> SessionConfig {
    SessionConfig {
        app_name: "Session Tests".into(),
        pump_interval_ms: 0,
        ..SessionConfig::default()
    }
}

fn connected() -> Session<ScriptedNative> {
    let mut session = Session::new(ScriptedNative::new(), config());
    session.connect().expect("scripted open");
    session
}

fn airport(icao: &str, lat: f64) -> Facility {
    Facility {
        icao: icao.into(),
        latitude: lat,
        longitude: -122.0,
        altitude: 400.0,
        mag_var: None,
        frequency: None,
        vor: None,
    }
}

#[test]
fn test_open_passes_app_name() {
    let session = connected();
    assert_eq!(
        session.native().calls().first(),
        Some(&NativeCall::Open {
            app_name: "Session Tests".into()
        })
    );
    assert_eq!(session.state(), ConnectionState::Open);
}

#[test]
fn test_altitude_read() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ALTITUDE", "Float64")])
        .unwrap();
    let def = session.request(id).unwrap().definition_id;
    session
        .native_mut()
        .reply_to(id, float_data_record(id, def, &[12345.0]));

    assert!(session.get_data(id));
    assert_eq!(
        session.out_data(id).and_then(OutData::as_f64),
        Some(12345.0)
    );
}

#[test]
fn test_title_read() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("TITLE", "String256")])
        .unwrap();
    let def = session.request(id).unwrap().definition_id;
    let mut payload = b"Cessna 172".to_vec();
    payload.resize(256, 0);
    session
        .native_mut()
        .reply_to(id, object_data_record(id, def, 1, &payload));

    assert!(session.get_data(id));
    assert_eq!(
        session.out_data(id),
        Some(&OutData::Bytes(b"Cessna 172".to_vec()))
    );
}

#[test]
fn test_timeout_pumps_exactly_max_attempts() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ALTITUDE", "feet")])
        .unwrap();
    let before = session.native().dispatch_count();

    assert!(!session.get_data(id));
    assert_eq!(
        session.native().dispatch_count() - before,
        session.config().max_attempts as usize
    );
    assert!(session.out_data(id).is_none());
}

#[test]
fn test_late_reply_for_other_request_is_dropped() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ALTITUDE", "feet")])
        .unwrap();
    let def = session.request(id).unwrap().definition_id;
    session
        .native_mut()
        .push(float_data_record(RequestId(500), def, &[1.0]));

    assert!(!session.await_result(id, 2, Duration::ZERO));
    assert!(session.out_data(id).is_none());
    assert_eq!(session.dispatcher().registry().len(), 1);
}

#[test]
fn test_second_send_clears_previous_value() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ALTITUDE", "feet")])
        .unwrap();
    let def = session.request(id).unwrap().definition_id;
    session
        .native_mut()
        .reply_to(id, float_data_record(id, def, &[100.0]));
    assert!(session.get_data(id));

    assert!(session.request_data(id));
    assert!(session.out_data(id).is_none());
}

#[test]
fn test_exception_attributed_to_last_send() {
    let mut session = connected();
    let a = session
        .new_request(vec![Definition::new("BAD VAR", "feet")])
        .unwrap();
    let b = session
        .new_request(vec![Definition::new("ALTITUDE", "feet")])
        .unwrap();
    assert!(session.request_data(a));
    assert!(session.request_data(b));
    let sent_b = session.request(b).unwrap().last_sent_id.unwrap();
    let sent_a = session.request(a).unwrap().last_sent_id.unwrap();
    assert_ne!(sent_a, sent_b);

    // NAME_UNRECOGNIZED
    session.native_mut().push(exception_record(7, sent_b, 1));
    session.pump_once();
    assert!(session.is_open());
    let report = session.dispatcher().last_exception().unwrap();
    assert_eq!(report.record.send_id, sent_b);
    assert_eq!(report.request, Some(b));
}

#[test]
fn test_failed_send_does_not_steal_exception() {
    let mut session = connected();
    let a = session
        .new_request(vec![Definition::new("FIRST", "feet")])
        .unwrap();
    let b = session
        .new_request(vec![Definition::new("SECOND", "feet")])
        .unwrap();
    assert!(session.request_data(b));
    let sent_b = session.request(b).unwrap().last_sent_id.unwrap();

    session.native_mut().fail(Entry::RequestDataOnSimObjectType);
    assert!(!session.request_data(a));
    assert_ne!(session.request(a).unwrap().last_sent_id, Some(sent_b));

    session.native_mut().push(exception_record(7, sent_b, 1));
    session.pump_once();
    assert_eq!(
        session.dispatcher().last_exception().and_then(|r| r.request),
        Some(b)
    );
}

#[test]
fn test_quit_during_wait() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ALTITUDE", "feet")])
        .unwrap();
    session.native_mut().push(quit_record());
    assert!(!session.get_data(id));
    assert!(session.quit_requested());
    assert!(session.close());
    assert!(!session.native().is_open());
}

#[test]
fn test_sim_start_event_keeps_state() {
    let mut session = connected();
    let sim_start = session.sim_start_event();
    session.native_mut().push(event_record(0, sim_start, 0));
    session.pump_once();
    assert_eq!(session.state(), ConnectionState::Open);
}

#[test]
fn test_connect_error_paths() {
    let mut native = ScriptedNative::new();
    native.fail(Entry::Open);
    let mut session = Session::new(native, config());
    assert!(matches!(session.connect(), Err(SimConnectError::Open(_))));

    let bounded = SessionConfig {
        open_attempts: Some(5),
        ..config()
    };
    let mut session = Session::new(ScriptedNative::new().without_auto_open(), bounded);
    assert!(matches!(
        session.connect(),
        Err(SimConnectError::OpenTimeout { attempts: 5 })
    ));
}

#[test]
fn test_event_mapping_and_notification_group() {
    let mut session = connected();
    let brakes = session.map_to_sim_event("PARKING_BRAKES").unwrap();
    assert_eq!(session.events().name_of(brakes), Some("PARKING_BRAKES"));

    assert!(session.add_to_notification_group(GroupId(1), brakes, false));
    assert!(session.send_event(brakes, 1));

    session
        .native_mut()
        .fail(Entry::AddClientEventToNotificationGroup);
    assert!(!session.add_to_notification_group(GroupId(1), brakes, false));
}

#[test]
fn test_set_data_string_is_padded() {
    let mut session = connected();
    let id = session
        .new_request(vec![Definition::new("ATC ID", "string")])
        .unwrap();
    session.request_mut(id).unwrap().out_data = Some(OutData::Bytes(b"N172SP".to_vec()));
    assert!(session.set_data(id));

    let data = session
        .native()
        .calls()
        .iter()
        .rev()
        .find_map(|c| match c {
            NativeCall::SetDataOnSimObject { data, .. } => Some(data.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(data.len(), 256);
    assert_eq!(&data[..6], b"N172SP");
    assert!(data[6..].iter().all(|&b| b == 0));

    session.native_mut().fail(Entry::SetDataOnSimObject);
    assert!(!session.set_data(id));
}

#[test]
fn test_set_pos_retries_failed_definition() {
    let mut session = connected();
    let pos = InitPosition::new(3000.0, 47.45, -122.31, 150);

    session.native_mut().fail(Entry::AddToDataDefinition);
    assert!(!session.set_pos(&pos));

    session.native_mut().recover(Entry::AddToDataDefinition);
    assert!(session.set_pos(&pos));
    let written = session.native().calls().iter().find_map(|c| match c {
        NativeCall::SetDataOnSimObject { data, .. } => Some(data.len()),
        _ => None,
    });
    assert_eq!(written, Some(InitPosition::SIZE));
}

#[test]
fn test_facility_list_collects_all_records() {
    let mut session = connected();
    let parent = shared(FacilityCollector::default());
    let own = shared(FacilityCollector::default());

    // First request id handed out by a fresh session.
    let expected = RequestId(POOL_BASE);
    session.native_mut().reply_to(
        expected,
        facility_list_record(
            FacilityListKind::Airport,
            expected,
            0,
            2,
            &[airport("KSEA", 47.4), airport("KBFI", 47.5)],
        ),
    );
    session.native_mut().reply_to(
        expected,
        facility_list_record(FacilityListKind::Airport, expected, 1, 2, &[airport("KPAE", 47.9)]),
    );

    let id = session
        .request_facilities_list(
            FacilityListKind::Airport,
            parent.clone() as SharedDump,
            own.clone() as SharedDump,
        )
        .unwrap();
    assert_eq!(id, expected);

    session.pump_once();
    session.pump_once();

    let own = own.lock();
    assert!(own.complete);
    assert_eq!(own.records, 2);
    let icaos: Vec<&str> = own.entries.iter().map(|f| f.icao.as_str()).collect();
    assert_eq!(icaos, ["KSEA", "KBFI", "KPAE"]);
    assert_eq!(parent.lock().entries.len(), 3);
}
