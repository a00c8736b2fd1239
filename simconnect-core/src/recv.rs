//! Decoding of the records SimConnect hands to the dispatch callback.
//!
//! Every record starts with the common `SIMCONNECT_RECV` header
//! (`dwSize`, `dwVersion`, `dwID`).  `dwID` discriminates the rest of the
//! structure.  SimConnect packs its structures to 1 byte, so every field is
//! read at a fixed offset with little-endian byte order.
//!
//! Only the kinds the dispatcher routes are decoded into typed records; every
//! other kind surfaces as [`Recv::Other`] with its [`RecvKind`].

use serde::Serialize;
use thiserror::Error;

use crate::ids::{DefinitionId, EventId, RequestId};

/// `SIMCONNECT_RECV` header: `dwSize`, `dwVersion`, `dwID`.
pub const HEADER_SIZE: usize = 12;

/// `SIMCONNECT_RECV_SIMOBJECT_DATA` up to (not including) `dwData`.
pub const OBJECT_DATA_HEADER_SIZE: usize = 40;

/// `SIMCONNECT_RECV_FACILITIES_LIST` up to the first list entry.
pub const FACILITY_LIST_HEADER_SIZE: usize = 28;

/// `SIMCONNECT_RECV_EXCEPTION`.
pub const EXCEPTION_SIZE: usize = 24;

/// `SIMCONNECT_RECV_EVENT`.
pub const EVENT_SIZE: usize = 24;

/// Length of `szApplicationName` in `SIMCONNECT_RECV_OPEN`.
pub const APP_NAME_LEN: usize = 256;

/// `SIMCONNECT_RECV_OPEN`.
pub const OPEN_SIZE: usize = HEADER_SIZE + APP_NAME_LEN + 10 * 4;

/// Length of the `Icao` field in facility entries.
pub const ICAO_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Record kinds
// ---------------------------------------------------------------------------

/// `SIMCONNECT_RECV_ID` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecvKind {
    Null,
    Exception,
    Open,
    Quit,
    Event,
    EventObjectAddRemove,
    EventFilename,
    EventFrame,
    SimObjectData,
    SimObjectDataByType,
    WeatherObservation,
    CloudState,
    AssignedObjectId,
    ReservedKey,
    CustomAction,
    SystemState,
    ClientData,
    EventWeatherMode,
    AirportList,
    VorList,
    NdbList,
    WaypointList,
    Unknown(u32),
}

impl RecvKind {
    pub fn from_raw(id: u32) -> Self {
        match id {
            0 => Self::Null,
            1 => Self::Exception,
            2 => Self::Open,
            3 => Self::Quit,
            4 => Self::Event,
            5 => Self::EventObjectAddRemove,
            6 => Self::EventFilename,
            7 => Self::EventFrame,
            8 => Self::SimObjectData,
            9 => Self::SimObjectDataByType,
            10 => Self::WeatherObservation,
            11 => Self::CloudState,
            12 => Self::AssignedObjectId,
            13 => Self::ReservedKey,
            14 => Self::CustomAction,
            15 => Self::SystemState,
            16 => Self::ClientData,
            17 => Self::EventWeatherMode,
            18 => Self::AirportList,
            19 => Self::VorList,
            20 => Self::NdbList,
            21 => Self::WaypointList,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Exception => 1,
            Self::Open => 2,
            Self::Quit => 3,
            Self::Event => 4,
            Self::EventObjectAddRemove => 5,
            Self::EventFilename => 6,
            Self::EventFrame => 7,
            Self::SimObjectData => 8,
            Self::SimObjectDataByType => 9,
            Self::WeatherObservation => 10,
            Self::CloudState => 11,
            Self::AssignedObjectId => 12,
            Self::ReservedKey => 13,
            Self::CustomAction => 14,
            Self::SystemState => 15,
            Self::ClientData => 16,
            Self::EventWeatherMode => 17,
            Self::AirportList => 18,
            Self::VorList => 19,
            Self::NdbList => 20,
            Self::WaypointList => 21,
            Self::Unknown(other) => other,
        }
    }

    fn facility_kind(self) -> Option<FacilityListKind> {
        match self {
            Self::AirportList => Some(FacilityListKind::Airport),
            Self::WaypointList => Some(FacilityListKind::Waypoint),
            Self::NdbList => Some(FacilityListKind::Ndb),
            Self::VorList => Some(FacilityListKind::Vor),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

const EXCEPTION_NAMES: &[&str] = &[
    "SIMCONNECT_EXCEPTION_NONE",
    "SIMCONNECT_EXCEPTION_ERROR",
    "SIMCONNECT_EXCEPTION_SIZE_MISMATCH",
    "SIMCONNECT_EXCEPTION_UNRECOGNIZED_ID",
    "SIMCONNECT_EXCEPTION_UNOPENED",
    "SIMCONNECT_EXCEPTION_VERSION_MISMATCH",
    "SIMCONNECT_EXCEPTION_TOO_MANY_GROUPS",
    "SIMCONNECT_EXCEPTION_NAME_UNRECOGNIZED",
    "SIMCONNECT_EXCEPTION_TOO_MANY_EVENT_NAMES",
    "SIMCONNECT_EXCEPTION_EVENT_ID_DUPLICATE",
    "SIMCONNECT_EXCEPTION_TOO_MANY_MAPS",
    "SIMCONNECT_EXCEPTION_TOO_MANY_OBJECTS",
    "SIMCONNECT_EXCEPTION_TOO_MANY_REQUESTS",
    "SIMCONNECT_EXCEPTION_WEATHER_INVALID_PORT",
    "SIMCONNECT_EXCEPTION_WEATHER_INVALID_METAR",
    "SIMCONNECT_EXCEPTION_WEATHER_UNABLE_TO_GET_OBSERVATION",
    "SIMCONNECT_EXCEPTION_WEATHER_UNABLE_TO_CREATE_STATION",
    "SIMCONNECT_EXCEPTION_WEATHER_UNABLE_TO_REMOVE_STATION",
    "SIMCONNECT_EXCEPTION_INVALID_DATA_TYPE",
    "SIMCONNECT_EXCEPTION_INVALID_DATA_SIZE",
    "SIMCONNECT_EXCEPTION_DATA_ERROR",
    "SIMCONNECT_EXCEPTION_INVALID_ARRAY",
    "SIMCONNECT_EXCEPTION_CREATE_OBJECT_FAILED",
    "SIMCONNECT_EXCEPTION_LOAD_FLIGHTPLAN_FAILED",
    "SIMCONNECT_EXCEPTION_OPERATION_INVALID_FOR_OBJECT_TYPE",
    "SIMCONNECT_EXCEPTION_ILLEGAL_OPERATION",
    "SIMCONNECT_EXCEPTION_ALREADY_SUBSCRIBED",
    "SIMCONNECT_EXCEPTION_INVALID_ENUM",
    "SIMCONNECT_EXCEPTION_DEFINITION_ERROR",
    "SIMCONNECT_EXCEPTION_DUPLICATE_ID",
    "SIMCONNECT_EXCEPTION_DATUM_ID",
    "SIMCONNECT_EXCEPTION_OUT_OF_BOUNDS",
    "SIMCONNECT_EXCEPTION_ALREADY_CREATED",
    "SIMCONNECT_EXCEPTION_OBJECT_OUTSIDE_REALITY_BUBBLE",
    "SIMCONNECT_EXCEPTION_OBJECT_CONTAINER",
    "SIMCONNECT_EXCEPTION_OBJECT_AI",
    "SIMCONNECT_EXCEPTION_OBJECT_ATC",
    "SIMCONNECT_EXCEPTION_OBJECT_SCHEDULE",
];

/// Symbolic `SIMCONNECT_EXCEPTION` name for an exception code.
pub fn exception_name(code: u32) -> &'static str {
    EXCEPTION_NAMES
        .get(code as usize)
        .copied()
        .unwrap_or("SIMCONNECT_EXCEPTION_UNKNOWN")
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// `SIMCONNECT_RECV_EXCEPTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRecord {
    pub exception: u32,
    /// Packet ID of the send that caused the exception.
    pub send_id: u32,
    pub index: u32,
}

impl ExceptionRecord {
    pub fn name(&self) -> &'static str {
        exception_name(self.exception)
    }
}

/// `SIMCONNECT_RECV_EVENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub group_id: u32,
    pub event_id: EventId,
    pub data: u32,
}

/// `SIMCONNECT_RECV_OPEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    pub application_name: String,
    /// Major, minor, build major, build minor.
    pub application_version: [u32; 4],
    pub simconnect_version: [u32; 4],
}

/// `SIMCONNECT_RECV_SIMOBJECT_DATA_BYTYPE`; `data` borrows the payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectData<'a> {
    pub request_id: RequestId,
    pub object_id: u32,
    pub define_id: DefinitionId,
    pub flags: u32,
    pub entry_number: u32,
    pub out_of: u32,
    pub define_count: u32,
    pub data: &'a [u8],
}

/// Facility list flavours, in `SIMCONNECT_FACILITY_LIST_TYPE` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityListKind {
    Airport,
    Waypoint,
    Ndb,
    Vor,
}

impl FacilityListKind {
    /// `SIMCONNECT_FACILITY_LIST_TYPE` value.
    pub fn list_type(self) -> u32 {
        match self {
            Self::Airport => 0,
            Self::Waypoint => 1,
            Self::Ndb => 2,
            Self::Vor => 3,
        }
    }

    pub fn recv_kind(self) -> RecvKind {
        match self {
            Self::Airport => RecvKind::AirportList,
            Self::Waypoint => RecvKind::WaypointList,
            Self::Ndb => RecvKind::NdbList,
            Self::Vor => RecvKind::VorList,
        }
    }

    /// Packed size of one `SIMCONNECT_DATA_FACILITY_*` entry.
    pub fn entry_size(self) -> usize {
        match self {
            // Icao[9] + lat/lon/alt
            Self::Airport => ICAO_LEN + 3 * 8,
            // + fMagVar
            Self::Waypoint => ICAO_LEN + 3 * 8 + 4,
            // + fFrequency
            Self::Ndb => ICAO_LEN + 3 * 8 + 4 + 4,
            // + Flags, fLocalizer, GlideLat/Lon/Alt, fGlideSlopeAngle
            Self::Vor => ICAO_LEN + 3 * 8 + 4 + 4 + 4 + 4 + 3 * 8 + 4,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "airport" | "airports" => Some(Self::Airport),
            "waypoint" | "waypoints" => Some(Self::Waypoint),
            "ndb" | "ndbs" => Some(Self::Ndb),
            "vor" | "vors" => Some(Self::Vor),
            _ => None,
        }
    }
}

/// One decoded facility list entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub icao: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_var: Option<f32>,
    /// NDB / VOR frequency in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vor: Option<VorDetails>,
}

/// VOR-only fields of `SIMCONNECT_DATA_FACILITY_VOR`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VorDetails {
    pub flags: u32,
    pub localizer: f32,
    pub glide_lat: f64,
    pub glide_lon: f64,
    pub glide_alt: f64,
    pub glide_slope_angle: f32,
}

/// `SIMCONNECT_RECV_FACILITIES_LIST` plus its trailing entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacilityList<'a> {
    pub kind: FacilityListKind,
    pub request_id: RequestId,
    pub array_size: u32,
    pub entry_number: u32,
    pub out_of: u32,
    /// The complete native record, header included.
    pub raw: &'a [u8],
}

impl FacilityList<'_> {
    /// Decode the entries carried by this record.
    ///
    /// Entries that would run past the end of the record are dropped.
    pub fn entries(&self) -> Vec<Facility> {
        let size = self.kind.entry_size();
        let body = self.raw.get(FACILITY_LIST_HEADER_SIZE..).unwrap_or(&[]);
        body.chunks_exact(size)
            .take(self.array_size as usize)
            .map(|chunk| decode_facility(self.kind, chunk))
            .collect()
    }

    /// `true` for the final record of a multi-record list.
    pub fn is_last(&self) -> bool {
        self.entry_number + 1 >= self.out_of
    }
}

fn decode_facility(kind: FacilityListKind, chunk: &[u8]) -> Facility {
    let icao = String::from_utf8_lossy(&read_c_string(&chunk[..ICAO_LEN])).into_owned();
    let mut facility = Facility {
        icao,
        latitude: f64_at(chunk, ICAO_LEN).unwrap_or_default(),
        longitude: f64_at(chunk, ICAO_LEN + 8).unwrap_or_default(),
        altitude: f64_at(chunk, ICAO_LEN + 16).unwrap_or_default(),
        mag_var: None,
        frequency: None,
        vor: None,
    };
    let tail = ICAO_LEN + 24;
    if kind != FacilityListKind::Airport {
        facility.mag_var = f32_at(chunk, tail);
    }
    if matches!(kind, FacilityListKind::Ndb | FacilityListKind::Vor) {
        facility.frequency = u32_at(chunk, tail + 4);
    }
    if kind == FacilityListKind::Vor {
        let v = tail + 8;
        facility.vor = Some(VorDetails {
            flags: u32_at(chunk, v).unwrap_or_default(),
            localizer: f32_at(chunk, v + 4).unwrap_or_default(),
            glide_lat: f64_at(chunk, v + 8).unwrap_or_default(),
            glide_lon: f64_at(chunk, v + 16).unwrap_or_default(),
            glide_alt: f64_at(chunk, v + 24).unwrap_or_default(),
            glide_slope_angle: f32_at(chunk, v + 32).unwrap_or_default(),
        });
    }
    facility
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// A record that is shorter than its kind's fixed layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("truncated {kind:?} record: {got} bytes, need {needed}")]
pub struct TruncatedRecord {
    pub kind: Option<RecvKind>,
    pub needed: usize,
    pub got: usize,
}

/// One record delivered by `CallDispatch`, borrowed from the native buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Recv<'a> {
    Exception(ExceptionRecord),
    Open(OpenRecord),
    Quit,
    Event(EventRecord),
    ObjectDataByType(ObjectData<'a>),
    FacilityList(FacilityList<'a>),
    Other(RecvKind),
}

impl<'a> Recv<'a> {
    /// Decode the header and, for routed kinds, the fixed-layout body.
    pub fn parse(raw: &'a [u8]) -> Result<Self, TruncatedRecord> {
        let id = u32_at(raw, 8).ok_or(TruncatedRecord {
            kind: None,
            needed: HEADER_SIZE,
            got: raw.len(),
        })?;
        let kind = RecvKind::from_raw(id);
        let need = |needed: usize| {
            if raw.len() < needed {
                Err(TruncatedRecord {
                    kind: Some(kind),
                    needed,
                    got: raw.len(),
                })
            } else {
                Ok(())
            }
        };

        let record = match kind {
            RecvKind::Exception => {
                need(EXCEPTION_SIZE)?;
                Recv::Exception(ExceptionRecord {
                    exception: u32_at(raw, 12).unwrap_or_default(),
                    send_id: u32_at(raw, 16).unwrap_or_default(),
                    index: u32_at(raw, 20).unwrap_or_default(),
                })
            }
            RecvKind::Open => {
                // Older SDKs send a shorter open record; missing fields read as 0.
                let name_end = (HEADER_SIZE + APP_NAME_LEN).min(raw.len());
                let name = read_c_string(&raw[HEADER_SIZE.min(name_end)..name_end]);
                let v = HEADER_SIZE + APP_NAME_LEN;
                let version = |base: usize| {
                    [0, 1, 2, 3].map(|i| u32_at(raw, base + i * 4).unwrap_or_default())
                };
                Recv::Open(OpenRecord {
                    application_name: String::from_utf8_lossy(&name).into_owned(),
                    application_version: version(v),
                    simconnect_version: version(v + 16),
                })
            }
            RecvKind::Quit => Recv::Quit,
            RecvKind::Event => {
                need(EVENT_SIZE)?;
                Recv::Event(EventRecord {
                    group_id: u32_at(raw, 12).unwrap_or_default(),
                    event_id: EventId(u32_at(raw, 16).unwrap_or_default()),
                    data: u32_at(raw, 20).unwrap_or_default(),
                })
            }
            RecvKind::SimObjectDataByType => {
                need(OBJECT_DATA_HEADER_SIZE)?;
                Recv::ObjectDataByType(ObjectData {
                    request_id: RequestId(u32_at(raw, 12).unwrap_or_default()),
                    object_id: u32_at(raw, 16).unwrap_or_default(),
                    define_id: DefinitionId(u32_at(raw, 20).unwrap_or_default()),
                    flags: u32_at(raw, 24).unwrap_or_default(),
                    entry_number: u32_at(raw, 28).unwrap_or_default(),
                    out_of: u32_at(raw, 32).unwrap_or_default(),
                    define_count: u32_at(raw, 36).unwrap_or_default(),
                    data: &raw[OBJECT_DATA_HEADER_SIZE..],
                })
            }
            other => match other.facility_kind() {
                Some(facility_kind) => {
                    need(FACILITY_LIST_HEADER_SIZE)?;
                    Recv::FacilityList(FacilityList {
                        kind: facility_kind,
                        request_id: RequestId(u32_at(raw, 12).unwrap_or_default()),
                        array_size: u32_at(raw, 16).unwrap_or_default(),
                        entry_number: u32_at(raw, 20).unwrap_or_default(),
                        out_of: u32_at(raw, 24).unwrap_or_default(),
                        raw,
                    })
                }
                None => Recv::Other(other),
            },
        };
        Ok(record)
    }

    pub fn kind(&self) -> RecvKind {
        match self {
            Recv::Exception(_) => RecvKind::Exception,
            Recv::Open(_) => RecvKind::Open,
            Recv::Quit => RecvKind::Quit,
            Recv::Event(_) => RecvKind::Event,
            Recv::ObjectDataByType(_) => RecvKind::SimObjectDataByType,
            Recv::FacilityList(list) => list.kind.recv_kind(),
            Recv::Other(kind) => *kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

pub(crate) fn u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn f32_at(buf: &[u8], offset: usize) -> Option<f32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(f32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn f64_at(buf: &[u8], offset: usize) -> Option<f64> {
    let bytes = buf.get(offset..offset + 8)?;
    Some(f64::from_le_bytes(bytes.try_into().ok()?))
}

/// Bytes up to (not including) the first NUL, or the whole slice.
pub fn read_c_string(buf: &[u8]) -> Vec<u8> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf[..end].to_vec()
}

/// Up to `count` consecutive `f64` values, bounded by the buffer length.
pub fn read_f64_array(buf: &[u8], count: usize) -> Vec<f64> {
    buf.chunks_exact(8)
        .take(count)
        .filter_map(|chunk| chunk.try_into().ok().map(f64::from_le_bytes))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::scripted::{
        event_record, exception_record, facility_list_record, object_data_record, open_record,
        quit_record,
    };

    #[test]
    fn test_kind_round_trip_known_ids() {
        for id in 0..=21 {
            assert_eq!(RecvKind::from_raw(id).raw(), id);
        }
        assert_eq!(RecvKind::from_raw(99), RecvKind::Unknown(99));
    }

    #[test]
    fn test_exception_names() {
        assert_eq!(exception_name(3), "SIMCONNECT_EXCEPTION_UNRECOGNIZED_ID");
        assert_eq!(exception_name(7), "SIMCONNECT_EXCEPTION_NAME_UNRECOGNIZED");
        assert_eq!(exception_name(1000), "SIMCONNECT_EXCEPTION_UNKNOWN");
    }

    #[test]
    fn test_parse_truncated_header() {
        let err = Recv::parse(&[0u8; 8]).unwrap_err();
        assert_eq!(err.kind, None);
        assert_eq!(err.needed, HEADER_SIZE);
    }

    #[test]
    fn test_parse_truncated_object_data() {
        let mut raw = object_data_record(RequestId(1), DefinitionId(1), 1, &[]);
        raw.truncate(30);
        let err = Recv::parse(&raw).unwrap_err();
        assert_eq!(err.kind, Some(RecvKind::SimObjectDataByType));
    }

    #[test]
    fn test_parse_open_and_quit() {
        match Recv::parse(&open_record("KittyHawk")).unwrap() {
            Recv::Open(open) => assert_eq!(open.application_name, "KittyHawk"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Recv::parse(&quit_record()).unwrap(), Recv::Quit);
    }

    #[test]
    fn test_parse_event_and_exception() {
        match Recv::parse(&event_record(2, EventId(5), 42)).unwrap() {
            Recv::Event(e) => {
                assert_eq!(e.event_id, EventId(5));
                assert_eq!(e.data, 42);
            }
            other => panic!("unexpected {other:?}"),
        }
        match Recv::parse(&exception_record(3, 77, 1)).unwrap() {
            Recv::Exception(e) => {
                assert_eq!(e.send_id, 77);
                assert_eq!(e.name(), "SIMCONNECT_EXCEPTION_UNRECOGNIZED_ID");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_unrouted_kind() {
        let mut raw = quit_record();
        raw[8..12].copy_from_slice(&RecvKind::EventFrame.raw().to_le_bytes());
        assert_eq!(Recv::parse(&raw).unwrap(), Recv::Other(RecvKind::EventFrame));
    }

    #[test]
    fn test_facility_entries_vor() {
        let entry = Facility {
            icao: "SEA".into(),
            latitude: 47.43,
            longitude: -122.3,
            altitude: 110.0,
            mag_var: Some(-16.0),
            frequency: Some(116_800_000),
            vor: Some(VorDetails {
                flags: 3,
                localizer: 0.0,
                glide_lat: 0.0,
                glide_lon: 0.0,
                glide_alt: 0.0,
                glide_slope_angle: 0.0,
            }),
        };
        let raw = facility_list_record(FacilityListKind::Vor, RequestId(4), 0, 1, &[entry.clone()]);
        match Recv::parse(&raw).unwrap() {
            Recv::FacilityList(list) => {
                assert_eq!(list.kind, FacilityListKind::Vor);
                assert!(list.is_last());
                assert_eq!(list.entries(), vec![entry]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_read_helpers() {
        assert_eq!(read_c_string(b"Cessna 172\0junk"), b"Cessna 172".to_vec());
        assert_eq!(read_c_string(b"NOTERM"), b"NOTERM".to_vec());

        let mut buf = Vec::new();
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        buf.extend_from_slice(&2.5f64.to_le_bytes());
        buf.extend_from_slice(&[0, 1, 2]);
        assert_eq!(read_f64_array(&buf, 5), vec![1.5, 2.5]);
        assert_eq!(read_f64_array(&buf, 1), vec![1.5]);
    }
}
