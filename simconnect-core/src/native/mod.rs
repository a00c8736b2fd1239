//! The native entry-point boundary.
//!
//! [`NativeLayer`] has one method per `SimConnect_*` entry point the client
//! uses.  The session never looks behind it: on Windows [`dll::DllNative`]
//! forwards to `SimConnect.dll`, and [`scripted::ScriptedNative`] replays
//! prepared records in memory for tests (`testing` feature).
//!
//! Every call returns an [`HResult`]; success means the code reinterpreted
//! as `u32` is zero.

#[cfg(windows)]
pub mod dll;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

use std::path::Path;

use crate::errors::SimConnectError;
use crate::ids::{DefinitionId, EventId, GroupId, RequestId};
use crate::recv::FacilityListKind;

/// `SIMCONNECT_OBJECT_ID_USER`.
pub const OBJECT_ID_USER: u32 = 0;

/// `SIMCONNECT_GROUP_PRIORITY_HIGHEST`.
pub const GROUP_PRIORITY_HIGHEST: u32 = 1;

/// `SIMCONNECT_EVENT_FLAG_GROUPID_IS_PRIORITY`.
pub const EVENT_FLAG_GROUPID_IS_PRIORITY: u32 = 0x10;

/// `SIMCONNECT_UNUSED`.
pub const UNUSED: u32 = u32::MAX;

/// Raw `HRESULT` returned by an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
    pub const E_INVALIDARG: HResult = HResult(0x8007_0057_u32 as i32);

    pub fn is_ok(self) -> bool {
        self.0 as u32 == 0
    }

    pub fn code(self) -> u32 {
        self.0 as u32
    }
}

impl std::fmt::Display for HResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HRESULT 0x{:08X}", self.code())
    }
}

/// `SIMCONNECT_DATATYPE` values used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    String256,
    InitPosition,
    Waypoint,
}

impl DataType {
    pub fn raw(self) -> u32 {
        match self {
            Self::Int32 => 1,
            Self::Int64 => 2,
            Self::Float32 => 3,
            Self::Float64 => 4,
            Self::String256 => 9,
            Self::InitPosition => 12,
            Self::Waypoint => 14,
        }
    }
}

/// `SIMCONNECT_SIMOBJECT_TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimObjectType {
    User,
    All,
    Aircraft,
    Helicopter,
    Boat,
    Ground,
}

impl SimObjectType {
    pub fn raw(self) -> u32 {
        match self {
            Self::User => 0,
            Self::All => 1,
            Self::Aircraft => 2,
            Self::Helicopter => 3,
            Self::Boat => 4,
            Self::Ground => 5,
        }
    }
}

/// Sink handed to [`NativeLayer::call_dispatch`]; receives one raw record.
pub type DispatchSink<'a> = dyn FnMut(&[u8]) + 'a;

/// One method per native entry point.
///
/// Implementations own the connection handle; `open` must succeed before
/// the other calls are meaningful.
pub trait NativeLayer {
    /// `SimConnect_Open`.  Failing to reach the library or the simulator is
    /// an error rather than an `HResult`, because the caller treats it as
    /// fatal.
    fn open(&mut self, app_name: &str) -> Result<(), SimConnectError>;

    /// `SimConnect_Close`.
    fn close(&mut self) -> HResult;

    /// `SimConnect_CallDispatch`: deliver at most one buffered record to
    /// `sink`, synchronously, before returning.
    fn call_dispatch(&mut self, sink: &mut DispatchSink<'_>) -> HResult;

    fn subscribe_to_system_event(&mut self, event: EventId, name: &str) -> HResult;

    fn map_client_event_to_sim_event(&mut self, event: EventId, name: &str) -> HResult;

    fn add_client_event_to_notification_group(
        &mut self,
        group: GroupId,
        event: EventId,
        maskable: bool,
    ) -> HResult;

    fn add_to_data_definition(
        &mut self,
        definition: DefinitionId,
        datum_name: &str,
        units: &str,
        data_type: DataType,
        epsilon: f32,
        datum_id: u32,
    ) -> HResult;

    fn request_data_on_sim_object_type(
        &mut self,
        request: RequestId,
        definition: DefinitionId,
        radius_meters: u32,
        object_type: SimObjectType,
    ) -> HResult;

    /// `SimConnect_SetDataOnSimObject`.  `data` holds `array_count` elements
    /// of `unit_size` bytes (or one element when `array_count` is 0).
    fn set_data_on_sim_object(
        &mut self,
        definition: DefinitionId,
        object_id: u32,
        flags: u32,
        array_count: u32,
        unit_size: u32,
        data: &[u8],
    ) -> HResult;

    fn transmit_client_event(
        &mut self,
        object_id: u32,
        event: EventId,
        data: u32,
        group: u32,
        flags: u32,
    ) -> HResult;

    /// `SimConnect_GetLastSentPacketID`.
    fn get_last_sent_packet_id(&mut self) -> Result<u32, HResult>;

    /// `SimConnect_RequestFacilitiesList`.
    fn request_facilities_list(&mut self, kind: FacilityListKind, request: RequestId) -> HResult;
}

impl<N: NativeLayer + ?Sized> NativeLayer for Box<N> {
    fn open(&mut self, app_name: &str) -> Result<(), SimConnectError> {
        (**self).open(app_name)
    }

    fn close(&mut self) -> HResult {
        (**self).close()
    }

    fn call_dispatch(&mut self, sink: &mut DispatchSink<'_>) -> HResult {
        (**self).call_dispatch(sink)
    }

    fn subscribe_to_system_event(&mut self, event: EventId, name: &str) -> HResult {
        (**self).subscribe_to_system_event(event, name)
    }

    fn map_client_event_to_sim_event(&mut self, event: EventId, name: &str) -> HResult {
        (**self).map_client_event_to_sim_event(event, name)
    }

    fn add_client_event_to_notification_group(
        &mut self,
        group: GroupId,
        event: EventId,
        maskable: bool,
    ) -> HResult {
        (**self).add_client_event_to_notification_group(group, event, maskable)
    }

    fn add_to_data_definition(
        &mut self,
        definition: DefinitionId,
        datum_name: &str,
        units: &str,
        data_type: DataType,
        epsilon: f32,
        datum_id: u32,
    ) -> HResult {
        (**self).add_to_data_definition(definition, datum_name, units, data_type, epsilon, datum_id)
    }

    fn request_data_on_sim_object_type(
        &mut self,
        request: RequestId,
        definition: DefinitionId,
        radius_meters: u32,
        object_type: SimObjectType,
    ) -> HResult {
        (**self).request_data_on_sim_object_type(request, definition, radius_meters, object_type)
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
        (**self).set_data_on_sim_object(definition, object_id, flags, array_count, unit_size, data)
    }

    fn transmit_client_event(
        &mut self,
        object_id: u32,
        event: EventId,
        data: u32,
        group: u32,
        flags: u32,
    ) -> HResult {
        (**self).transmit_client_event(object_id, event, data, group, flags)
    }

    fn get_last_sent_packet_id(&mut self) -> Result<u32, HResult> {
        (**self).get_last_sent_packet_id()
    }

    fn request_facilities_list(&mut self, kind: FacilityListKind, request: RequestId) -> HResult {
        (**self).request_facilities_list(kind, request)
    }
}

/// Load `SimConnect.dll` from `path` (or the DLL search path).
#[cfg(windows)]
pub fn load(path: &Path) -> Result<Box<dyn NativeLayer>, SimConnectError> {
    Ok(Box::new(dll::DllNative::load(path)?))
}

/// SimConnect only ships for Windows.
#[cfg(not(windows))]
pub fn load(path: &Path) -> Result<Box<dyn NativeLayer>, SimConnectError> {
    Err(SimConnectError::LibraryLoad(format!(
        "cannot load {}: SimConnect is only available on Windows",
        path.display()
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hresult_unsigned_zero_is_success() {
        assert!(HResult::S_OK.is_ok());
        assert!(!HResult::E_FAIL.is_ok());
        assert!(!HResult(1).is_ok());
        assert_eq!(HResult::E_FAIL.to_string(), "HRESULT 0x80004005");
    }

    #[test]
    fn test_datatype_values() {
        assert_eq!(DataType::Float64.raw(), 4);
        assert_eq!(DataType::String256.raw(), 9);
        assert_eq!(DataType::InitPosition.raw(), 12);
        assert_eq!(DataType::Waypoint.raw(), 14);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_load_unavailable_off_windows() {
        let err = load(Path::new("SimConnect.dll")).err().unwrap();
        assert!(matches!(err, SimConnectError::LibraryLoad(_)));
    }
}
