//! `SimConnect.dll` binding via `LoadLibraryW` / `GetProcAddress`.
//!
//! The library is loaded at runtime rather than linked, so a missing
//! simulator SDK surfaces as [`SimConnectError::LibraryLoad`] instead of a
//! loader failure at process start.
//!
//! # Dispatch callback
//!
//! `SimConnect_CallDispatch` takes a C callback plus an opaque context
//! pointer.  The context carries a `&mut dyn FnMut(&[u8])` for the duration
//! of the call; [`dispatch_trampoline`] rebuilds the record slice from
//! `pData` / `cbData` and forwards it.  SimConnect invokes the callback
//! synchronously on the calling thread, so the borrow never escapes.

use std::ffi::{c_char, c_void, CString};
use std::path::Path;
use std::ptr;

use windows::core::{s, HSTRING, PCSTR};
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use super::{DataType, DispatchSink, HResult, NativeLayer, SimObjectType};
use crate::errors::SimConnectError;
use crate::ids::{DefinitionId, EventId, GroupId, RequestId};
use crate::recv::FacilityListKind;

type Handle = *mut c_void;

type DispatchProc = unsafe extern "system" fn(*const u8, u32, *mut c_void);

type OpenFn =
    unsafe extern "system" fn(*mut Handle, *const c_char, *mut c_void, u32, *mut c_void, u32) -> i32;
type CloseFn = unsafe extern "system" fn(Handle) -> i32;
type CallDispatchFn = unsafe extern "system" fn(Handle, DispatchProc, *mut c_void) -> i32;
type SubscribeToSystemEventFn = unsafe extern "system" fn(Handle, u32, *const c_char) -> i32;
type MapClientEventFn = unsafe extern "system" fn(Handle, u32, *const c_char) -> i32;
type AddToGroupFn = unsafe extern "system" fn(Handle, u32, u32, i32) -> i32;
type AddToDataDefinitionFn =
    unsafe extern "system" fn(Handle, u32, *const c_char, *const c_char, u32, f32, u32) -> i32;
type RequestDataByTypeFn = unsafe extern "system" fn(Handle, u32, u32, u32, u32) -> i32;
type SetDataFn = unsafe extern "system" fn(Handle, u32, u32, u32, u32, u32, *const c_void) -> i32;
type TransmitClientEventFn = unsafe extern "system" fn(Handle, u32, u32, u32, u32, u32) -> i32;
type GetLastSentPacketIdFn = unsafe extern "system" fn(Handle, *mut u32) -> i32;
type RequestFacilitiesListFn = unsafe extern "system" fn(Handle, u32, u32) -> i32;

/// Resolved entry points.
struct Api {
    open: OpenFn,
    close: CloseFn,
    call_dispatch: CallDispatchFn,
    subscribe_to_system_event: SubscribeToSystemEventFn,
    map_client_event_to_sim_event: MapClientEventFn,
    add_client_event_to_notification_group: AddToGroupFn,
    add_to_data_definition: AddToDataDefinitionFn,
    request_data_on_sim_object_type: RequestDataByTypeFn,
    set_data_on_sim_object: SetDataFn,
    transmit_client_event: TransmitClientEventFn,
    get_last_sent_packet_id: GetLastSentPacketIdFn,
    request_facilities_list: RequestFacilitiesListFn,
}

/// Look up `name` in `module` and reinterpret it as the function type `F`.
///
/// # Safety
///
/// `F` must be an `extern "system"` function pointer type matching the
/// export's real signature.
unsafe fn resolve<F: Copy>(module: HMODULE, name: PCSTR) -> Result<F, SimConnectError> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
    let proc = unsafe { GetProcAddress(module, name) }.ok_or_else(|| {
        let label = unsafe { name.to_string() }.unwrap_or_default();
        SimConnectError::LibraryLoad(format!("missing entry point {label}"))
    })?;
    Ok(unsafe { std::mem::transmute_copy(&proc) })
}

impl Api {
    unsafe fn resolve_all(module: HMODULE) -> Result<Self, SimConnectError> {
        unsafe {
            Ok(Self {
                open: resolve(module, s!("SimConnect_Open"))?,
                close: resolve(module, s!("SimConnect_Close"))?,
                call_dispatch: resolve(module, s!("SimConnect_CallDispatch"))?,
                subscribe_to_system_event: resolve(module, s!("SimConnect_SubscribeToSystemEvent"))?,
                map_client_event_to_sim_event: resolve(
                    module,
                    s!("SimConnect_MapClientEventToSimEvent"),
                )?,
                add_client_event_to_notification_group: resolve(
                    module,
                    s!("SimConnect_AddClientEventToNotificationGroup"),
                )?,
                add_to_data_definition: resolve(module, s!("SimConnect_AddToDataDefinition"))?,
                request_data_on_sim_object_type: resolve(
                    module,
                    s!("SimConnect_RequestDataOnSimObjectType"),
                )?,
                set_data_on_sim_object: resolve(module, s!("SimConnect_SetDataOnSimObject"))?,
                transmit_client_event: resolve(module, s!("SimConnect_TransmitClientEvent"))?,
                get_last_sent_packet_id: resolve(module, s!("SimConnect_GetLastSentPacketID"))?,
                request_facilities_list: resolve(module, s!("SimConnect_RequestFacilitiesList"))?,
            })
        }
    }
}

/// Callback handed to `SimConnect_CallDispatch`.
unsafe extern "system" fn dispatch_trampoline(p_data: *const u8, cb_data: u32, p_context: *mut c_void) {
    if p_data.is_null() || p_context.is_null() {
        return;
    }
    let sink = unsafe { &mut *(p_context as *mut &mut DispatchSink<'_>) };
    let record = unsafe { std::slice::from_raw_parts(p_data, cb_data as usize) };
    sink(record);
}

/// Live binding to a loaded `SimConnect.dll`.
///
/// Not `Send`: the connection handle belongs to the thread that pumps it.
pub struct DllNative {
    module: HMODULE,
    handle: Handle,
    api: Api,
}

impl DllNative {
    /// Load the library and resolve every entry point the client uses.
    pub fn load(path: &Path) -> Result<Self, SimConnectError> {
        let module = unsafe { LoadLibraryW(&HSTRING::from(path.as_os_str())) }.map_err(|e| {
            SimConnectError::LibraryLoad(format!("LoadLibraryW({}): {e}", path.display()))
        })?;

        match unsafe { Api::resolve_all(module) } {
            Ok(api) => Ok(Self {
                module,
                handle: ptr::null_mut(),
                api,
            }),
            Err(e) => {
                let _ = unsafe { FreeLibrary(module) };
                Err(e)
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.handle.is_null()
    }
}

/// Convert a Rust string for a `LPCSTR` argument.
///
/// Interior NUL bytes cannot cross the boundary; callers map `None` to
/// `E_INVALIDARG`.
fn c_string(value: &str) -> Option<CString> {
    CString::new(value).ok()
}

impl NativeLayer for DllNative {
    fn open(&mut self, app_name: &str) -> Result<(), SimConnectError> {
        let name = c_string(app_name)
            .ok_or_else(|| SimConnectError::Open("application name contains NUL".into()))?;
        let mut handle: Handle = ptr::null_mut();
        let hr = HResult(unsafe {
            (self.api.open)(
                &mut handle,
                name.as_ptr(),
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                0,
            )
        });
        if !hr.is_ok() || handle.is_null() {
            return Err(SimConnectError::Open(format!("SimConnect_Open failed: {hr}")));
        }
        self.handle = handle;
        Ok(())
    }

    fn close(&mut self) -> HResult {
        if !self.is_open() {
            return HResult::S_OK;
        }
        let hr = HResult(unsafe { (self.api.close)(self.handle) });
        self.handle = ptr::null_mut();
        hr
    }

    fn call_dispatch(&mut self, sink: &mut DispatchSink<'_>) -> HResult {
        let mut sink_ref: &mut DispatchSink<'_> = sink;
        let context = &mut sink_ref as *mut &mut DispatchSink<'_> as *mut c_void;
        HResult(unsafe { (self.api.call_dispatch)(self.handle, dispatch_trampoline, context) })
    }

    fn subscribe_to_system_event(&mut self, event: EventId, name: &str) -> HResult {
        let Some(name) = c_string(name) else {
            return HResult::E_INVALIDARG;
        };
        HResult(unsafe { (self.api.subscribe_to_system_event)(self.handle, event.0, name.as_ptr()) })
    }

    fn map_client_event_to_sim_event(&mut self, event: EventId, name: &str) -> HResult {
        let Some(name) = c_string(name) else {
            return HResult::E_INVALIDARG;
        };
        HResult(unsafe {
            (self.api.map_client_event_to_sim_event)(self.handle, event.0, name.as_ptr())
        })
    }

    fn add_client_event_to_notification_group(
        &mut self,
        group: GroupId,
        event: EventId,
        maskable: bool,
    ) -> HResult {
        HResult(unsafe {
            (self.api.add_client_event_to_notification_group)(
                self.handle,
                group.0,
                event.0,
                i32::from(maskable),
            )
        })
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
        let (Some(datum), Some(units)) = (c_string(datum_name), c_string(units)) else {
            return HResult::E_INVALIDARG;
        };
        // Structured datatypes (init position, waypoints) take no units.
        let units_ptr = if units.as_bytes().is_empty() {
            ptr::null()
        } else {
            units.as_ptr()
        };
        HResult(unsafe {
            (self.api.add_to_data_definition)(
                self.handle,
                definition.0,
                datum.as_ptr(),
                units_ptr,
                data_type.raw(),
                epsilon,
                datum_id,
            )
        })
    }

    fn request_data_on_sim_object_type(
        &mut self,
        request: RequestId,
        definition: DefinitionId,
        radius_meters: u32,
        object_type: SimObjectType,
    ) -> HResult {
        HResult(unsafe {
            (self.api.request_data_on_sim_object_type)(
                self.handle,
                request.0,
                definition.0,
                radius_meters,
                object_type.raw(),
            )
        })
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
        HResult(unsafe {
            (self.api.set_data_on_sim_object)(
                self.handle,
                definition.0,
                object_id,
                flags,
                array_count,
                unit_size,
                data.as_ptr() as *const c_void,
            )
        })
    }

    fn transmit_client_event(
        &mut self,
        object_id: u32,
        event: EventId,
        data: u32,
        group: u32,
        flags: u32,
    ) -> HResult {
        HResult(unsafe {
            (self.api.transmit_client_event)(self.handle, object_id, event.0, data, group, flags)
        })
    }

    fn get_last_sent_packet_id(&mut self) -> Result<u32, HResult> {
        let mut id: u32 = 0;
        let hr = HResult(unsafe { (self.api.get_last_sent_packet_id)(self.handle, &mut id) });
        if hr.is_ok() {
            Ok(id)
        } else {
            Err(hr)
        }
    }

    fn request_facilities_list(&mut self, kind: FacilityListKind, request: RequestId) -> HResult {
        HResult(unsafe {
            (self.api.request_facilities_list)(self.handle, kind.list_type(), request.0)
        })
    }
}

impl Drop for DllNative {
    fn drop(&mut self) {
        if self.is_open() {
            let hr = self.close();
            if !hr.is_ok() {
                log::warn!("SimConnect_Close on drop failed: {hr}");
            }
        }
        let _ = unsafe { FreeLibrary(self.module) };
    }
}
