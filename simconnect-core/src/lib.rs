//! `simconnect_core` -- Pure Rust core library for the SimConnect client.
//!
//! This crate contains all client logic with **no PyO3 dependency**.
//! It can be consumed by:
//! - `simconnect-pyo3` (PyO3 Python extension)
//! - `simconnect-cli` (standalone CLI tools and the JSON-RPC worker)
//!
//! The SimConnect protocol itself lives inside the vendor `SimConnect.dll`;
//! this crate only drives it through the [`native::NativeLayer`] boundary.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `SimConnectError` enum via `thiserror` |
//! | [`config`] | `SessionConfig` loaded via `serde` |
//! | [`blocks`] | Init-position and waypoint blocks for `SetDataOnSimObject` |
//! | [`ids`] | Identifier newtypes and append-only ID pools |
//! | [`recv`] | Decoding of the `SIMCONNECT_RECV_*` records handed to the callback |
//! | [`request`] | Data requests, their definitions and output slot |
//! | [`registry`] | Request registry keyed by request ID |
//! | [`facility`] | Facility list listeners and fan-out |
//! | [`dispatch`] | Callback demultiplexer and connection state |
//! | [`native`] | Native entry-point boundary, DLL binding, scripted layer |
//! | [`session`] | Connection / polling loop and request lifecycle |

pub mod blocks;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod facility;
pub mod ids;
pub mod native;
pub mod recv;
pub mod registry;
pub mod request;
pub mod session;

pub use errors::SimConnectError;
pub use session::Session;
