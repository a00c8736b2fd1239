//! Fixed-layout data blocks written with `SetDataOnSimObject`.
//!
//! SimConnect packs these structures to 1 byte; [`InitPosition::to_bytes`]
//! and [`Waypoint::to_bytes`] produce exactly that layout.

use serde::{Deserialize, Serialize};

/// `SIMCONNECT_DATA_INITPOSITION`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitPosition {
    /// Feet.
    pub altitude: f64,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    pub pitch: f64,
    pub bank: f64,
    pub heading: f64,
    pub on_ground: bool,
    /// Knots.
    pub airspeed: u32,
}

impl Default for InitPosition {
    fn default() -> Self {
        Self {
            altitude: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            pitch: 0.0,
            bank: 0.0,
            heading: 0.0,
            on_ground: false,
            airspeed: 0,
        }
    }
}

impl InitPosition {
    pub const SIZE: usize = 6 * 8 + 4 + 4;

    pub fn new(altitude: f64, latitude: f64, longitude: f64, airspeed: u32) -> Self {
        Self {
            altitude,
            latitude,
            longitude,
            airspeed,
            ..Self::default()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        for v in [
            self.latitude,
            self.longitude,
            self.altitude,
            self.pitch,
            self.bank,
            self.heading,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&u32::from(self.on_ground).to_le_bytes());
        buf.extend_from_slice(&self.airspeed.to_le_bytes());
        buf
    }
}

/// `SIMCONNECT_WAYPOINT_FLAGS`.
pub mod waypoint_flags {
    pub const NONE: u32 = 0x00;
    pub const SPEED_REQUESTED: u32 = 0x04;
    pub const THROTTLE_REQUESTED: u32 = 0x08;
    pub const COMPUTE_VERTICAL_SPEED: u32 = 0x10;
    pub const ALTITUDE_IS_AGL: u32 = 0x20;
    pub const ON_GROUND: u32 = 0x0010_0000;
    pub const REVERSE: u32 = 0x0020_0000;
    pub const WRAP_TO_FIRST: u32 = 0x0040_0000;
}

/// `SIMCONNECT_DATA_WAYPOINT`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Feet.
    pub altitude: f64,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub kts_speed: f64,
    #[serde(default)]
    pub percent_throttle: f64,
}

impl Waypoint {
    pub const SIZE: usize = 3 * 8 + 4 + 2 * 8;

    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            flags: waypoint_flags::NONE,
            kts_speed: 0.0,
            percent_throttle: 0.0,
        }
    }

    /// Request a speed at this waypoint.
    pub fn with_speed(mut self, knots: f64) -> Self {
        self.kts_speed = knots;
        self.flags |= waypoint_flags::SPEED_REQUESTED;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        for v in [self.latitude, self.longitude, self.altitude] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.kts_speed.to_le_bytes());
        buf.extend_from_slice(&self.percent_throttle.to_le_bytes());
        buf
    }
}
