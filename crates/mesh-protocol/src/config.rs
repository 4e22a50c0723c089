use std::time::Duration;

use crate::store::Persistence;
use crate::types::PacketType;

/// Version baked into this firmware build; compared against advertised
/// OTA versions.
pub const FIRMWARE_VERSION: u32 = 2;

/// Persistence keys for configuration and boot sequencing.
pub const BOOT_STATE_KEY: &str = "boot_state";
pub const BATTERY_HV_KEY: &str = "battery_hv";
pub const BATTERY_LV_KEY: &str = "battery_lv";
pub const SENSOR_HV_KEY: &str = "sensor_hv";
pub const SENSOR_LV_KEY: &str = "sensor_lv";
pub const SLEEP_DURATION_KEY: &str = "sleep_duration";
pub const NODE_ADDRESS_KEY: &str = "node_address";

/// Calibration defaults in millivolts, measured on the reference
/// hardware.
const DEFAULT_BATTERY_HIGH_MV: u32 = 2100;
const DEFAULT_BATTERY_LOW_MV: u32 = 1450;
const DEFAULT_MOISTURE_HIGH_MV: u32 = 2707;
const DEFAULT_MOISTURE_LOW_MV: u32 = 1344;
const DEFAULT_SLEEP_DURATION: Duration = Duration::from_secs(60);

/// What the firmware does on its next boot. Persisted across deep
/// sleep so an accepted OTA update is installed before the node
/// rejoins the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    /// Normal cycle: wake, join the mesh, report, sleep.
    ReadAndReport = 1,
    /// An update was advertised; download and install it.
    InstallOtaUpdate = 2,
    /// First boot on new firmware; confirm it before committing.
    VerifyOtaUpdate = 3,
}

impl BootState {
    pub fn from_u32(raw: u32) -> Option<BootState> {
        match raw {
            1 => Some(BootState::ReadAndReport),
            2 => Some(BootState::InstallOtaUpdate),
            3 => Some(BootState::VerifyOtaUpdate),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Read the persisted boot state; absent or unknown values mean a
    /// normal cycle.
    pub fn load(store: &dyn Persistence) -> BootState {
        store
            .get_u32(BOOT_STATE_KEY)
            .and_then(BootState::from_u32)
            .unwrap_or(BootState::ReadAndReport)
    }
}

/// Live node configuration: sensor calibration thresholds and the
/// deep-sleep duration. Updated remotely by the hub via config-update
/// packets and persisted so values survive the sleep cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub battery_high_mv: u32,
    pub battery_low_mv: u32,
    pub moisture_high_mv: u32,
    pub moisture_low_mv: u32,
    pub sleep_duration: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            battery_high_mv: DEFAULT_BATTERY_HIGH_MV,
            battery_low_mv: DEFAULT_BATTERY_LOW_MV,
            moisture_high_mv: DEFAULT_MOISTURE_HIGH_MV,
            moisture_low_mv: DEFAULT_MOISTURE_LOW_MV,
            sleep_duration: DEFAULT_SLEEP_DURATION,
        }
    }
}

impl NodeConfig {
    /// Overlay persisted values onto the calibration defaults.
    pub fn load(store: &dyn Persistence) -> NodeConfig {
        let mut config = NodeConfig::default();
        if let Some(v) = store.get_u32(BATTERY_HV_KEY) {
            config.battery_high_mv = v;
        }
        if let Some(v) = store.get_u32(BATTERY_LV_KEY) {
            config.battery_low_mv = v;
        }
        if let Some(v) = store.get_u32(SENSOR_HV_KEY) {
            config.moisture_high_mv = v;
        }
        if let Some(v) = store.get_u32(SENSOR_LV_KEY) {
            config.moisture_low_mv = v;
        }
        if let Some(v) = store.get_u32(SLEEP_DURATION_KEY) {
            config.sleep_duration = Duration::from_secs(u64::from(v));
        }
        config
    }

    /// Apply one config-update value, returning the store key it
    /// persists under, or `None` for a type that is not a config
    /// update.
    pub fn apply(&mut self, update_type: PacketType, value: u32) -> Option<&'static str> {
        match update_type {
            PacketType::UPDATE_BATTERY_HV => {
                self.battery_high_mv = value;
                Some(BATTERY_HV_KEY)
            }
            PacketType::UPDATE_BATTERY_LV => {
                self.battery_low_mv = value;
                Some(BATTERY_LV_KEY)
            }
            PacketType::UPDATE_SENSOR_HV => {
                self.moisture_high_mv = value;
                Some(SENSOR_HV_KEY)
            }
            PacketType::UPDATE_SENSOR_LV => {
                self.moisture_low_mv = value;
                Some(SENSOR_LV_KEY)
            }
            PacketType::UPDATE_SLEEP_DURATION => {
                self.sleep_duration = Duration::from_secs(u64::from(value));
                Some(SLEEP_DURATION_KEY)
            }
            _ => None,
        }
    }
}
