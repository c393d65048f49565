use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ConfigError, Field, Problem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiMode {
    /// Only broadcast the soft access point
    ApOnly,
    /// Only join the configured network
    StationOnly,
    Both,
}

impl WifiMode {
    pub fn uses_station(self) -> bool {
        matches!(self, WifiMode::StationOnly | WifiMode::Both)
    }

    pub fn uses_access_point(self) -> bool {
        matches!(self, WifiMode::ApOnly | WifiMode::Both)
    }
}

impl TryFrom<u8> for WifiMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WifiMode::ApOnly),
            1 => Ok(WifiMode::StationOnly),
            2 => Ok(WifiMode::Both),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MqttMode {
    Disabled,
    Enabled,
}

/// Rendering mode selected at boot. Modes 0 through 4 exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DisplayMode(u8);

impl DisplayMode {
    pub const MAX: u8 = 4;

    pub fn new(mode: u8) -> Result<Self, ConfigError> {
        if mode <= Self::MAX {
            Ok(Self(mode))
        } else {
            Err(ConfigError::invalid(Field::DisplayMode, Problem::OutOfRange))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DisplayMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayMode> for u8 {
    fn from(mode: DisplayMode) -> u8 {
        mode.0
    }
}

/// Boot defaults. Network fields take effect at the next boot; the
/// display and OTA options can be changed while running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootSettings {
    pub wifi_mode: WifiMode,
    /// Host name for WiFi/router
    pub wifi_hostname: String,
    /// Only honored when the WiFi mode joins a network
    pub mqtt_mode: MqttMode,
    pub mqtt_client_id: String,
    /// Commands addressed to this device
    pub mqtt_topic_subscribe_primary: String,
    /// Shared data published by other devices (date, time, ...)
    pub mqtt_topic_subscribe_secondary: String,
    pub mqtt_topic_publish: String,
    pub ota_hostname: String,
    /// Must be off when the UART pins are used for other I/O
    pub serial_debug_enabled: bool,

    /// Must stay on for update tooling to discover the board after boot
    pub ota_enabled_at_boot: bool,
    /// Minimum time after boot the board stays visible to update tooling (ms)
    pub ota_boot_window_ms: u32,
    /// Time to start an upload once the OTA window is open (ms)
    pub ota_update_window_ms: u32,

    /// Blink the LED of the current minute
    pub blink_current_minute: bool,
    /// Half-cycle of the blink (ms)
    pub blink_interval_ms: u32,
    /// Redraw minutes from 1 to the current one on each update (display mode 0 only)
    pub sweep_minutes: bool,
    pub display_mode: DisplayMode,
}

impl Default for BootSettings {
    fn default() -> Self {
        Self {
            wifi_mode: WifiMode::Both,
            wifi_hostname: "ANALOG_CLOCK".to_string(),
            mqtt_mode: MqttMode::Enabled,
            mqtt_client_id: "analog_clock".to_string(),
            mqtt_topic_subscribe_primary: "cmnd/aclock".to_string(),
            mqtt_topic_subscribe_secondary: "stat/tm1638".to_string(),
            mqtt_topic_publish: "stat/aclock".to_string(),
            ota_hostname: "ANALOG_CLOCK_OTA".to_string(),
            serial_debug_enabled: true,
            ota_enabled_at_boot: true,
            ota_boot_window_ms: 2500,
            ota_update_window_ms: 20000,
            blink_current_minute: true,
            blink_interval_ms: 1000,
            sweep_minutes: true,
            display_mode: DisplayMode::default(),
        }
    }
}

impl BootSettings {
    /// MQTT is requested and the WiFi mode can reach a broker
    pub fn mqtt_active(&self) -> bool {
        self.mqtt_mode == MqttMode::Enabled && self.wifi_mode.uses_station()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Malformed(format!("{}", e)))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|e| ConfigError::Malformed(format!("{}", e)))
    }

    /// Restore the runtime options to their defaults, leaving network fields alone
    pub fn reset_options(&mut self) {
        let defaults = Self::default();
        self.ota_enabled_at_boot = defaults.ota_enabled_at_boot;
        self.ota_boot_window_ms = defaults.ota_boot_window_ms;
        self.ota_update_window_ms = defaults.ota_update_window_ms;
        self.blink_current_minute = defaults.blink_current_minute;
        self.blink_interval_ms = defaults.blink_interval_ms;
        self.sweep_minutes = defaults.sweep_minutes;
        self.display_mode = defaults.display_mode;
    }
}

/// The one process-wide settings record, shared between the command
/// handler and the main loop.
pub struct SettingsHandle {
    settings: Mutex<BootSettings>,
}

impl SettingsHandle {
    pub fn new(settings: BootSettings) -> Arc<Self> {
        Arc::new(Self {
            settings: Mutex::new(settings),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BootSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BootSettings {
        self.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut BootSettings) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn set_blink(&self, enabled: bool) {
        self.lock().blink_current_minute = enabled;
        log::info!("Settings: Blink current minute {}", on_off(enabled));
    }

    pub fn set_blink_interval(&self, interval_ms: u32) {
        self.lock().blink_interval_ms = interval_ms;
        log::info!("Settings: Blink interval set to {} ms", interval_ms);
    }

    pub fn set_sweep(&self, enabled: bool) {
        self.lock().sweep_minutes = enabled;
        log::info!("Settings: Sweep minutes {}", on_off(enabled));
    }

    pub fn set_display_mode(&self, mode: DisplayMode) {
        self.lock().display_mode = mode;
        log::info!("Settings: Display mode set to {}", mode.get());
    }

    pub fn reset_options(&self) {
        self.lock().reset_options();
        log::info!("Settings: Options restored to defaults");
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
