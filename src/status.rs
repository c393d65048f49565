use serde::Serialize;

use crate::ota::OtaPhase;
use crate::settings::{BootSettings, MqttMode, WifiMode};

/// Last message seen on the secondary (shared data) topic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SharedData {
    pub topic: String,
    pub payload: String,
}

/// Published to the status topic after boot and after every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub wifi_mode: WifiMode,
    pub mqtt_mode: MqttMode,
    pub blink: bool,
    pub blink_interval_ms: u32,
    pub sweep: bool,
    pub display_mode: u8,
    pub ota: OtaPhase,
    pub uptime_s: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<SharedData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl StatusReport {
    pub fn new(settings: &BootSettings, ota: OtaPhase, uptime_s: u64) -> Self {
        Self {
            wifi_mode: settings.wifi_mode,
            mqtt_mode: settings.mqtt_mode,
            blink: settings.blink_current_minute,
            blink_interval_ms: settings.blink_interval_ms,
            sweep: settings.sweep_minutes,
            display_mode: settings.display_mode.get(),
            ota,
            uptime_s,
            shared: None,
            result: None,
        }
    }

    pub fn with_shared(mut self, shared: Option<SharedData>) -> Self {
        self.shared = shared;
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn to_json(&self) -> String {
        // Serializing plain fields into a String does not fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
