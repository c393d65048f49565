//! ESP32 Analog Clock Firmware Library
//!
//! Credentials and boot settings of the clock, their validation, and the
//! WiFi/MQTT/OTA plumbing that consumes them. Everything except the device
//! drivers builds and tests on the host.

pub mod command;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ota;
pub mod plan;
pub mod settings;
pub mod status;
pub mod storage;

#[cfg(target_os = "espidf")]
pub mod firmware;
#[cfg(target_os = "espidf")]
pub mod mqtt;
#[cfg(target_os = "espidf")]
pub mod wifi;

pub use command::{ClockCommand, CommandError, CommandHandler, CommandOutcome, CommandParser};
pub use config::ConfigurationSet;
pub use credentials::Credentials;
pub use error::{ConfigError, ConfigResult};
pub use ota::{OtaPhase, OtaWindow};
pub use plan::{MqttPlan, NetworkPlan};
pub use settings::{BootSettings, DisplayMode, MqttMode, SettingsHandle, WifiMode};
pub use status::StatusReport;
pub use storage::{MemoryStore, SettingsStore};

#[cfg(target_os = "espidf")]
pub use mqtt::MqttClient;
#[cfg(target_os = "espidf")]
pub use wifi::WifiManager;
