use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, Field, Problem};

/// Values shipped in the sample configuration. A device still carrying one of
/// these for a feature it uses has not been set up yet.
pub const PLACEHOLDER_WIFI_SSID: &str = "YOUR_WIFI_SSID";
pub const PLACEHOLDER_WIFI_PASSWORD: &str = "YOUR_WIFI_PASSWORD";
pub const PLACEHOLDER_MQTT_USERNAME: &str = "MQTT_USER";
pub const PLACEHOLDER_MQTT_PASSWORD: &str = "MQTT_PASSWORD";
pub const PLACEHOLDER_MQTT_SERVER: &str = "192.168.1.108";
pub const PLACEHOLDER_AP_PASSWORD: &str = "hot_spot_pw";

pub const DEFAULT_AP_SSID: &str = "analog_clock";
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Broker address meaning "no broker configured"
pub const MQTT_SERVER_DISABLED: &str = "0.0.0.0";

/// Network secrets. Loaded once at boot and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
    /// IP address or hostname of the MQTT broker
    pub mqtt_server: String,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    pub ap_ssid: String,
    pub ap_password: String,
}

fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            wifi_ssid: PLACEHOLDER_WIFI_SSID.to_string(),
            wifi_password: PLACEHOLDER_WIFI_PASSWORD.to_string(),
            mqtt_username: PLACEHOLDER_MQTT_USERNAME.to_string(),
            mqtt_password: PLACEHOLDER_MQTT_PASSWORD.to_string(),
            mqtt_server: PLACEHOLDER_MQTT_SERVER.to_string(),
            mqtt_port: DEFAULT_MQTT_PORT,
            ap_ssid: DEFAULT_AP_SSID.to_string(),
            ap_password: PLACEHOLDER_AP_PASSWORD.to_string(),
        }
    }
}

impl Credentials {
    /// Credentials baked in at compile time through `ACLOCK_*` environment
    /// variables. Anything not provided keeps its placeholder.
    pub fn from_build_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| match key {
            "ACLOCK_WIFI_SSID" => option_env!("ACLOCK_WIFI_SSID"),
            "ACLOCK_WIFI_PASSWORD" => option_env!("ACLOCK_WIFI_PASSWORD"),
            "ACLOCK_MQTT_USERNAME" => option_env!("ACLOCK_MQTT_USERNAME"),
            "ACLOCK_MQTT_PASSWORD" => option_env!("ACLOCK_MQTT_PASSWORD"),
            "ACLOCK_MQTT_SERVER" => option_env!("ACLOCK_MQTT_SERVER"),
            "ACLOCK_MQTT_PORT" => option_env!("ACLOCK_MQTT_PORT"),
            "ACLOCK_AP_SSID" => option_env!("ACLOCK_AP_SSID"),
            "ACLOCK_AP_PASSWORD" => option_env!("ACLOCK_AP_PASSWORD"),
            _ => None,
        })
    }

    /// Builds credentials from a key lookup, falling back to the defaults.
    pub fn from_lookup<'a, F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut credentials = Self::default();
        let fields: [(&str, &mut String); 7] = [
            ("ACLOCK_WIFI_SSID", &mut credentials.wifi_ssid),
            ("ACLOCK_WIFI_PASSWORD", &mut credentials.wifi_password),
            ("ACLOCK_MQTT_USERNAME", &mut credentials.mqtt_username),
            ("ACLOCK_MQTT_PASSWORD", &mut credentials.mqtt_password),
            ("ACLOCK_MQTT_SERVER", &mut credentials.mqtt_server),
            ("ACLOCK_AP_SSID", &mut credentials.ap_ssid),
            ("ACLOCK_AP_PASSWORD", &mut credentials.ap_password),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key) {
                *slot = value.to_string();
            }
        }

        if let Some(port) = lookup("ACLOCK_MQTT_PORT") {
            credentials.mqtt_port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(ConfigError::invalid(Field::MqttPort, Problem::OutOfRange))?;
        }

        Ok(credentials)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Malformed(format!("{}", e)))
    }

    /// The broker address is the `0.0.0.0` marker for "no broker"
    pub fn mqtt_server_disabled(&self) -> bool {
        self.mqtt_server.trim() == MQTT_SERVER_DISABLED
    }

    /// Broker URL in the form the ESP-IDF MQTT client expects
    pub fn mqtt_broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_server.trim(), self.mqtt_port)
    }

    /// The sample value for `field`, if it has one.
    pub fn placeholder_for(field: Field) -> Option<&'static str> {
        match field {
            Field::WifiSsid => Some(PLACEHOLDER_WIFI_SSID),
            Field::WifiPassword => Some(PLACEHOLDER_WIFI_PASSWORD),
            Field::MqttUsername => Some(PLACEHOLDER_MQTT_USERNAME),
            Field::MqttPassword => Some(PLACEHOLDER_MQTT_PASSWORD),
            Field::MqttServer => Some(PLACEHOLDER_MQTT_SERVER),
            Field::ApPassword => Some(PLACEHOLDER_AP_PASSWORD),
            _ => None,
        }
    }
}
