/// Which configuration field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    WifiSsid,
    WifiPassword,
    MqttUsername,
    MqttPassword,
    MqttServer,
    MqttPort,
    ApSsid,
    ApPassword,
    WifiHostname,
    OtaHostname,
    MqttClientId,
    MqttTopicSubscribePrimary,
    MqttTopicSubscribeSecondary,
    MqttTopicPublish,
    BlinkInterval,
    DisplayMode,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::WifiSsid => "wifi_ssid",
            Field::WifiPassword => "wifi_password",
            Field::MqttUsername => "mqtt_username",
            Field::MqttPassword => "mqtt_password",
            Field::MqttServer => "mqtt_server",
            Field::MqttPort => "mqtt_port",
            Field::ApSsid => "ap_ssid",
            Field::ApPassword => "ap_password",
            Field::WifiHostname => "wifi_hostname",
            Field::OtaHostname => "ota_hostname",
            Field::MqttClientId => "mqtt_client_id",
            Field::MqttTopicSubscribePrimary => "mqtt_topic_subscribe_primary",
            Field::MqttTopicSubscribeSecondary => "mqtt_topic_subscribe_secondary",
            Field::MqttTopicPublish => "mqtt_topic_publish",
            Field::BlinkInterval => "blink_interval_ms",
            Field::DisplayMode => "display_mode",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// Still holds the value shipped in the sample configuration
    Placeholder,
    Empty,
    TooLong { max: usize },
    TooShort { min: usize },
    OutOfRange,
    /// MQTT topic names used for publishing cannot carry wildcards
    Wildcard,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Problem::Placeholder => write!(f, "still set to its placeholder value"),
            Problem::Empty => write!(f, "empty"),
            Problem::TooLong { max } => write!(f, "longer than {} bytes", max),
            Problem::TooShort { min } => write!(f, "shorter than {} bytes", min),
            Problem::OutOfRange => write!(f, "out of range"),
            Problem::Wildcard => write!(f, "contains an MQTT wildcard"),
        }
    }
}

/// Two settings that cannot be honored together. Reported as a warning;
/// the device boots without MQTT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// MQTT enabled but the device only runs its own access point
    MqttWithoutStation,
    /// MQTT enabled but the broker address is the `0.0.0.0` "disabled" marker
    MqttServerDisabled,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Conflict::MqttWithoutStation => {
                write!(f, "MQTT is enabled but WiFi mode is access-point only")
            }
            Conflict::MqttServerDisabled => {
                write!(f, "MQTT is enabled but the broker address is 0.0.0.0")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidConfiguration { field: Field, problem: Problem },
    /// Stored or supplied settings could not be decoded
    Malformed(String),
}

impl ConfigError {
    pub fn invalid(field: Field, problem: Problem) -> Self {
        ConfigError::InvalidConfiguration { field, problem }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConfigError::InvalidConfiguration { field, problem } => {
                write!(f, "Invalid configuration: {} is {}", field, problem)
            }
            ConfigError::Malformed(msg) => write!(f, "Malformed configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = ConfigError::invalid(Field::WifiSsid, Problem::Placeholder);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: wifi_ssid is still set to its placeholder value"
        );

        let err = ConfigError::invalid(Field::ApPassword, Problem::TooShort { min: 8 });
        assert_eq!(
            err.to_string(),
            "Invalid configuration: ap_password is shorter than 8 bytes"
        );
    }

    #[test]
    fn conflict_message() {
        let msg = Conflict::MqttWithoutStation.to_string();
        assert!(msg.contains("access-point only"));
    }
}
