//! The validated configuration the firmware boots from: immutable
//! credentials plus the shared, mutable boot settings.

use std::sync::Arc;

use crate::credentials::Credentials;
use crate::error::{ConfigError, ConfigResult, Conflict, Field, Problem};
use crate::plan::{
    bounded, AccessPointPlan, MqttPlan, NetworkPlan, StationPlan, AP_ADDRESS, HOSTNAME_MAX,
    PASSWORD_MAX, SSID_MAX,
};
use crate::settings::{BootSettings, MqttMode, SettingsHandle};

/// WPA2-PSK needs at least this many characters
pub const AP_PASSWORD_MIN: usize = 8;
/// MQTT 3.1 servers may refuse longer client identifiers
pub const MQTT_CLIENT_ID_MAX: usize = 23;

pub struct ConfigurationSet {
    credentials: Credentials,
    settings: Arc<SettingsHandle>,
}

impl ConfigurationSet {
    /// Validates both records and takes ownership of them. Conflicts are
    /// logged; the device still boots, without MQTT.
    pub fn load(credentials: Credentials, settings: BootSettings) -> ConfigResult<Self> {
        validate(&credentials, &settings)?;
        for conflict in conflicts(&credentials, &settings) {
            log::warn!("Config: {}, continuing without MQTT", conflict);
        }
        Ok(Self {
            credentials,
            settings: SettingsHandle::new(settings),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn settings(&self) -> &Arc<SettingsHandle> {
        &self.settings
    }

    /// Re-checks the current settings, e.g. after runtime changes
    pub fn validate(&self) -> ConfigResult<()> {
        validate(&self.credentials, &self.settings.snapshot())
    }

    pub fn network_plan(&self) -> ConfigResult<NetworkPlan> {
        network_plan(&self.credentials, &self.settings.snapshot())
    }

    pub fn mqtt_plan(&self) -> Option<MqttPlan> {
        mqtt_plan(&self.credentials, &self.settings.snapshot())
    }
}

/// Checks every field needed by the enabled features.
pub fn validate(credentials: &Credentials, settings: &BootSettings) -> ConfigResult<()> {
    check_name(Field::WifiHostname, &settings.wifi_hostname, HOSTNAME_MAX)?;
    check_name(Field::OtaHostname, &settings.ota_hostname, HOSTNAME_MAX)?;

    if settings.blink_interval_ms == 0 {
        return Err(ConfigError::invalid(Field::BlinkInterval, Problem::OutOfRange));
    }

    if settings.wifi_mode.uses_station() {
        check_secret(Field::WifiSsid, &credentials.wifi_ssid, 1, SSID_MAX)?;
        check_secret(Field::WifiPassword, &credentials.wifi_password, 1, PASSWORD_MAX)?;
    }

    if settings.wifi_mode.uses_access_point() {
        check_secret(Field::ApSsid, &credentials.ap_ssid, 1, SSID_MAX)?;
        check_secret(
            Field::ApPassword,
            &credentials.ap_password,
            AP_PASSWORD_MIN,
            PASSWORD_MAX,
        )?;
    }

    if mqtt_will_connect(credentials, settings) {
        check_secret(Field::MqttServer, &credentials.mqtt_server, 1, usize::MAX)?;
        check_secret(Field::MqttUsername, &credentials.mqtt_username, 1, usize::MAX)?;
        check_secret(Field::MqttPassword, &credentials.mqtt_password, 1, usize::MAX)?;
        if credentials.mqtt_port == 0 {
            return Err(ConfigError::invalid(Field::MqttPort, Problem::OutOfRange));
        }

        check_name(Field::MqttClientId, &settings.mqtt_client_id, MQTT_CLIENT_ID_MAX)?;
        check_name(
            Field::MqttTopicSubscribePrimary,
            &settings.mqtt_topic_subscribe_primary,
            usize::MAX,
        )?;
        check_name(
            Field::MqttTopicSubscribeSecondary,
            &settings.mqtt_topic_subscribe_secondary,
            usize::MAX,
        )?;
        check_name(Field::MqttTopicPublish, &settings.mqtt_topic_publish, usize::MAX)?;
        if settings.mqtt_topic_publish.contains(['+', '#']) {
            return Err(ConfigError::invalid(Field::MqttTopicPublish, Problem::Wildcard));
        }
    }

    Ok(())
}

/// MQTT is requested but another setting rules it out.
pub fn conflicts(credentials: &Credentials, settings: &BootSettings) -> Vec<Conflict> {
    let mut found = Vec::new();
    if settings.mqtt_mode == MqttMode::Enabled {
        if !settings.wifi_mode.uses_station() {
            found.push(Conflict::MqttWithoutStation);
        } else if credentials.mqtt_server_disabled() {
            found.push(Conflict::MqttServerDisabled);
        }
    }
    found
}

fn mqtt_will_connect(credentials: &Credentials, settings: &BootSettings) -> bool {
    settings.mqtt_active() && !credentials.mqtt_server_disabled()
}

fn check_name(field: Field, value: &str, max: usize) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, Problem::Empty));
    }
    if value.len() > max {
        return Err(ConfigError::invalid(field, Problem::TooLong { max }));
    }
    Ok(())
}

fn check_secret(field: Field, value: &str, min: usize, max: usize) -> ConfigResult<()> {
    if Credentials::placeholder_for(field) == Some(value.trim()) {
        return Err(ConfigError::invalid(field, Problem::Placeholder));
    }
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, Problem::Empty));
    }
    if value.len() < min {
        return Err(ConfigError::invalid(field, Problem::TooShort { min }));
    }
    if value.len() > max {
        return Err(ConfigError::invalid(field, Problem::TooLong { max }));
    }
    Ok(())
}

/// Which interfaces to bring up. Both in `WifiMode::Both`.
pub fn network_plan(
    credentials: &Credentials,
    settings: &BootSettings,
) -> ConfigResult<NetworkPlan> {
    let station = if settings.wifi_mode.uses_station() {
        Some(StationPlan {
            ssid: bounded(Field::WifiSsid, &credentials.wifi_ssid)?,
            password: bounded(Field::WifiPassword, &credentials.wifi_password)?,
        })
    } else {
        None
    };

    let access_point = if settings.wifi_mode.uses_access_point() {
        Some(AccessPointPlan {
            ssid: bounded(Field::ApSsid, &credentials.ap_ssid)?,
            password: bounded(Field::ApPassword, &credentials.ap_password)?,
            address: AP_ADDRESS,
        })
    } else {
        None
    };

    Ok(NetworkPlan {
        hostname: bounded(Field::WifiHostname, &settings.wifi_hostname)?,
        station,
        access_point,
    })
}

/// `None` whenever no broker connection should be attempted.
pub fn mqtt_plan(credentials: &Credentials, settings: &BootSettings) -> Option<MqttPlan> {
    if !mqtt_will_connect(credentials, settings) {
        return None;
    }

    Some(MqttPlan {
        broker_url: credentials.mqtt_broker_url(),
        client_id: settings.mqtt_client_id.clone(),
        username: credentials.mqtt_username.clone(),
        password: credentials.mqtt_password.clone(),
        subscribe_primary: settings.mqtt_topic_subscribe_primary.clone(),
        subscribe_secondary: settings.mqtt_topic_subscribe_secondary.clone(),
        publish: settings.mqtt_topic_publish.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WifiMode;

    fn real_credentials() -> Credentials {
        Credentials {
            wifi_ssid: "home-net".to_string(),
            wifi_password: "wifi-secret".to_string(),
            mqtt_username: "clock".to_string(),
            mqtt_password: "broker-secret".to_string(),
            mqtt_server: "10.0.0.2".to_string(),
            mqtt_port: 1883,
            ap_ssid: "analog_clock".to_string(),
            ap_password: "clock-hotspot".to_string(),
        }
    }

    fn settings(wifi_mode: WifiMode, mqtt_mode: MqttMode) -> BootSettings {
        BootSettings {
            wifi_mode,
            mqtt_mode,
            ..Default::default()
        }
    }

    #[test]
    fn filled_in_credentials_pass() {
        let config = ConfigurationSet::load(real_credentials(), BootSettings::default()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_credentials_fail_fast() {
        let err = ConfigurationSet::load(Credentials::default(), BootSettings::default())
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::invalid(Field::WifiSsid, Problem::Placeholder));
    }

    #[test]
    fn each_placeholder_is_rejected_when_its_feature_is_on() {
        let cases: [(Field, fn(&mut Credentials)); 6] = [
            (Field::WifiSsid, |c| c.wifi_ssid = "YOUR_WIFI_SSID".into()),
            (Field::WifiPassword, |c| c.wifi_password = "YOUR_WIFI_PASSWORD".into()),
            (Field::MqttUsername, |c| c.mqtt_username = "MQTT_USER".into()),
            (Field::MqttPassword, |c| c.mqtt_password = "MQTT_PASSWORD".into()),
            (Field::MqttServer, |c| c.mqtt_server = "192.168.1.108".into()),
            (Field::ApPassword, |c| c.ap_password = "hot_spot_pw".into()),
        ];

        for (field, apply) in cases {
            let mut creds = real_credentials();
            apply(&mut creds);
            assert_eq!(
                validate(&creds, &BootSettings::default()),
                Err(ConfigError::invalid(field, Problem::Placeholder)),
                "{} placeholder accepted",
                field
            );
        }
    }

    #[test]
    fn placeholders_of_unused_features_are_ignored() {
        // AP only: station and broker secrets are never used
        let creds = Credentials {
            ap_password: "clock-hotspot".to_string(),
            ..Default::default()
        };
        assert!(validate(&creds, &settings(WifiMode::ApOnly, MqttMode::Disabled)).is_ok());

        // Station only without MQTT: AP and broker secrets are never used
        let creds = Credentials {
            wifi_ssid: "home-net".to_string(),
            wifi_password: "wifi-secret".to_string(),
            ..Default::default()
        };
        assert!(validate(&creds, &settings(WifiMode::StationOnly, MqttMode::Disabled)).is_ok());
    }

    #[test]
    fn both_mode_requires_both_credential_sets() {
        let mut creds = real_credentials();
        creds.ap_password = "short".to_string();
        assert_eq!(
            validate(&creds, &settings(WifiMode::Both, MqttMode::Disabled)),
            Err(ConfigError::invalid(Field::ApPassword, Problem::TooShort { min: 8 }))
        );

        let mut creds = real_credentials();
        creds.wifi_ssid.clear();
        assert_eq!(
            validate(&creds, &settings(WifiMode::Both, MqttMode::Disabled)),
            Err(ConfigError::invalid(Field::WifiSsid, Problem::Empty))
        );

        let config = ConfigurationSet::load(
            real_credentials(),
            settings(WifiMode::Both, MqttMode::Disabled),
        )
        .unwrap();
        let plan = config.network_plan().unwrap();
        assert_eq!(plan.station.unwrap().ssid.as_str(), "home-net");
        let ap = plan.access_point.unwrap();
        assert_eq!(ap.ssid.as_str(), "analog_clock");
        assert_eq!(ap.address.to_string(), "192.168.4.1");
    }

    #[test]
    fn single_interface_modes() {
        let creds = real_credentials();
        let ap = network_plan(&creds, &settings(WifiMode::ApOnly, MqttMode::Disabled)).unwrap();
        assert!(ap.station.is_none());
        assert!(ap.access_point.is_some());

        let sta =
            network_plan(&creds, &settings(WifiMode::StationOnly, MqttMode::Disabled)).unwrap();
        assert!(sta.station.is_some());
        assert!(sta.access_point.is_none());
        assert_eq!(sta.hostname.as_str(), "ANALOG_CLOCK");
    }

    #[test]
    fn mqtt_on_access_point_only_boots_without_mqtt() {
        let s = settings(WifiMode::ApOnly, MqttMode::Enabled);
        assert_eq!(
            conflicts(&real_credentials(), &s),
            vec![Conflict::MqttWithoutStation]
        );

        let config = ConfigurationSet::load(real_credentials(), s).unwrap();
        assert!(config.mqtt_plan().is_none());
        assert!(config.network_plan().unwrap().access_point.is_some());
    }

    #[test]
    fn disabled_marker_boots_without_mqtt() {
        let mut creds = real_credentials();
        creds.mqtt_server = "0.0.0.0".to_string();
        assert_eq!(
            conflicts(&creds, &BootSettings::default()),
            vec![Conflict::MqttServerDisabled]
        );

        let config = ConfigurationSet::load(creds, BootSettings::default()).unwrap();
        assert!(config.mqtt_plan().is_none());
        assert!(config.network_plan().unwrap().station.is_some());
    }

    #[test]
    fn broker_secrets_unchecked_when_mqtt_cannot_connect() {
        let creds = Credentials {
            wifi_ssid: "home-net".to_string(),
            wifi_password: "wifi-secret".to_string(),
            ap_password: "clock-hotspot".to_string(),
            mqtt_server: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert!(validate(&creds, &BootSettings::default()).is_ok());
    }

    #[test]
    fn no_conflicts_for_a_consistent_setup() {
        assert!(conflicts(&real_credentials(), &BootSettings::default()).is_empty());
        assert!(conflicts(
            &real_credentials(),
            &settings(WifiMode::ApOnly, MqttMode::Disabled)
        )
        .is_empty());
    }

    #[test]
    fn padded_placeholders_and_blank_secrets_are_rejected() {
        let mut creds = real_credentials();
        creds.wifi_ssid = " YOUR_WIFI_SSID ".to_string();
        assert_eq!(
            validate(&creds, &BootSettings::default()),
            Err(ConfigError::invalid(Field::WifiSsid, Problem::Placeholder))
        );

        let mut creds = real_credentials();
        creds.wifi_password = "   ".to_string();
        assert_eq!(
            validate(&creds, &BootSettings::default()),
            Err(ConfigError::invalid(Field::WifiPassword, Problem::Empty))
        );

        let mut creds = real_credentials();
        creds.mqtt_username = "MQTT_USER\n".to_string();
        assert_eq!(
            validate(&creds, &BootSettings::default()),
            Err(ConfigError::invalid(Field::MqttUsername, Problem::Placeholder))
        );
    }

    #[test]
    fn no_mqtt_plan_when_disabled_or_ap_only() {
        let creds = real_credentials();
        for s in [
            settings(WifiMode::Both, MqttMode::Disabled),
            settings(WifiMode::StationOnly, MqttMode::Disabled),
            settings(WifiMode::ApOnly, MqttMode::Enabled),
            settings(WifiMode::ApOnly, MqttMode::Disabled),
        ] {
            assert!(mqtt_plan(&creds, &s).is_none(), "{:?}", s.wifi_mode);
        }
    }

    #[test]
    fn mqtt_plan_carries_port_verbatim() {
        let config = ConfigurationSet::load(real_credentials(), BootSettings::default()).unwrap();
        let plan = config.mqtt_plan().unwrap();
        assert_eq!(plan.broker_url, "mqtt://10.0.0.2:1883");
        assert_eq!(plan.client_id, "analog_clock");
        assert_eq!(plan.subscriptions(), ["cmnd/aclock", "stat/tm1638"]);
        assert_eq!(plan.publish, "stat/aclock");

        let mut creds = real_credentials();
        creds.mqtt_port = 21883;
        let plan = mqtt_plan(&creds, &BootSettings::default()).unwrap();
        assert_eq!(plan.broker_url, "mqtt://10.0.0.2:21883");
    }

    #[test]
    fn topic_and_name_checks() {
        let creds = real_credentials();

        let mut s = BootSettings::default();
        s.mqtt_topic_publish = "stat/#".to_string();
        assert_eq!(
            validate(&creds, &s),
            Err(ConfigError::invalid(Field::MqttTopicPublish, Problem::Wildcard))
        );

        let mut s = BootSettings::default();
        s.mqtt_client_id = "a-client-id-that-is-far-too-long".to_string();
        assert_eq!(
            validate(&creds, &s),
            Err(ConfigError::invalid(Field::MqttClientId, Problem::TooLong { max: 23 }))
        );

        let mut s = BootSettings::default();
        s.wifi_hostname = " ".to_string();
        assert_eq!(
            validate(&creds, &s),
            Err(ConfigError::invalid(Field::WifiHostname, Problem::Empty))
        );

        let mut s = BootSettings::default();
        s.blink_interval_ms = 0;
        assert_eq!(
            validate(&creds, &s),
            Err(ConfigError::invalid(Field::BlinkInterval, Problem::OutOfRange))
        );
    }

    #[test]
    fn overlong_ssid_is_rejected() {
        let mut creds = real_credentials();
        creds.wifi_ssid = "x".repeat(33);
        assert_eq!(
            validate(&creds, &BootSettings::default()),
            Err(ConfigError::invalid(Field::WifiSsid, Problem::TooLong { max: 32 }))
        );
    }
}
