//! What the connectivity drivers are asked to bring up, derived from a
//! validated configuration.

use std::net::Ipv4Addr;

use crate::error::{ConfigError, ConfigResult, Field, Problem};

pub const SSID_MAX: usize = 32;
pub const PASSWORD_MAX: usize = 64;
pub const HOSTNAME_MAX: usize = 32;

/// Address the soft access point serves itself on
pub const AP_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationPlan {
    pub ssid: heapless::String<SSID_MAX>,
    pub password: heapless::String<PASSWORD_MAX>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointPlan {
    pub ssid: heapless::String<SSID_MAX>,
    pub password: heapless::String<PASSWORD_MAX>,
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub hostname: heapless::String<HOSTNAME_MAX>,
    pub station: Option<StationPlan>,
    pub access_point: Option<AccessPointPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttPlan {
    pub broker_url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub subscribe_primary: String,
    pub subscribe_secondary: String,
    pub publish: String,
}

impl MqttPlan {
    pub fn subscriptions(&self) -> [&str; 2] {
        [&self.subscribe_primary, &self.subscribe_secondary]
    }
}

/// Copies `value` into a bounded string, reporting `field` when it does not fit.
pub fn bounded<const N: usize>(field: Field, value: &str) -> ConfigResult<heapless::String<N>> {
    let mut out = heapless::String::<N>::new();
    out.push_str(value)
        .map_err(|_| ConfigError::invalid(field, Problem::TooLong { max: N }))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_rejects_overflow() {
        let ok: heapless::String<4> = bounded(Field::WifiSsid, "abcd").unwrap();
        assert_eq!(ok.as_str(), "abcd");

        let err = bounded::<4>(Field::WifiSsid, "abcde").unwrap_err();
        assert_eq!(
            err,
            ConfigError::invalid(Field::WifiSsid, Problem::TooLong { max: 4 })
        );
    }
}
