use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};
use log::{info, warn};

use crate::plan::{AccessPointPlan, NetworkPlan, StationPlan};

// SAFETY: WifiManager wraps ESP-IDF WiFi which is thread-safe
unsafe impl Send for WifiManager {}
unsafe impl Sync for WifiManager {}

pub struct WifiManager {
    wifi: Box<BlockingWifi<EspWifi<'static>>>,
    plan: NetworkPlan,
}

impl WifiManager {
    /// Configures and starts the interfaces named in `plan`. The access
    /// point is up when this returns; the station joins in `connect_station`.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        plan: NetworkPlan,
    ) -> Result<Self> {
        info!("🌐 WiFi: Creating EspWifi instance...");
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;

        esp_wifi.sta_netif_mut().set_hostname(plan.hostname.as_str())?;
        info!("🌐 WiFi: Hostname '{}'", plan.hostname);

        let configuration = configuration_for(&plan)?;
        esp_wifi.set_configuration(&configuration)?;
        info!("✅ WiFi: Configuration set");

        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        info!("🌐 WiFi: Starting...");
        wifi.start()?;
        info!("✅ WiFi: Started");

        if let Some(ap) = &plan.access_point {
            info!("📡 WiFi: Access point '{}' on {}", ap.ssid, ap.address);
        }

        Ok(Self {
            wifi: Box::new(wifi),
            plan,
        })
    }

    /// Joins the configured network, if any. A failed join is only fatal
    /// when there is no access point to fall back on.
    pub fn connect_station(&mut self) -> Result<()> {
        let Some(station) = self.plan.station.clone() else {
            return Ok(());
        };
        match self.join(&station) {
            Ok(()) => Ok(()),
            Err(e) if self.plan.access_point.is_some() => {
                warn!("❌ WiFi: Could not join '{}': {:?}", station.ssid, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn join(&mut self, station: &StationPlan) -> Result<()> {
        info!("🌐 WiFi: Connecting to '{}'...", station.ssid);
        self.wifi.connect()?;
        info!("✅ WiFi: Connected");

        self.wifi.wait_netif_up()?;
        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("🌐 WiFi: IP address: {}", ip_info.ip);
        Ok(())
    }

    /// Re-joins the configured network if the station dropped
    pub fn ensure_connected(&mut self) -> Result<()> {
        let Some(station) = self.plan.station.clone() else {
            return Ok(());
        };
        if self.wifi.is_connected().unwrap_or(false) {
            return Ok(());
        }
        info!("WiFi reconnect to '{}'", station.ssid);
        self.join(&station)
    }
}

fn configuration_for(plan: &NetworkPlan) -> Result<Configuration> {
    let client = plan.station.as_ref().map(client_configuration);
    let ap = plan.access_point.as_ref().map(access_point_configuration);

    match (client, ap) {
        (Some(client), Some(ap)) => Ok(Configuration::Mixed(client, ap)),
        (Some(client), None) => Ok(Configuration::Client(client)),
        (None, Some(ap)) => Ok(Configuration::AccessPoint(ap)),
        (None, None) => anyhow::bail!("WiFi plan has no interface"),
    }
}

fn client_configuration(station: &StationPlan) -> ClientConfiguration {
    ClientConfiguration {
        ssid: station.ssid.clone(),
        auth_method: AuthMethod::WPA2Personal,
        password: station.password.clone(),
        ..Default::default()
    }
}

fn access_point_configuration(ap: &AccessPointPlan) -> AccessPointConfiguration {
    AccessPointConfiguration {
        ssid: ap.ssid.clone(),
        auth_method: AuthMethod::WPA2Personal,
        password: ap.password.clone(),
        channel: 1,
        ..Default::default()
    }
}
