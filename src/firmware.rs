//! Boot sequence and main loop of the device build.

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::command::{CommandHandler, CommandOutcome};
use crate::config::ConfigurationSet;
use crate::credentials::Credentials;
use crate::mqtt::MqttClient;
use crate::ota::server::OtaServer;
use crate::ota::OtaWindow;
use crate::status::StatusReport;
use crate::storage::nvs::NvsStore;
use crate::storage::load_settings;
use crate::wifi::WifiManager;

const LOOP_TICK: Duration = Duration::from_millis(100);
const WIFI_CHECK_INTERVAL: Duration = Duration::from_secs(30);

pub fn run() -> Result<()> {
    esp_idf_svc::sys::link_patches();

    let boot = Instant::now();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let settings = load_settings(&mut NvsStore::new(nvs.clone())?);

    if settings.serial_debug_enabled {
        esp_idf_svc::log::EspLogger::initialize_default();
    } else {
        // UART pins are in use by other I/O
        log::set_max_level(log::LevelFilter::Off);
    }

    log::info!("Analog clock v{} booting", env!("CARGO_PKG_VERSION"));

    let config = match Credentials::from_build_env()
        .and_then(|credentials| ConfigurationSet::load(credentials, settings))
    {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            log::error!("Refusing to start networking until the configuration is fixed");
            loop {
                FreeRtos::delay_ms(60_000);
            }
        }
    };

    let snapshot = config.settings().snapshot();
    let plan = config.network_plan()?;
    let mut wifi = WifiManager::new(peripherals.modem, sysloop, nvs.clone(), plan)?;

    let ota = Arc::new(Mutex::new(OtaWindow::at_boot(&snapshot)));
    let mut ota_server = None;

    // The boot window counts from power-up; listen before a slow station join
    if ota_window_open(&ota, boot) {
        ota_server = Some(OtaServer::start(&snapshot.ota_hostname, Arc::clone(&ota), boot)?);
    }
    wifi.connect_station()?;

    let mut handler = CommandHandler::new(Arc::clone(config.settings()), Arc::clone(&ota))
        .with_store(Box::new(NvsStore::new(nvs)?))
        .with_boot(boot);

    let (tx, rx) = mpsc::channel::<(String, Vec<u8>)>();
    let mqtt = match config.mqtt_plan() {
        Some(plan) => {
            let callback = Arc::new(move |topic: &str, data: &[u8]| {
                let _ = tx.send((topic.to_string(), data.to_vec()));
            });
            Some(MqttClient::new(plan, callback)?)
        }
        None => {
            log::info!("MQTT disabled");
            None
        }
    };

    let mut boot_status_sent = false;
    let mut last_wifi_check = Instant::now();

    log::info!("✅ Boot complete, entering main loop");

    loop {
        let ota_open = ota_window_open(&ota, boot);
        if ota_open && ota_server.is_none() {
            ota_server = Some(OtaServer::start(&snapshot.ota_hostname, Arc::clone(&ota), boot)?);
        } else if !ota_open && ota_server.take().is_some() {
            log::info!("OTA: Window closed, listener stopped");
        }

        if let Some(mqtt) = &mqtt {
            if let Err(e) = mqtt.subscribe_if_needed() {
                log::warn!("MQTT subscribe failed: {:?}", e);
            }
            if !boot_status_sent && mqtt.is_connected() {
                boot_status_sent = publish(mqtt, &handler.status().with_result("boot"));
            }
        }

        match rx.recv_timeout(LOOP_TICK) {
            Ok((topic, payload)) => match handler.handle_message(&topic, &payload) {
                CommandOutcome::Reply(report) => {
                    if let Some(mqtt) = &mqtt {
                        publish(mqtt, &report);
                    }
                }
                CommandOutcome::Restart(report) => {
                    if let Some(mqtt) = &mqtt {
                        publish(mqtt, &report);
                    }
                    FreeRtos::delay_ms(500);
                    esp_idf_svc::hal::reset::restart();
                }
                CommandOutcome::Nothing => {}
            },
            Err(RecvTimeoutError::Timeout) => {}
            // No MQTT client holds the sender
            Err(RecvTimeoutError::Disconnected) => FreeRtos::delay_ms(LOOP_TICK.as_millis() as u32),
        }

        if last_wifi_check.elapsed() >= WIFI_CHECK_INTERVAL {
            last_wifi_check = Instant::now();
            if let Err(e) = wifi.ensure_connected() {
                log::warn!("WiFi reconnect failed: {:?}", e);
            }
        }
    }
}

fn ota_window_open(ota: &Mutex<OtaWindow>, boot: Instant) -> bool {
    let now_ms = boot.elapsed().as_millis() as u64;
    ota.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_open(now_ms)
}

fn publish(mqtt: &MqttClient, report: &StatusReport) -> bool {
    match mqtt.publish_status(&report.to_json()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Status publish failed: {:?}", e);
            false
        }
    }
}
