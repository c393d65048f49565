#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    analog_clock::firmware::run()
}

/// Host build: checks the compiled-in credentials against the boot
/// settings (defaults, or a JSON file given as first argument) and prints
/// what the device would bring up.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use analog_clock::{BootSettings, ConfigurationSet, Credentials, OtaWindow};

    let settings = match std::env::args().nth(1) {
        Some(path) => BootSettings::from_json(&std::fs::read_to_string(&path)?)?,
        None => BootSettings::default(),
    };

    let config = ConfigurationSet::load(Credentials::from_build_env()?, settings)?;
    let plan = config.network_plan()?;
    let snapshot = config.settings().snapshot();

    println!("Hostname:     {}", plan.hostname);
    match &plan.station {
        Some(station) => println!("Station:      join '{}'", station.ssid),
        None => println!("Station:      off"),
    }
    match &plan.access_point {
        Some(ap) => println!("Access point: '{}' on {}", ap.ssid, ap.address),
        None => println!("Access point: off"),
    }
    match config.mqtt_plan() {
        Some(mqtt) => println!(
            "MQTT:         {} as '{}', sub {:?}, pub '{}'",
            mqtt.broker_url,
            mqtt.client_id,
            mqtt.subscriptions(),
            mqtt.publish
        ),
        None => println!("MQTT:         off"),
    }

    let ota = OtaWindow::at_boot(&snapshot);
    println!(
        "OTA:          '{}' {:?} at boot, open for {:?} ms",
        snapshot.ota_hostname,
        ota.phase(0),
        ota.remaining_ms(0)
    );
    Ok(())
}
