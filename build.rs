fn main() {
    // Credentials can be baked in at compile time, see `Credentials::from_build_env`
    for var in [
        "ACLOCK_WIFI_SSID",
        "ACLOCK_WIFI_PASSWORD",
        "ACLOCK_MQTT_USERNAME",
        "ACLOCK_MQTT_PASSWORD",
        "ACLOCK_MQTT_SERVER",
        "ACLOCK_MQTT_PORT",
        "ACLOCK_AP_SSID",
        "ACLOCK_AP_PASSWORD",
    ] {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    // Host builds (unit tests) have no ESP-IDF environment to forward
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
