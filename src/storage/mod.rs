//! Persistence of the boot settings as JSON.

#[cfg(target_os = "espidf")]
pub mod nvs;

use anyhow::Result;

use crate::settings::BootSettings;

/// Raw blob storage for the serialized settings.
pub trait SettingsStore: Send {
    fn read(&mut self) -> Result<Option<String>>;
    fn write(&mut self, json: &str) -> Result<()>;
}

/// Stored settings, or the defaults when nothing usable is stored.
pub fn load_settings(store: &mut dyn SettingsStore) -> BootSettings {
    match store.read() {
        Ok(Some(json)) => match BootSettings::from_json(&json) {
            Ok(settings) => {
                log::info!("Storage: Loaded saved settings");
                settings
            }
            Err(e) => {
                log::warn!("Storage: {}, using defaults", e);
                BootSettings::default()
            }
        },
        Ok(None) => {
            log::info!("Storage: No saved settings, using defaults");
            BootSettings::default()
        }
        Err(e) => {
            log::warn!("Storage: Read failed ({:?}), using defaults", e);
            BootSettings::default()
        }
    }
}

pub fn save_settings(store: &mut dyn SettingsStore, settings: &BootSettings) -> Result<()> {
    let json = settings.to_json()?;
    store.write(&json)?;
    log::info!("Storage: Settings saved ({} bytes)", json.len());
    Ok(())
}

/// Keeps the blob in RAM; settings are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(json: &str) -> Self {
        Self {
            blob: Some(json.to_string()),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn read(&mut self) -> Result<Option<String>> {
        Ok(self.blob.clone())
    }

    fn write(&mut self, json: &str) -> Result<()> {
        self.blob = Some(json.to_string());
        Ok(())
    }
}
