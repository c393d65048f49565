use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use super::SettingsStore;

const NAMESPACE: &str = "aclock";
const KEY: &str = "boot";
const MAX_BLOB: usize = 1024;

pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsStore {
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)?;
        Ok(Self { nvs })
    }
}

impl SettingsStore for NvsStore {
    fn read(&mut self) -> Result<Option<String>> {
        let mut buf = [0u8; MAX_BLOB];
        Ok(self.nvs.get_str(KEY, &mut buf)?.map(|s| s.to_string()))
    }

    fn write(&mut self, json: &str) -> Result<()> {
        if json.len() >= MAX_BLOB {
            anyhow::bail!("settings blob too large ({} bytes)", json.len());
        }
        self.nvs.set_str(KEY, json)?;
        Ok(())
    }
}
