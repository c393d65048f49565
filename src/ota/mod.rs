//! Lifetime of the OTA update listener.
//!
//! At boot the listener is advertised for `ota_boot_window_ms` so update
//! tooling can discover the board, then keeps accepting uploads for
//! `ota_update_window_ms` more. A runtime `ota` command re-opens an update
//! window starting from the moment it is received.

#[cfg(target_os = "espidf")]
pub mod server;

use serde::Serialize;

use crate::settings::BootSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtaPhase {
    Disabled,
    /// Boot window: the board must stay visible to update tooling
    Advertising,
    AcceptingUploads,
    Closed,
}

impl OtaPhase {
    pub fn is_open(self) -> bool {
        matches!(self, OtaPhase::Advertising | OtaPhase::AcceptingUploads)
    }
}

/// Times are milliseconds since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtaWindow {
    enabled: bool,
    opened_at_ms: u64,
    advertise_until_ms: u64,
    closes_at_ms: u64,
    update_window_ms: u32,
}

impl OtaWindow {
    pub fn at_boot(settings: &BootSettings) -> Self {
        let boot = u64::from(settings.ota_boot_window_ms);
        Self {
            enabled: settings.ota_enabled_at_boot,
            opened_at_ms: 0,
            advertise_until_ms: boot,
            closes_at_ms: boot + u64::from(settings.ota_update_window_ms),
            update_window_ms: settings.ota_update_window_ms,
        }
    }

    pub fn phase(&self, now_ms: u64) -> OtaPhase {
        if !self.enabled {
            OtaPhase::Disabled
        } else if now_ms < self.advertise_until_ms {
            OtaPhase::Advertising
        } else if now_ms < self.closes_at_ms {
            OtaPhase::AcceptingUploads
        } else {
            OtaPhase::Closed
        }
    }

    pub fn is_open(&self, now_ms: u64) -> bool {
        self.phase(now_ms).is_open()
    }

    /// Opens a fresh update window starting at `now_ms`.
    pub fn rearm(&mut self, now_ms: u64) {
        self.enabled = true;
        self.opened_at_ms = now_ms;
        self.advertise_until_ms = now_ms;
        self.closes_at_ms = now_ms + u64::from(self.update_window_ms);
        log::info!(
            "OTA: Window re-armed for {} ms (closes at {} ms)",
            self.update_window_ms,
            self.closes_at_ms
        );
    }

    /// Milliseconds until the window closes, if it is open
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.is_open(now_ms).then(|| self.closes_at_ms.saturating_sub(now_ms))
    }

    pub fn opened_at_ms(&self) -> u64 {
        self.opened_at_ms
    }
}
