use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::{ClockCommand, CommandError, CommandParser};
use crate::ota::OtaWindow;
use crate::settings::SettingsHandle;
use crate::status::{SharedData, StatusReport};
use crate::storage::{save_settings, SettingsStore};

/// What the caller still has to do after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Reply(StatusReport),
    /// Publish the report, then restart the device
    Restart(StatusReport),
    Nothing,
}

pub struct CommandHandler {
    /// Shared with the OTA listener so both read the same uptime
    boot: Instant,
    settings: Arc<SettingsHandle>,
    ota: Arc<Mutex<OtaWindow>>,
    store: Option<Box<dyn SettingsStore>>,
    shared: Option<SharedData>,
    command_topic: String,
    shared_topic: String,
}

impl CommandHandler {
    pub fn new(settings: Arc<SettingsHandle>, ota: Arc<Mutex<OtaWindow>>) -> Self {
        let snapshot = settings.snapshot();
        Self {
            boot: Instant::now(),
            settings,
            ota,
            store: None,
            shared: None,
            command_topic: snapshot.mqtt_topic_subscribe_primary,
            shared_topic: snapshot.mqtt_topic_subscribe_secondary,
        }
    }

    /// Measure uptime from the firmware's boot instant
    pub fn with_boot(mut self, boot: Instant) -> Self {
        self.boot = boot;
        self
    }

    pub fn with_store(mut self, store: Box<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn uptime_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    /// Routes an inbound MQTT message by topic.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> CommandOutcome {
        let text = String::from_utf8_lossy(payload);

        if topic == self.command_topic {
            log::info!("Command: '{}'", text.trim());
            let command = CommandParser::parse_command(&text);
            self.execute(command)
        } else if topic == self.shared_topic {
            log::debug!("Shared data on '{}': {}", topic, text);
            self.shared = Some(SharedData {
                topic: topic.to_string(),
                payload: text.into_owned(),
            });
            CommandOutcome::Nothing
        } else {
            log::debug!("Ignoring message on '{}'", topic);
            CommandOutcome::Nothing
        }
    }

    pub fn execute(&mut self, command: ClockCommand) -> CommandOutcome {
        let now_ms = self.uptime_ms();
        self.execute_at(command, now_ms)
    }

    /// Runs `command` as if it arrived `now_ms` after boot.
    pub fn execute_at(&mut self, command: ClockCommand, now_ms: u64) -> CommandOutcome {
        let restart = command == ClockCommand::Restart;
        let result = match self.apply(command, now_ms) {
            Ok(Some(result)) => result,
            Ok(None) => return CommandOutcome::Nothing,
            Err(e) => {
                log::warn!("Command failed: {}", e);
                e.to_string()
            }
        };

        let report = self.status_at(now_ms).with_result(result.as_str());
        if restart {
            CommandOutcome::Restart(report)
        } else {
            CommandOutcome::Reply(report)
        }
    }

    fn apply(
        &mut self,
        command: ClockCommand,
        now_ms: u64,
    ) -> Result<Option<String>, CommandError> {
        let result = match command {
            ClockCommand::Empty => return Ok(None),
            ClockCommand::Status => "status".to_string(),
            ClockCommand::Blink(on) => {
                self.settings.set_blink(on);
                format!("blink {}", if on { "on" } else { "off" })
            }
            ClockCommand::BlinkInterval(ms) => {
                self.settings.set_blink_interval(ms);
                format!("interval {}", ms)
            }
            ClockCommand::Sweep(on) => {
                self.settings.set_sweep(on);
                format!("sweep {}", if on { "on" } else { "off" })
            }
            ClockCommand::Mode(mode) => {
                self.settings.set_display_mode(mode);
                format!("mode {}", mode.get())
            }
            ClockCommand::Ota => {
                self.ota
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .rearm(now_ms);
                "ota armed".to_string()
            }
            ClockCommand::Save => {
                let store = self
                    .store
                    .as_mut()
                    .ok_or(CommandError::StorageUnavailable)?;
                save_settings(&mut **store, &self.settings.snapshot())
                    .map_err(|e| CommandError::StorageFailed(format!("{:?}", e)))?;
                "saved".to_string()
            }
            ClockCommand::Defaults => {
                self.settings.reset_options();
                "defaults restored".to_string()
            }
            ClockCommand::Restart => {
                log::info!("Command: Restart requested");
                "restarting".to_string()
            }
            ClockCommand::Unknown(reason) => return Err(CommandError::Rejected(reason)),
        };
        Ok(Some(result))
    }

    pub fn status(&self) -> StatusReport {
        self.status_at(self.uptime_ms())
    }

    fn status_at(&self, now_ms: u64) -> StatusReport {
        let phase = self
            .ota
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase(now_ms);
        StatusReport::new(&self.settings.snapshot(), phase, now_ms / 1000)
            .with_shared(self.shared.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ota::OtaPhase;
    use crate::settings::BootSettings;
    use crate::storage::{load_settings, MemoryStore};

    fn handler() -> (CommandHandler, Arc<SettingsHandle>, Arc<Mutex<OtaWindow>>) {
        let settings = BootSettings::default();
        let ota = Arc::new(Mutex::new(OtaWindow::at_boot(&settings)));
        let handle = SettingsHandle::new(settings);
        let handler = CommandHandler::new(Arc::clone(&handle), Arc::clone(&ota));
        (handler, handle, ota)
    }

    fn reply(outcome: CommandOutcome) -> StatusReport {
        match outcome {
            CommandOutcome::Reply(report) => report,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn commands_on_primary_topic_change_settings() {
        let (mut handler, settings, _) = handler();

        let report = reply(handler.handle_message("cmnd/aclock", b"blink off"));
        assert!(!report.blink);
        assert_eq!(report.result.as_deref(), Some("blink off"));

        handler.handle_message("cmnd/aclock", b"interval 250");
        handler.handle_message("cmnd/aclock", b"sweep off");
        handler.handle_message("cmnd/aclock", b"mode 3");

        let current = settings.snapshot();
        assert!(!current.blink_current_minute);
        assert_eq!(current.blink_interval_ms, 250);
        assert!(!current.sweep_minutes);
        assert_eq!(current.display_mode.get(), 3);
    }

    #[test]
    fn rejected_command_leaves_settings_alone() {
        let (mut handler, settings, _) = handler();

        let report = reply(handler.handle_message("cmnd/aclock", b"mode 9"));
        assert_eq!(report.result.as_deref(), Some("Rejected: mode: must be 0-4"));
        assert_eq!(settings.snapshot(), BootSettings::default());
    }

    #[test]
    fn secondary_topic_is_recorded_as_shared_data() {
        let (mut handler, _, _) = handler();

        assert_eq!(
            handler.handle_message("stat/tm1638", b"12:34"),
            CommandOutcome::Nothing
        );
        let shared = handler.status().shared.unwrap();
        assert_eq!(shared.topic, "stat/tm1638");
        assert_eq!(shared.payload, "12:34");

        assert_eq!(
            handler.handle_message("some/other", b"x"),
            CommandOutcome::Nothing
        );
    }

    #[test]
    fn ota_command_reopens_window() {
        let (mut handler, _, ota) = handler();
        let late = 120_000;
        assert_eq!(ota.lock().unwrap().phase(late), OtaPhase::Closed);

        let report = reply(handler.execute_at(ClockCommand::Ota, late));
        assert_eq!(report.ota, OtaPhase::AcceptingUploads);
        assert!(ota.lock().unwrap().is_open(late + 19_999));
        assert!(!ota.lock().unwrap().is_open(late + 20_000));
    }

    #[test]
    fn ota_rearm_uses_boot_clock() {
        let settings = BootSettings {
            ota_update_window_ms: 200,
            ..Default::default()
        };
        let ota = Arc::new(Mutex::new(OtaWindow::at_boot(&settings)));
        let boot = Instant::now()
            .checked_sub(std::time::Duration::from_secs(5))
            .unwrap();
        let mut handler = CommandHandler::new(SettingsHandle::new(settings), Arc::clone(&ota))
            .with_boot(boot);
        assert!(handler.uptime_ms() >= 5000);

        let report = reply(handler.execute(ClockCommand::Ota));
        assert_eq!(report.ota, OtaPhase::AcceptingUploads);

        // The main loop and the listener measure from the same boot instant
        let now_ms = boot.elapsed().as_millis() as u64;
        assert!(ota.lock().unwrap().is_open(now_ms));
    }

    #[test]
    fn save_needs_a_store() {
        let (mut handler, _, _) = handler();
        let report = reply(handler.execute_at(ClockCommand::Save, 0));
        assert_eq!(report.result.as_deref(), Some("No settings storage"));
    }

    #[test]
    fn save_persists_current_settings() {
        let (handler, settings, _) = handler();
        let mut handler = handler.with_store(Box::new(MemoryStore::new()));

        handler.execute_at(ClockCommand::Blink(false), 0);
        let report = reply(handler.execute_at(ClockCommand::Save, 0));
        assert_eq!(report.result.as_deref(), Some("saved"));

        let mut store = handler.store.take().unwrap();
        let saved = load_settings(store.as_mut());
        assert_eq!(saved, settings.snapshot());
        assert!(!saved.blink_current_minute);
    }

    #[test]
    fn defaults_and_restart() {
        let (mut handler, settings, _) = handler();
        handler.execute_at(ClockCommand::Sweep(false), 0);
        handler.execute_at(ClockCommand::Defaults, 0);
        assert!(settings.snapshot().sweep_minutes);

        assert!(matches!(
            handler.execute_at(ClockCommand::Restart, 0),
            CommandOutcome::Restart(_)
        ));
        assert_eq!(handler.execute_at(ClockCommand::Empty, 0), CommandOutcome::Nothing);
    }
}
