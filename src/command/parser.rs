use super::{ClockCommand, MAX_BLINK_INTERVAL_MS};
use crate::settings::DisplayMode;

pub struct CommandParser;

impl CommandParser {
    pub fn available_commands() -> &'static [&'static str] {
        &[
            "status", "blink", "interval", "sweep", "mode", "ota", "save", "defaults", "restart",
        ]
    }

    /// Parses a command payload. Keywords are case-insensitive.
    pub fn parse_command(input: &str) -> ClockCommand {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ClockCommand::Empty;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next();

        match cmd.as_str() {
            "status" => ClockCommand::Status,
            "blink" => match arg.and_then(parse_switch) {
                Some(on) => ClockCommand::Blink(on),
                None => ClockCommand::Unknown("blink: expected on|off".to_string()),
            },
            "sweep" => match arg.and_then(parse_switch) {
                Some(on) => ClockCommand::Sweep(on),
                None => ClockCommand::Unknown("sweep: expected on|off".to_string()),
            },
            "interval" => match arg.map(str::parse::<u32>) {
                Some(Ok(ms)) if (1..=MAX_BLINK_INTERVAL_MS).contains(&ms) => {
                    ClockCommand::BlinkInterval(ms)
                }
                Some(_) => ClockCommand::Unknown(format!(
                    "interval: must be 1-{} ms",
                    MAX_BLINK_INTERVAL_MS
                )),
                None => ClockCommand::Unknown("interval: milliseconds required".to_string()),
            },
            "mode" => match arg.map(str::parse::<u8>) {
                Some(Ok(mode)) => match DisplayMode::new(mode) {
                    Ok(mode) => ClockCommand::Mode(mode),
                    Err(_) => ClockCommand::Unknown(format!(
                        "mode: must be 0-{}",
                        DisplayMode::MAX
                    )),
                },
                Some(Err(_)) => ClockCommand::Unknown("mode: invalid number".to_string()),
                None => ClockCommand::Unknown("mode: number required".to_string()),
            },
            "ota" => ClockCommand::Ota,
            "save" => ClockCommand::Save,
            "defaults" => ClockCommand::Defaults,
            "restart" | "reboot" => ClockCommand::Restart,
            _ => ClockCommand::Unknown(format!("unknown command: '{}'", cmd)),
        }
    }
}

fn parse_switch(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}
