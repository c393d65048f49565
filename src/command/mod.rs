pub mod handler;
pub mod parser;

pub use handler::{CommandHandler, CommandOutcome};
pub use parser::CommandParser;

use crate::settings::DisplayMode;

/// Longest accepted blink half-cycle
pub const MAX_BLINK_INTERVAL_MS: u32 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockCommand {
    Status,
    Blink(bool),
    BlinkInterval(u32),
    Sweep(bool),
    Mode(DisplayMode),
    /// Re-open the OTA update window
    Ota,
    Save,
    Defaults,
    Restart,
    Empty,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Rejected(String),
    StorageUnavailable,
    StorageFailed(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CommandError::Rejected(reason) => write!(f, "Rejected: {}", reason),
            CommandError::StorageUnavailable => write!(f, "No settings storage"),
            CommandError::StorageFailed(e) => write!(f, "Saving settings failed: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}
