//! Ephemeral KWin scripts: generation, lifecycle and output capture

pub mod bridge;
pub mod command;
pub mod journal;
pub mod runner;

pub use bridge::{CaptureWindow, ScriptBridge, ScriptExecutor};
pub use command::ScriptCommand;
pub use journal::{JournalReader, LogSource};
pub use runner::{ScriptFile, ScriptRunner};
