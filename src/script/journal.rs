//! Recovery of script print output from the systemd journal
//!
//! KWin only surfaces `print()` output through its log. Lines are selected by
//! the script engine's Qt logging categories and a `--since`/`--until`
//! window. The journal may flush lines late, so entries logged right at the
//! window edges can be missed or picked up; no slack is added.
//!
//! Requires `QT_LOGGING_RULES="kwin_*.debug=true"` in KWin's environment.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::process::Command as AsyncCommand;

use crate::error::{BridgeError, Result};

/// journalctl's `--since`/`--until` input form, microsecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Ordered log lines emitted in a time window
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self, from: DateTime<Local>, to: DateTime<Local>) -> Result<Vec<String>>;
}

/// Queries `journalctl -o cat` filtered by Qt category
pub struct JournalReader {
    program: PathBuf,
    categories: Vec<String>,
}

impl JournalReader {
    pub fn new(program: impl Into<PathBuf>, categories: Vec<String>) -> Self {
        Self {
            program: program.into(),
            categories,
        }
    }

    fn args(&self, from: &DateTime<Local>, to: &DateTime<Local>) -> Vec<String> {
        let mut args: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("QT_CATEGORY={}", c))
            .collect();
        args.extend([
            "-o".to_string(),
            "cat".to_string(),
            "--since".to_string(),
            format_timestamp(from),
            "--until".to_string(),
            format_timestamp(to),
            "--no-pager".to_string(),
            "--quiet".to_string(),
        ]);
        args
    }
}

#[async_trait]
impl LogSource for JournalReader {
    async fn fetch(&self, from: DateTime<Local>, to: DateTime<Local>) -> Result<Vec<String>> {
        let output = AsyncCommand::new(&self.program)
            .args(self.args(&from, &to))
            .output()
            .await
            .map_err(|e| BridgeError::io(format!("starting {}", self.program.display()), e))?;

        if !output.status.success() {
            return Err(BridgeError::io(
                "querying the journal",
                std::io::Error::other(format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
            ));
        }

        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        tracing::debug!("Journal returned {} lines", lines.len());
        Ok(lines)
    }
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
