//! Process command-line lookup through procfs

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{BridgeError, Result};

/// Source of process command lines, keyed by pid
#[async_trait]
pub trait ProcessTable: Send + Sync {
    /// Raw command line with argument separators turned into spaces
    async fn command_line(&self, pid: u32) -> Result<String>;
}

/// Reads `<root>/<pid>/cmdline`
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait]
impl ProcessTable for ProcFs {
    async fn command_line(&self, pid: u32) -> Result<String> {
        let path = self.root.join(pid.to_string()).join("cmdline");
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|e| BridgeError::io(format!("reading {}", path.display()), e))?;

        let text: String = String::from_utf8_lossy(&raw)
            .chars()
            .map(|c| if c == '\0' { ' ' } else { c })
            .collect();
        Ok(text.trim().to_string())
    }
}

/// Split a command line into the executable and its short application name
///
/// An empty command line yields two empty strings.
pub fn resolve_command(command_line: &str) -> (String, String) {
    let executable = command_line.split_whitespace().next().unwrap_or_default();
    let app_name = executable.rsplit('/').next().unwrap_or_default().trim();
    (executable.to_string(), app_name.to_string())
}
