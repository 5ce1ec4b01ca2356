//! Lifecycle of one ephemeral KWin script
//!
//! materialize → register → run → stop → cleanup. Registration numbers are
//! owned by KWin; register acquires one and stop releases it.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::backend::ScriptingBus;
use crate::error::{BridgeError, Result};

/// KWin reads the file from its own process
const SCRIPT_FILE_MODE: u32 = 0o644;

/// A scriptlet written to a scratch file
///
/// Dropping it removes the file too; [`ScriptRunner::cleanup`] does the same
/// but logs a failed removal.
#[derive(Debug)]
pub struct ScriptFile {
    file: NamedTempFile,
}

impl ScriptFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub struct ScriptRunner {
    bus: Arc<dyn ScriptingBus>,
    temp_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(bus: Arc<dyn ScriptingBus>, temp_dir: Option<PathBuf>) -> Self {
        Self {
            bus,
            temp_dir: temp_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Write `text` to a uniquely named file KWin can read
    pub fn materialize(&self, text: &str) -> Result<ScriptFile> {
        let mut file = tempfile::Builder::new()
            .prefix("kwin_script_")
            .suffix(".js")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| BridgeError::io(format!("creating script file in {}", self.temp_dir.display()), e))?;

        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| BridgeError::io("writing script file", e))?;

        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(SCRIPT_FILE_MODE))
            .map_err(|e| BridgeError::io("setting script file permissions", e))?;

        tracing::debug!("Materialized script at {}", file.path().display());
        Ok(ScriptFile { file })
    }

    /// Load the file into KWin's script engine
    pub async fn register(&self, script: &ScriptFile) -> Result<i32> {
        let registration = self.bus.load_script(script.path()).await?;
        tracing::debug!("Registered {} as script {}", script.path().display(), registration);
        Ok(registration)
    }

    pub async fn run(&self, registration: i32) -> Result<()> {
        tracing::debug!("Running script {}", registration);
        self.bus.run_script(registration).await
    }

    /// Halt and deregister; a second stop of the same number is just an error from KWin
    pub async fn stop(&self, registration: i32) -> Result<()> {
        tracing::debug!("Stopping script {}", registration);
        self.bus.stop_script(registration).await
    }

    /// Remove the scratch file, logging rather than returning a failure
    pub fn cleanup(&self, script: ScriptFile) {
        let path = script.path().to_path_buf();
        if let Err(e) = script.file.close() {
            tracing::warn!("Failed to remove script file {}: {}", path.display(), e);
        }
    }
}
