//! Transports for KWin's scripting D-Bus interface
//!
//! Both transports speak to the same three calls: `loadScript` on the
//! scripting manager, then `run` and `stop` on the loaded script's object.

mod dbus_send;
mod kwin;

pub use dbus_send::{DbusSendBus, parse_registration_reply};
pub use kwin::KWinBus;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{BridgeConfig, Transport};
use crate::error::{BridgeError, Result};

pub(crate) const SCRIPTING_INTERFACE: &str = "org.kde.kwin.Scripting";
pub(crate) const SCRIPT_INTERFACE: &str = "org.kde.kwin.Script";

/// The compositor's script registry
///
/// Registration numbers are allocated by KWin and shared by every client of
/// the compositor. `load_script` acquires one and `stop_script` releases it.
/// Callers must not hold two loaded scripts from this process at once.
#[async_trait]
pub trait ScriptingBus: Send + Sync {
    /// Load a script file and return its registration number
    async fn load_script(&self, path: &Path) -> Result<i32>;

    async fn run_script(&self, registration: i32) -> Result<()>;

    /// Stop the script and free its registration number
    async fn stop_script(&self, registration: i32) -> Result<()>;
}

/// Create the transport selected in `config`
pub async fn create_bus(config: &BridgeConfig) -> Result<Arc<dyn ScriptingBus>> {
    match config.transport {
        Transport::Zbus => {
            tracing::info!("Using zbus transport (service={})", config.service);
            Ok(Arc::new(KWinBus::new(config).await?))
        }
        Transport::DbusSend => {
            tracing::info!("Using dbus-send transport ({})", config.dbus_send.display());
            Ok(Arc::new(DbusSendBus::new(config)))
        }
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        BridgeError::io(
            format!("passing {} to KWin", path.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidData, "path is not valid UTF-8"),
        )
    })
}

fn check_registration(registration: i32) -> Result<i32> {
    if registration < 0 {
        return Err(BridgeError::protocol(format!(
            "loadScript returned invalid registration number {}",
            registration
        )));
    }
    Ok(registration)
}
