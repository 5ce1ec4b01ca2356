//! zbus transport for KDE Plasma
//!
//! Talks to KWin's scripting manager over the session bus. Scripts are
//! addressed by the object path KWin creates for each registration number.

use async_trait::async_trait;
use std::path::Path;
use zbus::Connection;
use zbus::zvariant::ObjectPath;

use super::{SCRIPT_INTERFACE, SCRIPTING_INTERFACE, ScriptingBus, check_registration, path_arg};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// KWin scripting over a session-bus connection
pub struct KWinBus {
    /// D-Bus connection
    dbus: Connection,
    service: String,
    scripting_path: String,
    script_path_prefix: String,
}

impl KWinBus {
    /// Connect to the session bus
    pub async fn new(config: &BridgeConfig) -> Result<Self> {
        let dbus = Connection::session().await.map_err(|e| BridgeError::Ipc {
            method: "session bus connect".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            dbus,
            service: config.service.clone(),
            scripting_path: config.scripting_path.clone(),
            script_path_prefix: config.script_path_prefix.clone(),
        })
    }

    async fn call_script(&self, registration: i32, method: &str) -> Result<()> {
        let path = format!("{}{}", self.script_path_prefix, registration);
        let ipc_error = |message: String| BridgeError::Ipc {
            method: format!("{}.{} on {}", SCRIPT_INTERFACE, method, path),
            message,
        };

        let object_path = ObjectPath::try_from(path.as_str()).map_err(|e| ipc_error(e.to_string()))?;

        self.dbus
            .call_method(
                Some(self.service.as_str()),
                object_path,
                Some(SCRIPT_INTERFACE),
                method,
                &(),
            )
            .await
            .map_err(|e| ipc_error(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ScriptingBus for KWinBus {
    async fn load_script(&self, path: &Path) -> Result<i32> {
        let script_path = path_arg(path)?;
        let ipc_error = |message: String| BridgeError::Ipc {
            method: format!("{}.loadScript", SCRIPTING_INTERFACE),
            message,
        };

        let reply = self
            .dbus
            .call_method(
                Some(self.service.as_str()),
                self.scripting_path.as_str(),
                Some(SCRIPTING_INTERFACE),
                "loadScript",
                &(script_path,),
            )
            .await
            .map_err(|e| ipc_error(e.to_string()))?;

        let registration: i32 = reply.body().deserialize().map_err(|e| {
            BridgeError::protocol(format!("loadScript reply is not an int32: {}", e))
        })?;

        check_registration(registration)
    }

    async fn run_script(&self, registration: i32) -> Result<()> {
        self.call_script(registration, "run").await
    }

    async fn stop_script(&self, registration: i32) -> Result<()> {
        self.call_script(registration, "stop").await
    }
}
