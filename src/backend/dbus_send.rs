//! dbus-send transport
//!
//! Each call spawns `dbus-send --print-reply`. The reply is text, so the
//! registration number has to be picked out of it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;

use super::{SCRIPT_INTERFACE, SCRIPTING_INTERFACE, ScriptingBus, check_registration, path_arg};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

pub struct DbusSendBus {
    program: PathBuf,
    service: String,
    scripting_path: String,
    script_path_prefix: String,
}

impl DbusSendBus {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            program: config.dbus_send.clone(),
            service: config.service.clone(),
            scripting_path: config.scripting_path.clone(),
            script_path_prefix: config.script_path_prefix.clone(),
        }
    }

    async fn call(&self, object_path: &str, method: &str, args: &[String]) -> Result<Vec<String>> {
        let output = AsyncCommand::new(&self.program)
            .arg("--print-reply")
            .arg(format!("--dest={}", self.service))
            .arg(object_path)
            .arg(method)
            .args(args)
            .output()
            .await
            .map_err(|e| BridgeError::io(format!("starting {}", self.program.display()), e))?;

        if !output.status.success() {
            return Err(BridgeError::Ipc {
                method: method.to_string(),
                message: format!(
                    "{} ({})",
                    String::from_utf8_lossy(&output.stderr).trim(),
                    output.status
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl ScriptingBus for DbusSendBus {
    async fn load_script(&self, path: &Path) -> Result<i32> {
        let arg = format!("string:{}", path_arg(path)?);
        let reply = self
            .call(
                &self.scripting_path,
                &format!("{}.loadScript", SCRIPTING_INTERFACE),
                &[arg],
            )
            .await?;
        check_registration(parse_registration_reply(&reply)?)
    }

    async fn run_script(&self, registration: i32) -> Result<()> {
        let path = format!("{}{}", self.script_path_prefix, registration);
        self.call(&path, &format!("{}.run", SCRIPT_INTERFACE), &[]).await?;
        Ok(())
    }

    async fn stop_script(&self, registration: i32) -> Result<()> {
        let path = format!("{}{}", self.script_path_prefix, registration);
        self.call(&path, &format!("{}.stop", SCRIPT_INTERFACE), &[]).await?;
        Ok(())
    }
}

/// Extract the registration number from a `--print-reply` load reply
///
/// Expected shape:
///
/// ```text
/// method return time=1697040000.123456 sender=:1.12 -> destination=:1.99 serial=42 reply_serial=2
///    int32 5
/// ```
pub fn parse_registration_reply<S: AsRef<str>>(lines: &[S]) -> Result<i32> {
    let [_, value_line] = lines else {
        return Err(BridgeError::protocol(format!(
            "loadScript reply has {} lines, expected 2",
            lines.len()
        )));
    };

    let fields: Vec<&str> = value_line.as_ref().split_whitespace().collect();
    let [_, number] = fields.as_slice() else {
        return Err(BridgeError::protocol(format!(
            "loadScript reply value {:?} does not have 2 fields",
            value_line.as_ref()
        )));
    };

    number.parse::<i32>().map_err(|e| {
        BridgeError::protocol(format!("registration number {:?}: {}", number, e))
    })
}
