//! Bridge configuration
//!
//! Defaults match a stock Plasma 6 session. Values can be overridden by a TOML
//! file (`$XDG_CONFIG_HOME/kwin-bridge/config.toml`, or the path in
//! `KWIN_BRIDGE_CONFIG`) and then by `KWIN_BRIDGE_*` environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// How scripting calls reach KWin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Session bus connection through zbus
    Zbus,
    /// Spawn `dbus-send --print-reply` per call
    DbusSend,
}

impl std::str::FromStr for Transport {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zbus" => Ok(Transport::Zbus),
            "dbus-send" => Ok(Transport::DbusSend),
            other => Err(BridgeError::Config {
                message: format!("unknown transport '{}', expected zbus or dbus-send", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// D-Bus service name of the compositor
    pub service: String,
    /// Object path of the scripting manager
    pub scripting_path: String,
    /// Object path prefix of a loaded script; the registration number is appended
    pub script_path_prefix: String,
    pub transport: Transport,
    pub dbus_send: PathBuf,
    pub journalctl: PathBuf,
    /// QT_CATEGORY values the script engine logs under
    pub journal_categories: Vec<String>,
    /// Prefix the engine's `print()` puts in front of every line
    pub print_prefix: String,
    pub proc_root: PathBuf,
    /// Directory for scratch script files; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    /// Bracket each scriptlet with unique marker lines and keep only what lies between
    pub correlation_markers: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service: "org.kde.KWin".to_string(),
            scripting_path: "/Scripting".to_string(),
            script_path_prefix: "/Scripting/Script".to_string(),
            transport: Transport::Zbus,
            dbus_send: PathBuf::from("/usr/bin/dbus-send"),
            journalctl: PathBuf::from("/usr/bin/journalctl"),
            journal_categories: vec!["js".to_string(), "kwin_scripting".to_string()],
            print_prefix: "js: ".to_string(),
            proc_root: PathBuf::from("/proc"),
            temp_dir: None,
            correlation_markers: false,
        }
    }
}

impl BridgeConfig {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("KWIN_BRIDGE_CONFIG")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("kwin-bridge").join("config.toml")));

        let mut config = match path {
            Some(ref p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BridgeError::Config {
            message: e.to_string(),
        })
    }

    /// Apply `KWIN_BRIDGE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KWIN_BRIDGE_SERVICE") {
            self.service = v;
        }
        if let Some(v) = lookup("KWIN_BRIDGE_TRANSPORT") {
            self.transport = v.parse()?;
        }
        if let Some(v) = lookup("KWIN_BRIDGE_DBUS_SEND") {
            self.dbus_send = PathBuf::from(v);
        }
        if let Some(v) = lookup("KWIN_BRIDGE_JOURNALCTL") {
            self.journalctl = PathBuf::from(v);
        }
        if let Some(v) = lookup("KWIN_BRIDGE_TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("KWIN_BRIDGE_CORRELATION_MARKERS") {
            self.correlation_markers = match v.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(BridgeError::Config {
                        message: format!("KWIN_BRIDGE_CORRELATION_MARKERS: bad value '{}'", other),
                    });
                }
            };
        }
        Ok(())
    }

    /// Object path of script number `registration`
    pub fn script_path(&self, registration: i32) -> String {
        format!("{}{}", self.script_path_prefix, registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.service, "org.kde.KWin");
        assert_eq!(config.transport, Transport::Zbus);
        assert_eq!(config.journal_categories, vec!["js", "kwin_scripting"]);
        assert_eq!(config.script_path(7), "/Scripting/Script7");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml(
            r#"
            transport = "dbus-send"
            correlation_markers = true
            "#,
        )
        .unwrap();
        assert_eq!(config.transport, Transport::DbusSend);
        assert!(config.correlation_markers);
        assert_eq!(config.print_prefix, "js: ");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = BridgeConfig::from_toml("transport = 3").unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KWIN_BRIDGE_TRANSPORT", "dbus-send"),
            ("KWIN_BRIDGE_JOURNALCTL", "/opt/bin/journalctl"),
            ("KWIN_BRIDGE_CORRELATION_MARKERS", "yes"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.transport, Transport::DbusSend);
        assert_eq!(config.journalctl, PathBuf::from("/opt/bin/journalctl"));
        assert!(config.correlation_markers);
    }

    #[test]
    fn test_bad_transport_override() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "KWIN_BRIDGE_TRANSPORT").then(|| "carrier-pigeon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
