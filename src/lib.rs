//! kwin-bridge - scripting bridge for the KWin compositor
//!
//! KWin has no query API for its screens, desktops and windows beyond its
//! embedded script engine. This library turns one-shot KWin scripts into
//! synchronous calls:
//!
//! - write the scriptlet to a scratch file and register it over D-Bus
//! - run it, stop it, and read its `print()` output back from the journal
//! - decode each printed JSON line into [`crate::core::Screen`], [`crate::core::Desktop`]
//!   or [`crate::core::Window`]
//!
//! [`crate::client::KWinClient`] builds an [`crate::core::Environment`] snapshot and issues
//! window mutations on top of that round trip. The binary exposes the same
//! operations as MCP tools.
//!
//! ## Requirements
//!
//! - KDE Plasma 6 (KWin with the `org.kde.kwin.Scripting` interface)
//! - systemd journal, with `QT_LOGGING_RULES="kwin_*.debug=true"` set for KWin
//! - one script in flight per process

pub mod backend;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod script;
pub mod server;

pub use client::KWinClient;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
