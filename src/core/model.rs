//! Compositor entities decoded from scriptlet output
//!
//! Serde field names are the wire contract with the query scriptlets in
//! [`crate::script::command`]; renaming a field here breaks parsing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Screen area; `top_left <= bottom_right` is what KWin reports but is not checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub top_left: Point,
    pub bottom_right: Point,
}

/// A physical output (KWin::Output)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub name: String,
    pub geometry: Rect,
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "serial")]
    pub serial_number: String,
    pub pixel_ratio: f64,
}

/// A virtual desktop (KWin::VirtualDesktop)
///
/// `Desktop::default()` is the zero value handed out for ids that do not
/// resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Desktop {
    pub id: Uuid,
    pub index: i32,
    pub name: String,
    pub x11_number: i32,
}

/// A client window (KWin::Window)
///
/// When `on_all_desktops` is set the contents of `desktop_ids` are whatever
/// KWin reports; they are not normalised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// KWin internal id with the braces stripped
    pub id: Uuid,
    pub caption: String,
    pub pid: u32,
    #[serde(rename = "cmdline", default)]
    pub command_line: String,
    #[serde(rename = "appname", default)]
    pub app_name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "fullScreen", alias = "fullscreen")]
    pub fullscreen: bool,
    pub on_all_desktops: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub minimized: bool,
    #[serde(default)]
    pub demands_attention: bool,
    #[serde(default)]
    pub desktop_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desktops: Vec<Desktop>,
}

impl Window {
    /// Map `desktop_ids` onto full records, in order
    ///
    /// Ids missing from `known` become `Desktop::default()`.
    pub fn resolve_desktops(&self, known: &HashMap<Uuid, Desktop>) -> Vec<Desktop> {
        self.desktop_ids
            .iter()
            .map(|id| known.get(id).cloned().unwrap_or_default())
            .collect()
    }
}

/// Point-in-time snapshot of everything KWin manages
#[derive(Debug, Clone, Default, Serialize)]
pub struct Environment {
    /// Keyed by screen name
    pub screens: HashMap<String, Screen>,
    pub desktops: HashMap<Uuid, Desktop>,
    pub windows: HashMap<Uuid, Window>,
}

impl Environment {
    /// Screens ordered left to right
    pub fn screens_left_to_right(&self) -> Vec<&Screen> {
        let mut screens: Vec<_> = self.screens.values().collect();
        screens.sort_by_key(|s| (s.geometry.top_left.x, s.geometry.top_left.y));
        screens
    }

    /// Desktops ordered by their X11 number
    pub fn desktops_in_order(&self) -> Vec<&Desktop> {
        let mut desktops: Vec<_> = self.desktops.values().collect();
        desktops.sort_by_key(|d| d.x11_number);
        desktops
    }

    pub fn window(&self, id: &Uuid) -> Option<&Window> {
        self.windows.get(id)
    }

    pub fn desktop(&self, id: &Uuid) -> Option<&Desktop> {
        self.desktops.get(id)
    }

    pub fn screen(&self, name: &str) -> Option<&Screen> {
        self.screens.get(name)
    }
}
