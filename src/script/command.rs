//! Scriptlet generation
//!
//! Every scriptlet is a fixed template wrapped in an immediately invoked
//! function so nothing leaks into KWin's long-lived script engine. Values are
//! substituted as JSON literals, which the engine reads as plain JavaScript
//! literals: window and desktop ids are typed [`Uuid`]s and the one free-text
//! value (a screen name) is string-escaped, so no input can terminate a
//! literal early.
//!
//! Query scriptlets print one `JSON.stringify`'d object per record. The keys
//! must match the serde names in [`crate::core::model`].

use serde_json::Value;
use uuid::Uuid;

/// Locates a window by its brace-less internal id
const FIND_WINDOW: &str = r#"
    function findWindow(windowId) {
        for (const window of workspace.windowList()) {
            if (window.internalId.toString().replace(/[{}]/g, "") === windowId) {
                return window;
            }
        }
        return undefined;
    }
"#;

/// One scriptlet KWin can be asked to run
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand<'a> {
    QueryScreens,
    QueryDesktops,
    QueryWindows,
    MoveToDesktops {
        window: Uuid,
        desktops: &'a [Uuid],
    },
    MoveToScreen {
        window: Uuid,
        screen: &'a str,
    },
    Maximize {
        window: Uuid,
        horizontally: bool,
        vertically: bool,
    },
    Minimize {
        window: Uuid,
    },
    SetDemandsAttention {
        window: Uuid,
        demands_attention: bool,
    },
}

impl ScriptCommand<'_> {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ScriptCommand::QueryScreens => "query_screens",
            ScriptCommand::QueryDesktops => "query_desktops",
            ScriptCommand::QueryWindows => "query_windows",
            ScriptCommand::MoveToDesktops { .. } => "move_to_desktops",
            ScriptCommand::MoveToScreen { .. } => "move_to_screen",
            ScriptCommand::Maximize { .. } => "maximize",
            ScriptCommand::Minimize { .. } => "minimize",
            ScriptCommand::SetDemandsAttention { .. } => "set_demands_attention",
        }
    }

    /// Render the scriptlet source
    pub fn render(&self) -> String {
        match self {
            ScriptCommand::QueryScreens => wrap(
                r#"
    for (const screen of workspace.screens) {
        print(JSON.stringify({
            name: screen.name,
            manufacturer: screen.manufacturer,
            model: screen.model,
            serial: screen.serialNumber,
            pixelRatio: screen.devicePixelRatio,
            geometry: {
                topLeft: { x: screen.geometry.left, y: screen.geometry.top },
                bottomRight: { x: screen.geometry.right, y: screen.geometry.bottom }
            }
        }));
    }
"#,
            ),
            ScriptCommand::QueryDesktops => wrap(
                r#"
    for (var i = 0; i < workspace.desktops.length; i++) {
        const desktop = workspace.desktops[i];
        print(JSON.stringify({
            id: desktop.id,
            index: i,
            name: desktop.name,
            x11Number: desktop.x11DesktopNumber
        }));
    }
"#,
            ),
            ScriptCommand::QueryWindows => wrap(
                r#"
    for (const window of workspace.windowList()) {
        if (window.specialWindow) {
            continue;
        }
        const desktopIds = [];
        for (var i = 0; i < window.desktops.length; i++) {
            desktopIds.push(window.desktops[i].id);
        }
        print(JSON.stringify({
            id: window.internalId.toString().replace(/[{}]/g, ""),
            caption: window.caption,
            pid: window.pid,
            x: window.x,
            y: window.y,
            width: window.width,
            height: window.height,
            fullScreen: window.fullScreen,
            onAllDesktops: window.onAllDesktops,
            keepAbove: window.keepAbove,
            keepBelow: window.keepBelow,
            minimized: window.minimized,
            demandsAttention: window.demandsAttention,
            desktopIds: desktopIds
        }));
    }
"#,
            ),
            ScriptCommand::MoveToDesktops { window, desktops } => wrap(&format!(
                r#"{find}
    const windowId = {window};
    const targetDesktopIds = {desktops};
    const targets = [];
    for (const desktop of workspace.desktops) {{
        if (targetDesktopIds.includes(desktop.id)) {{
            targets.push(desktop);
        }}
    }}
    const window = findWindow(windowId);
    if (targets.length > 0 && window && window.moveable) {{
        window.desktops = targets;
    }}
"#,
                find = FIND_WINDOW,
                window = js_id(window),
                desktops = js_id_list(desktops),
            )),
            ScriptCommand::MoveToScreen { window, screen } => wrap(&format!(
                r#"{find}
    const windowId = {window};
    const targetScreenName = {screen};
    var target = undefined;
    for (const screen of workspace.screens) {{
        if (screen.name === targetScreenName) {{
            target = screen;
            break;
        }}
    }}
    const window = findWindow(windowId);
    if (target && window && window.moveable) {{
        workspace.sendClientToScreen(window, target);
    }}
"#,
                find = FIND_WINDOW,
                window = js_id(window),
                screen = js_string(screen),
            )),
            ScriptCommand::Maximize {
                window,
                horizontally,
                vertically,
            } => wrap(&format!(
                r#"{find}
    const window = findWindow({window});
    if (window) {{
        window.setMaximize({vertically}, {horizontally});
    }}
"#,
                find = FIND_WINDOW,
                window = js_id(window),
            )),
            ScriptCommand::Minimize { window } => wrap(&format!(
                r#"{find}
    const window = findWindow({window});
    if (window) {{
        window.minimized = true;
    }}
"#,
                find = FIND_WINDOW,
                window = js_id(window),
            )),
            ScriptCommand::SetDemandsAttention {
                window,
                demands_attention,
            } => wrap(&format!(
                r#"{find}
    const window = findWindow({window});
    if (window) {{
        window.demandsAttention = {demands_attention};
    }}
"#,
                find = FIND_WINDOW,
                window = js_id(window),
            )),
        }
    }
}

fn wrap(body: &str) -> String {
    format!("(function() {{{}}})();\n", body)
}

/// A string as a double-quoted, escaped literal
pub(crate) fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn js_id(id: &Uuid) -> String {
    js_string(&id.to_string())
}

fn js_id_list(ids: &[Uuid]) -> String {
    Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect()).to_string()
}
