//! Decoding of scriptlet print output into typed records

use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::model::{Desktop, Screen, Window};
use crate::error::{BridgeError, Result};

/// An entity a query scriptlet prints one JSON object per line for
pub trait Record: DeserializeOwned {
    const ENTITY: &'static str;
}

impl Record for Screen {
    const ENTITY: &'static str = "screen";
}

impl Record for Desktop {
    const ENTITY: &'static str = "desktop";
}

impl Record for Window {
    const ENTITY: &'static str = "window";
}

/// Strips the engine's print prefix and decodes the JSON remainder
#[derive(Debug, Clone)]
pub struct OutputParser {
    prefix: String,
}

impl OutputParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn parse_line<T: Record>(&self, line: &str) -> Result<T> {
        let body = line.strip_prefix(self.prefix.as_str()).ok_or_else(|| BridgeError::Parse {
            entity: T::ENTITY,
            message: format!("line is not script print output: {:?}", line),
        })?;

        serde_json::from_str(body).map_err(|e| BridgeError::Parse {
            entity: T::ENTITY,
            message: format!("{} in {:?}", e, body),
        })
    }

    /// Parse a whole collection; the first bad line fails all of it
    pub fn parse_all<T: Record>(&self, lines: &[String]) -> Result<Vec<T>> {
        lines.iter().map(|line| self.parse_line(line)).collect()
    }
}

/// Parse a UUID-shaped identifier, with or without enclosing braces
pub fn parse_identifier(value: &str) -> Result<Uuid> {
    let trimmed = value.trim();
    let bare = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    Uuid::parse_str(bare).map_err(|e| BridgeError::Identifier {
        value: value.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const SCREEN_LINE: &str = r#"js: {"name":"DP-1","manufacturer":"Dell","model":"U2720Q","serial":"ABC123","pixelRatio":1.0,"geometry":{"topLeft":{"x":0,"y":0},"bottomRight":{"x":2560,"y":1440}}}"#;

    const WINDOW_LINE: &str = r#"js: {"id":"6f2a1c2e-8d0b-4a55-9d3c-0d5f0b6e7a11","caption":"Konsole","pid":4242,"x":10.5,"y":20,"width":800,"height":600,"fullScreen":false,"onAllDesktops":false,"keepAbove":true,"keepBelow":false,"minimized":false,"demandsAttention":true,"desktopIds":["0a7b4e3e-61f4-4c8a-9a9b-5a1b2c3d4e5f"]}"#;

    fn parser() -> OutputParser {
        OutputParser::new("js: ")
    }

    #[test]
    fn test_parse_screen() {
        let screen: Screen = parser().parse_line(SCREEN_LINE).unwrap();
        assert_eq!(screen.name, "DP-1");
        assert_eq!(screen.serial_number, "ABC123");
        assert_eq!(screen.pixel_ratio, 1.0);
        assert_eq!((screen.geometry.top_left.x, screen.geometry.top_left.y), (0, 0));
        assert_eq!(
            (screen.geometry.bottom_right.x, screen.geometry.bottom_right.y),
            (2560, 1440)
        );
    }

    #[test]
    fn test_screen_reserializes_to_same_fields() {
        let screen: Screen = parser().parse_line(SCREEN_LINE).unwrap();
        let original: Value = serde_json::from_str(&SCREEN_LINE["js: ".len()..]).unwrap();
        assert_eq!(serde_json::to_value(&screen).unwrap(), original);
    }

    #[test]
    fn test_parse_desktop() {
        let line = r#"js: {"id":"0a7b4e3e-61f4-4c8a-9a9b-5a1b2c3d4e5f","index":1,"name":"Work","x11Number":2}"#;
        let desktop: Desktop = parser().parse_line(line).unwrap();
        assert_eq!(desktop.name, "Work");
        assert_eq!(desktop.index, 1);
        assert_eq!(desktop.x11_number, 2);

        let original: Value = serde_json::from_str(&line["js: ".len()..]).unwrap();
        assert_eq!(serde_json::to_value(&desktop).unwrap(), original);
    }

    #[test]
    fn test_window_fields_survive_reserialization() {
        let window: Window = parser().parse_line(WINDOW_LINE).unwrap();
        assert_eq!(window.caption, "Konsole");
        assert_eq!(window.pid, 4242);
        assert!(window.keep_above);
        assert!(window.demands_attention);
        assert_eq!(window.desktop_ids.len(), 1);
        assert!(window.command_line.is_empty());

        let original: Value = serde_json::from_str(&WINDOW_LINE["js: ".len()..]).unwrap();
        let reserialized = serde_json::to_value(&window).unwrap();
        for (key, value) in original.as_object().unwrap() {
            let got = &reserialized[key];
            match (value.as_f64(), got.as_f64()) {
                (Some(a), Some(b)) => assert_eq!(a, b, "field {}", key),
                _ => assert_eq!(got, value, "field {}", key),
            }
        }
    }

    #[test]
    fn test_line_without_prefix_is_parse_error() {
        let err = parser()
            .parse_line::<Screen>("kwin_scripting: script finished")
            .unwrap_err();
        assert!(matches!(err, BridgeError::Parse { entity: "screen", .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parser().parse_line::<Desktop>("js: {\"id\": ").unwrap_err();
        assert!(matches!(err, BridgeError::Parse { entity: "desktop", .. }));
    }

    #[test]
    fn test_one_bad_line_fails_collection() {
        let lines = vec![
            r#"js: {"id":"0a7b4e3e-61f4-4c8a-9a9b-5a1b2c3d4e5f","index":0,"name":"One","x11Number":1}"#.to_string(),
            r#"js: {"id":"not-a-uuid","index":1,"name":"Two","x11Number":2}"#.to_string(),
        ];
        assert!(parser().parse_all::<Desktop>(&lines).is_err());
    }

    #[test]
    fn test_parse_identifier() {
        let id = parse_identifier("{6f2a1c2e-8d0b-4a55-9d3c-0d5f0b6e7a11}").unwrap();
        assert_eq!(id.to_string(), "6f2a1c2e-8d0b-4a55-9d3c-0d5f0b6e7a11");

        let err = parse_identifier("w0").unwrap_err();
        assert!(matches!(err, BridgeError::Identifier { ref value, .. } if value == "w0"));
    }
}
