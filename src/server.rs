//! MCP Server implementation for kwin-bridge
//!
//! Exposes the KWin environment snapshot and window mutations as Model
//! Context Protocol tools. Tool calls are serialised through one client so
//! only one script is ever registered with KWin at a time.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, serde,
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::KWinClient;
use crate::config::BridgeConfig;
use crate::core::{Window, parse_identifier};

/// Parameters for kwin_environment tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct EnvironmentParams {
    /// Filter windows by caption (case-insensitive substring match)
    #[serde(default)]
    pub caption_filter: Option<String>,
    /// Filter windows by application name
    #[serde(default)]
    pub app_filter: Option<String>,
}

/// Parameters for tools acting on one window
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct WindowParams {
    /// Window id from kwin_environment
    pub window_id: String,
}

/// Parameters for window_move_to_desktops tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MoveToDesktopsParams {
    /// Window id from kwin_environment
    pub window_id: String,
    /// Ids of the desktops the window should be on
    pub desktop_ids: Vec<String>,
}

/// Parameters for window_move_to_screen tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MoveToScreenParams {
    /// Window id from kwin_environment
    pub window_id: String,
    /// Screen name, e.g. "DP-1"
    pub screen: String,
}

/// Parameters for window_maximize tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MaximizeParams {
    /// Window id from kwin_environment
    pub window_id: String,
    /// "both" (default), "horizontal" or "vertical"
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String {
    "both".to_string()
}

/// Parameters for window_demand_attention tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DemandAttentionParams {
    /// Window id from kwin_environment
    pub window_id: String,
    /// Set (default) or clear the attention flag
    #[serde(default = "default_demands_attention")]
    pub demands_attention: bool,
}

fn default_demands_attention() -> bool {
    true
}

fn success(value: serde_json::Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

fn failure(value: serde_json::Value) -> CallToolResult {
    CallToolResult::error(vec![Content::text(value.to_string())])
}

fn mutation_result(result: crate::error::Result<()>, action: &str, window: &Window) -> CallToolResult {
    match result {
        Ok(()) => success(json!({
            "success": true,
            "window_id": window.id,
            "caption": window.caption,
            "message": format!("{} sent; KWin does not confirm, re-run kwin_environment to verify", action)
        })),
        Err(e) => failure(json!({
            "error": format!("Failed to {}", action),
            "window_id": window.id,
            "details": e.to_string()
        })),
    }
}

/// Resolve a window id against a fresh window list
async fn find_window(client: &mut KWinClient, window_id: &str) -> Result<Window, CallToolResult> {
    let id = parse_identifier(window_id).map_err(|e| {
        failure(json!({
            "error": "Invalid window id",
            "details": e.to_string()
        }))
    })?;

    let windows = client.windows(None).await.map_err(|e| {
        failure(json!({
            "error": "Failed to list windows",
            "details": e.to_string()
        }))
    })?;

    windows.get(&id).cloned().ok_or_else(|| {
        failure(json!({
            "error": "Window not found",
            "window_id": window_id,
            "suggestion": "Run kwin_environment to get current window ids"
        }))
    })
}

/// kwin-bridge MCP Server
#[derive(Clone)]
pub struct KWinServer {
    /// The one client every tool call goes through
    client: Arc<Mutex<KWinClient>>,
    /// MCP tool router
    tool_router: ToolRouter<KWinServer>,
}

#[tool_router]
impl KWinServer {
    /// Create a new server connected to KWin
    pub async fn new(config: &BridgeConfig) -> anyhow::Result<Self> {
        let client = KWinClient::connect(config).await?;

        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(description = "Snapshot of all screens (left to right), virtual desktops and windows managed by KWin. Window and desktop ids can be used with the other tools.")]
    async fn kwin_environment(
        &self,
        params: Parameters<EnvironmentParams>,
    ) -> Result<CallToolResult, McpError> {
        let env = match self.client.lock().await.environment().await {
            Ok(env) => env,
            Err(e) => {
                return Ok(failure(json!({
                    "error": "Failed to query KWin",
                    "details": e.to_string()
                })));
            }
        };

        let mut windows: Vec<&Window> = env
            .windows
            .values()
            .filter(|w| {
                let caption_match = params.0.caption_filter.as_ref().is_none_or(|f| {
                    w.caption.to_lowercase().contains(&f.to_lowercase())
                });
                let app_match = params.0.app_filter.as_ref().is_none_or(|f| {
                    w.app_name.to_lowercase().contains(&f.to_lowercase())
                });
                caption_match && app_match
            })
            .collect();
        windows.sort_by(|a, b| a.caption.cmp(&b.caption));

        Ok(success(json!({
            "screens": env.screens_left_to_right(),
            "desktops": env.desktops_in_order(),
            "windows": windows,
            "count": windows.len()
        })))
    }

    #[tool(description = "Move a window to exactly the given virtual desktops")]
    async fn window_move_to_desktops(
        &self,
        params: Parameters<MoveToDesktopsParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut client = self.client.lock().await;

        let window = match find_window(&mut client, &params.0.window_id).await {
            Ok(w) => w,
            Err(result) => return Ok(result),
        };

        let desktops = match client.desktops().await {
            Ok(d) => d,
            Err(e) => {
                return Ok(failure(json!({
                    "error": "Failed to list desktops",
                    "details": e.to_string()
                })));
            }
        };

        let mut targets = Vec::with_capacity(params.0.desktop_ids.len());
        for raw in &params.0.desktop_ids {
            match parse_identifier(raw).ok().and_then(|id| desktops.get(&id)) {
                Some(d) => targets.push(d.clone()),
                None => {
                    return Ok(failure(json!({
                        "error": "Desktop not found",
                        "desktop_id": raw,
                        "suggestion": "Run kwin_environment to get current desktop ids"
                    })));
                }
            }
        }

        let result = client.move_window_to_desktops(&window, &targets).await;
        Ok(mutation_result(result, "move window to desktops", &window))
    }

    #[tool(description = "Move a window to another screen")]
    async fn window_move_to_screen(
        &self,
        params: Parameters<MoveToScreenParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut client = self.client.lock().await;

        let window = match find_window(&mut client, &params.0.window_id).await {
            Ok(w) => w,
            Err(result) => return Ok(result),
        };

        let screen = match client.screens().await {
            Ok(mut screens) => match screens.remove(&params.0.screen) {
                Some(s) => s,
                None => {
                    return Ok(failure(json!({
                        "error": "Screen not found",
                        "screen": params.0.screen,
                        "available": screens.keys().collect::<Vec<_>>()
                    })));
                }
            },
            Err(e) => {
                return Ok(failure(json!({
                    "error": "Failed to list screens",
                    "details": e.to_string()
                })));
            }
        };

        let result = client.move_window_to_screen(&window, &screen).await;
        Ok(mutation_result(result, "move window to screen", &window))
    }

    #[tool(description = "Maximize a window horizontally, vertically or both")]
    async fn window_maximize(
        &self,
        params: Parameters<MaximizeParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut client = self.client.lock().await;

        let window = match find_window(&mut client, &params.0.window_id).await {
            Ok(w) => w,
            Err(result) => return Ok(result),
        };

        let result = match params.0.mode.as_str() {
            "both" => client.maximize_window(&window).await,
            "horizontal" => client.maximize_window_horizontally(&window).await,
            "vertical" => client.maximize_window_vertically(&window).await,
            other => {
                return Ok(failure(json!({
                    "error": "Invalid mode",
                    "mode": other,
                    "suggestion": "Use both, horizontal or vertical"
                })));
            }
        };
        Ok(mutation_result(result, "maximize window", &window))
    }

    #[tool(description = "Minimize a window")]
    async fn window_minimize(
        &self,
        params: Parameters<WindowParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut client = self.client.lock().await;

        let window = match find_window(&mut client, &params.0.window_id).await {
            Ok(w) => w,
            Err(result) => return Ok(result),
        };

        let result = client.minimize_window(&window).await;
        Ok(mutation_result(result, "minimize window", &window))
    }

    #[tool(description = "Set or clear a window's demands-attention flag")]
    async fn window_demand_attention(
        &self,
        params: Parameters<DemandAttentionParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut client = self.client.lock().await;

        let window = match find_window(&mut client, &params.0.window_id).await {
            Ok(w) => w,
            Err(result) => return Ok(result),
        };

        let result = client
            .set_window_demands_attention(&window, params.0.demands_attention)
            .await;
        Ok(mutation_result(result, "set demands-attention", &window))
    }
}

#[tool_handler]
impl ServerHandler for KWinServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "kwin-bridge drives the KWin compositor through one-shot scripts. \
                 Use kwin_environment to discover screens, desktops and windows, then pass \
                 the returned ids to the window_* tools. Changes are not confirmed by KWin; \
                 re-run kwin_environment to check the result.".to_string()
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Window {
        Window {
            id: uuid::Uuid::parse_str("6f2a1c2e-8d0b-4a55-9d3c-0d5f0b6e7a11").unwrap(),
            caption: "Dolphin".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_param_defaults() {
        let params: MaximizeParams = serde_json::from_value(json!({ "window_id": "x" })).unwrap();
        assert_eq!(params.mode, "both");

        let params: DemandAttentionParams = serde_json::from_value(json!({ "window_id": "x" })).unwrap();
        assert!(params.demands_attention);
    }

    #[test]
    fn test_mutation_result_reports_failure() {
        let err = crate::error::BridgeError::Ipc {
            method: "org.kde.kwin.Script.run".to_string(),
            message: "timeout".to_string(),
        };
        let result = mutation_result(Err(err), "minimize window", &window());
        assert_eq!(result.is_error, Some(true));

        let result = mutation_result(Ok(()), "minimize window", &window());
        assert_eq!(result.is_error, Some(false));
    }
}
