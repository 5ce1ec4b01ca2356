//! High-level KWin client
//!
//! Queries build an [`Environment`] snapshot; mutations fire one scriptlet
//! each. A mutation only reports whether the script round trip worked. KWin
//! silently ignores a window it cannot find or move, so re-query to confirm.

use std::collections::HashMap;
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::core::{
    Desktop, Environment, OutputParser, ProcFs, ProcessTable, Record, Screen, Window,
    resolve_command,
};
use crate::error::Result;
use crate::script::{ScriptBridge, ScriptCommand, ScriptExecutor};

pub struct KWinClient<E = ScriptBridge> {
    executor: E,
    parser: OutputParser,
    processes: Box<dyn ProcessTable>,
}

impl KWinClient<ScriptBridge> {
    /// Connect using `config`
    pub async fn connect(config: &BridgeConfig) -> Result<Self> {
        let bridge = ScriptBridge::from_config(config).await?;
        Ok(Self::new(
            bridge,
            OutputParser::new(&config.print_prefix),
            Box::new(ProcFs::new(&config.proc_root)),
        ))
    }
}

impl<E: ScriptExecutor> KWinClient<E> {
    pub fn new(executor: E, parser: OutputParser, processes: Box<dyn ProcessTable>) -> Self {
        Self {
            executor,
            parser,
            processes,
        }
    }

    async fn query<T: Record>(&mut self, command: ScriptCommand<'_>) -> Result<Vec<T>> {
        let lines = self.executor.execute(&command.render()).await?;
        let records: Vec<T> = self.parser.parse_all(&lines)?;
        tracing::debug!("{} returned {} records", command.name(), records.len());
        Ok(records)
    }

    async fn mutate(&mut self, command: ScriptCommand<'_>) -> Result<()> {
        let lines = self.executor.execute(&command.render()).await?;
        for line in lines {
            tracing::debug!("{}: {}", command.name(), line);
        }
        Ok(())
    }

    /// All outputs keyed by name; a repeated name keeps the last one
    pub async fn screens(&mut self) -> Result<HashMap<String, Screen>> {
        let screens: Vec<Screen> = self.query(ScriptCommand::QueryScreens).await?;
        Ok(screens.into_iter().map(|s| (s.name.clone(), s)).collect())
    }

    pub async fn desktops(&mut self) -> Result<HashMap<Uuid, Desktop>> {
        let desktops: Vec<Desktop> = self.query(ScriptCommand::QueryDesktops).await?;
        Ok(desktops.into_iter().map(|d| (d.id, d)).collect())
    }

    /// All non-special windows, with their command lines resolved
    ///
    /// With `desktops` given, each window's desktop ids are also resolved to
    /// full records. A failed command-line lookup fails the whole call.
    pub async fn windows(
        &mut self,
        desktops: Option<&HashMap<Uuid, Desktop>>,
    ) -> Result<HashMap<Uuid, Window>> {
        let windows: Vec<Window> = self.query(ScriptCommand::QueryWindows).await?;

        let mut resolved = HashMap::with_capacity(windows.len());
        for mut window in windows {
            let raw = self.processes.command_line(window.pid).await?;
            let (command_line, app_name) = resolve_command(&raw);
            window.command_line = command_line;
            window.app_name = app_name;
            if let Some(desktops) = desktops {
                window.desktops = window.resolve_desktops(desktops);
            }
            resolved.insert(window.id, window);
        }
        Ok(resolved)
    }

    /// Screens, then desktops, then windows; the first failure aborts
    pub async fn environment(&mut self) -> Result<Environment> {
        let screens = self.screens().await?;
        let desktops = self.desktops().await?;
        let windows = self.windows(Some(&desktops)).await?;

        tracing::info!(
            "Environment: {} screens, {} desktops, {} windows",
            screens.len(),
            desktops.len(),
            windows.len()
        );

        Ok(Environment {
            screens,
            desktops,
            windows,
        })
    }

    pub async fn move_window_to_desktop(&mut self, window: &Window, desktop: &Desktop) -> Result<()> {
        self.move_window_to_desktops(window, std::slice::from_ref(desktop)).await
    }

    /// Put the window on exactly these desktops
    ///
    /// On an X11 session KWin keeps only the last desktop.
    pub async fn move_window_to_desktops(&mut self, window: &Window, desktops: &[Desktop]) -> Result<()> {
        let ids: Vec<Uuid> = desktops.iter().map(|d| d.id).collect();
        self.mutate(ScriptCommand::MoveToDesktops {
            window: window.id,
            desktops: &ids,
        })
        .await
    }

    pub async fn move_window_to_screen(&mut self, window: &Window, screen: &Screen) -> Result<()> {
        self.mutate(ScriptCommand::MoveToScreen {
            window: window.id,
            screen: &screen.name,
        })
        .await
    }

    /// Desktops first, then the screen
    pub async fn move_window_to_desktops_and_screen(
        &mut self,
        window: &Window,
        desktops: &[Desktop],
        screen: &Screen,
    ) -> Result<()> {
        self.move_window_to_desktops(window, desktops).await?;
        self.move_window_to_screen(window, screen).await
    }

    pub async fn maximize_window(&mut self, window: &Window) -> Result<()> {
        self.maximize(window, true, true).await
    }

    pub async fn maximize_window_horizontally(&mut self, window: &Window) -> Result<()> {
        self.maximize(window, true, false).await
    }

    pub async fn maximize_window_vertically(&mut self, window: &Window) -> Result<()> {
        self.maximize(window, false, true).await
    }

    async fn maximize(&mut self, window: &Window, horizontally: bool, vertically: bool) -> Result<()> {
        self.mutate(ScriptCommand::Maximize {
            window: window.id,
            horizontally,
            vertically,
        })
        .await
    }

    pub async fn minimize_window(&mut self, window: &Window) -> Result<()> {
        self.mutate(ScriptCommand::Minimize { window: window.id }).await
    }

    pub async fn set_window_demands_attention(&mut self, window: &Window, demands_attention: bool) -> Result<()> {
        self.mutate(ScriptCommand::SetDemandsAttention {
            window: window.id,
            demands_attention,
        })
        .await
    }

    pub async fn demand_attention(&mut self, window: &Window) -> Result<()> {
        self.set_window_demands_attention(window, true).await
    }

    pub async fn undemand_attention(&mut self, window: &Window) -> Result<()> {
        self.set_window_demands_attention(window, false).await
    }
}
