//! Synchronous scriptlet execution
//!
//! Turns a one-shot KWin script into a call that returns the script's printed
//! lines. There is no correlation id in the journal: the output is whatever
//! the script engine logged between the run call and the completion of stop.
//! With `correlation_markers` on, the script is additionally bracketed by two
//! unique print statements and only the lines between them are kept.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Arc;
use uuid::Uuid;

use super::command::js_string;
use super::journal::{JournalReader, LogSource, format_timestamp};
use super::runner::{ScriptFile, ScriptRunner};
use crate::backend::{self, ScriptingBus};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

/// Runs scriptlet text and returns its output lines
///
/// Takes `&mut self`: one executor has at most one script registered at a
/// time. Running several executors in one process against the same KWin is
/// not supported.
#[async_trait]
pub trait ScriptExecutor: Send {
    async fn execute(&mut self, script: &str) -> Result<Vec<String>>;
}

/// Time bracket used for the journal query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureWindow {
    /// Taken after registration, right before run is invoked
    pub start: DateTime<Local>,
    /// Taken right after stop returns
    pub end: DateTime<Local>,
}

pub struct ScriptBridge {
    runner: ScriptRunner,
    journal: Box<dyn LogSource>,
    print_prefix: String,
    correlation_markers: bool,
}

impl ScriptBridge {
    pub fn new(runner: ScriptRunner, journal: Box<dyn LogSource>, print_prefix: impl Into<String>) -> Self {
        Self {
            runner,
            journal,
            print_prefix: print_prefix.into(),
            correlation_markers: false,
        }
    }

    pub fn with_correlation_markers(mut self, enabled: bool) -> Self {
        self.correlation_markers = enabled;
        self
    }

    /// Build the bridge from config, connecting the selected transport
    pub async fn from_config(config: &BridgeConfig) -> Result<Self> {
        let bus = backend::create_bus(config).await?;
        Ok(Self::with_bus(config, bus))
    }

    pub fn with_bus(config: &BridgeConfig, bus: Arc<dyn ScriptingBus>) -> Self {
        let runner = ScriptRunner::new(bus, config.temp_dir.clone());
        let journal = JournalReader::new(&config.journalctl, config.journal_categories.clone());
        Self::new(runner, Box::new(journal), &config.print_prefix)
            .with_correlation_markers(config.correlation_markers)
    }

    /// register → run → stop → journal, for an already materialized script
    async fn round_trip(&self, script: &ScriptFile) -> Result<Vec<String>> {
        let registration = self.runner.register(script).await?;

        let start = Local::now();
        let run_result = self.runner.run(registration).await;
        let stop_result = self.runner.stop(registration).await;
        let capture = CaptureWindow {
            start,
            end: Local::now(),
        };

        if let Err(e) = run_result {
            if let Err(stop_err) = stop_result {
                tracing::warn!("Failed to stop script {} after run error: {}", registration, stop_err);
            }
            return Err(e);
        }
        stop_result?;

        tracing::debug!(
            "Script {} captured between {} and {}",
            registration,
            format_timestamp(&capture.start),
            format_timestamp(&capture.end)
        );
        self.journal.fetch(capture.start, capture.end).await
    }

    fn marker_line(&self, marker: &Uuid, edge: &str) -> String {
        format!("{}{}", self.print_prefix, marker_text(marker, edge))
    }

    /// Keep only the lines strictly between the begin and end markers
    fn between_markers(&self, lines: Vec<String>, marker: &Uuid) -> Result<Vec<String>> {
        let begin = self.marker_line(marker, "begin");
        let end = self.marker_line(marker, "end");

        let start = lines
            .iter()
            .position(|l| *l == begin)
            .ok_or_else(|| BridgeError::protocol(format!("begin marker {} not found in journal", marker)))?;
        let stop = lines[start..]
            .iter()
            .position(|l| *l == end)
            .map(|offset| start + offset)
            .ok_or_else(|| BridgeError::protocol(format!("end marker {} not found in journal", marker)))?;

        Ok(lines[start + 1..stop].to_vec())
    }
}

fn marker_text(marker: &Uuid, edge: &str) -> String {
    format!("kwin-bridge:{}:{}", marker, edge)
}

fn bracket(script: &str, marker: &Uuid) -> String {
    format!(
        "print({});\n{}\nprint({});\n",
        js_string(&marker_text(marker, "begin")),
        script,
        js_string(&marker_text(marker, "end"))
    )
}

#[async_trait]
impl ScriptExecutor for ScriptBridge {
    async fn execute(&mut self, script: &str) -> Result<Vec<String>> {
        let marker = self.correlation_markers.then(Uuid::new_v4);
        let text = match &marker {
            Some(m) => bracket(script, m),
            None => script.to_string(),
        };

        let file = self.runner.materialize(&text)?;
        let result = self.round_trip(&file).await;
        self.runner.cleanup(file);

        let lines = result?;
        match marker {
            Some(m) => self.between_markers(lines, &m),
            None => Ok(lines),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load,
        Run,
        Stop,
    }

    /// Records every call with the wall-clock time around it
    #[derive(Default)]
    struct FakeBus {
        calls: Mutex<Vec<(Call, DateTime<Local>)>>,
        loaded: Mutex<Option<(PathBuf, String)>>,
        fail_load: bool,
        fail_run: bool,
        fail_stop: bool,
    }

    impl FakeBus {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push((call, Local::now()));
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
        }

        fn time_of(&self, call: Call) -> DateTime<Local> {
            self.calls.lock().unwrap().iter().find(|(c, _)| *c == call).unwrap().1
        }

        fn script_path(&self) -> PathBuf {
            self.loaded.lock().unwrap().as_ref().unwrap().0.clone()
        }

        fn script_text(&self) -> String {
            self.loaded.lock().unwrap().as_ref().unwrap().1.clone()
        }
    }

    fn ipc(method: &str) -> BridgeError {
        BridgeError::Ipc {
            method: method.to_string(),
            message: "org.freedesktop.DBus.Error.ServiceUnknown".to_string(),
        }
    }

    #[async_trait]
    impl ScriptingBus for FakeBus {
        async fn load_script(&self, path: &Path) -> Result<i32> {
            let text = std::fs::read_to_string(path).unwrap();
            *self.loaded.lock().unwrap() = Some((path.to_path_buf(), text));
            if self.fail_load {
                return Err(ipc("loadScript"));
            }
            // time the registration number became available
            self.record(Call::Load);
            Ok(11)
        }

        async fn run_script(&self, registration: i32) -> Result<()> {
            assert_eq!(registration, 11);
            self.record(Call::Run);
            if self.fail_run { Err(ipc("run")) } else { Ok(()) }
        }

        async fn stop_script(&self, registration: i32) -> Result<()> {
            assert_eq!(registration, 11);
            let result = if self.fail_stop { Err(ipc("stop")) } else { Ok(()) };
            self.record(Call::Stop);
            result
        }
    }

    /// Serves canned lines, or lines derived from the loaded script
    struct FakeJournal {
        bus: Arc<FakeBus>,
        queries: Arc<Mutex<Vec<(DateTime<Local>, DateTime<Local>)>>>,
        respond: fn(&FakeBus) -> Result<Vec<String>>,
    }

    #[async_trait]
    impl LogSource for FakeJournal {
        async fn fetch(&self, from: DateTime<Local>, to: DateTime<Local>) -> Result<Vec<String>> {
            self.queries.lock().unwrap().push((from, to));
            (self.respond)(&self.bus)
        }
    }

    struct Harness {
        _dir: TempDir,
        bus: Arc<FakeBus>,
        queries: Arc<Mutex<Vec<(DateTime<Local>, DateTime<Local>)>>>,
        bridge: ScriptBridge,
    }

    fn harness(bus: FakeBus, respond: fn(&FakeBus) -> Result<Vec<String>>) -> Harness {
        let dir = TempDir::new().unwrap();
        let bus = Arc::new(bus);
        let queries = Arc::new(Mutex::new(Vec::new()));
        let journal = FakeJournal {
            bus: bus.clone(),
            queries: queries.clone(),
            respond,
        };
        let runner = ScriptRunner::new(bus.clone(), Some(dir.path().to_path_buf()));
        Harness {
            _dir: dir,
            bus,
            queries,
            bridge: ScriptBridge::new(runner, Box::new(journal), "js: "),
        }
    }

    fn two_lines(_: &FakeBus) -> Result<Vec<String>> {
        Ok(vec!["js: {\"a\":1}".to_string(), "js: {\"a\":2}".to_string()])
    }

    #[tokio::test]
    async fn test_execute_returns_journal_lines() {
        let mut h = harness(FakeBus::default(), two_lines);

        let lines = h.bridge.execute("print('x');").await.unwrap();

        assert_eq!(lines, vec!["js: {\"a\":1}", "js: {\"a\":2}"]);
        assert_eq!(h.bus.calls(), vec![Call::Load, Call::Run, Call::Stop]);
        assert_eq!(h.bus.script_text(), "print('x');");
        assert!(!h.bus.script_path().exists());
    }

    #[tokio::test]
    async fn test_capture_window_brackets_run_and_stop() {
        let mut h = harness(FakeBus::default(), two_lines);
        h.bridge.execute("print('x');").await.unwrap();

        let queries = h.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        let (from, to) = queries[0];
        assert!(from <= to);
        assert!(from >= h.bus.time_of(Call::Load));
        assert!(from <= h.bus.time_of(Call::Run));
        assert!(to >= h.bus.time_of(Call::Stop));
    }

    #[tokio::test]
    async fn test_run_failure_still_stops_and_cleans_up() {
        let bus = FakeBus {
            fail_run: true,
            ..Default::default()
        };
        let mut h = harness(bus, two_lines);

        let err = h.bridge.execute("print('x');").await.unwrap_err();

        assert!(matches!(err, BridgeError::Ipc { ref method, .. } if method == "run"));
        assert_eq!(h.bus.calls(), vec![Call::Load, Call::Run, Call::Stop]);
        assert!(h.queries.lock().unwrap().is_empty());
        assert!(!h.bus.script_path().exists());
    }

    #[tokio::test]
    async fn test_run_and_stop_failure_reports_run_error() {
        let bus = FakeBus {
            fail_run: true,
            fail_stop: true,
            ..Default::default()
        };
        let mut h = harness(bus, two_lines);

        let err = h.bridge.execute("x").await.unwrap_err();
        assert!(matches!(err, BridgeError::Ipc { ref method, .. } if method == "run"));
    }

    #[tokio::test]
    async fn test_stop_failure_surfaces_after_successful_run() {
        let bus = FakeBus {
            fail_stop: true,
            ..Default::default()
        };
        let mut h = harness(bus, two_lines);

        let err = h.bridge.execute("x").await.unwrap_err();

        assert!(matches!(err, BridgeError::Ipc { ref method, .. } if method == "stop"));
        assert!(h.queries.lock().unwrap().is_empty());
        assert!(!h.bus.script_path().exists());
    }

    #[tokio::test]
    async fn test_register_failure_skips_run_and_stop() {
        let bus = FakeBus {
            fail_load: true,
            ..Default::default()
        };
        let mut h = harness(bus, two_lines);

        assert!(h.bridge.execute("x").await.is_err());
        assert!(h.bus.calls().is_empty());
        assert!(!h.bus.script_path().exists());
    }

    #[tokio::test]
    async fn test_journal_failure_surfaces() {
        fn broken(_: &FakeBus) -> Result<Vec<String>> {
            Err(BridgeError::io(
                "querying the journal",
                std::io::Error::other("journalctl exited with exit status: 1"),
            ))
        }
        let mut h = harness(FakeBus::default(), broken);

        let err = h.bridge.execute("x").await.unwrap_err();
        assert!(matches!(err, BridgeError::Io { .. }));
        assert_eq!(h.bus.calls(), vec![Call::Load, Call::Run, Call::Stop]);
    }

    /// Emits unrelated noise around the marked output of the loaded script
    fn marked_output(bus: &FakeBus) -> Result<Vec<String>> {
        let text = bus.script_text();
        let start = text.find("kwin-bridge:").unwrap();
        let marker = &text[start + "kwin-bridge:".len()..start + "kwin-bridge:".len() + 36];
        Ok(vec![
            "js: {\"stale\":true}".to_string(),
            format!("js: kwin-bridge:{}:begin", marker),
            "js: {\"a\":1}".to_string(),
            format!("js: kwin-bridge:{}:end", marker),
            "js: {\"late\":true}".to_string(),
        ])
    }

    #[tokio::test]
    async fn test_correlation_markers_trim_foreign_lines() {
        let mut h = harness(FakeBus::default(), marked_output);
        h.bridge.correlation_markers = true;

        let lines = h.bridge.execute("print('x');").await.unwrap();

        assert_eq!(lines, vec!["js: {\"a\":1}"]);
        let text = h.bus.script_text();
        assert!(text.starts_with("print(\"kwin-bridge:"));
        assert!(text.contains("\nprint('x');\n"));
    }

    #[tokio::test]
    async fn test_missing_marker_is_protocol_error() {
        let mut h = harness(FakeBus::default(), two_lines);
        h.bridge.correlation_markers = true;

        let err = h.bridge.execute("print('x');").await.unwrap_err();
        assert!(matches!(err, BridgeError::Protocol { .. }));
    }
}
