//! Test-only helpers: captured console output, a signaller that records
//! instead of killing, and scratch workspaces.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::config::SessionConfig;
use crate::io::log_sink::Console;
use crate::io::signal::Signaller;
use crate::io::workspace::QuickPaths;
use crate::session::Session;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Console whose stdout/stderr land in memory.
#[derive(Clone, Default)]
pub struct CaptureConsole {
    out: SharedBuf,
    err: SharedBuf,
}

impl CaptureConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn console(&self) -> Console {
        Console::new(self.out.clone(), self.err.clone())
    }

    pub fn stdout(&self) -> String {
        self.out.contents()
    }

    pub fn stderr(&self) -> String {
        self.err.contents()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Kill(u32),
    KillGroup,
}

/// Signaller that only records what it was asked to do.
#[derive(Clone, Default)]
pub struct RecordingSignaller {
    events: Arc<Mutex<Vec<SignalEvent>>>,
}

impl RecordingSignaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SignalEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn killed(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SignalEvent::Kill(pid) => Some(pid),
                SignalEvent::KillGroup => None,
            })
            .collect()
    }

    fn record(&self, event: SignalEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow!("signal log poisoned"))?
            .push(event);
        Ok(())
    }
}

impl Signaller for RecordingSignaller {
    fn kill(&self, pid: u32) -> Result<()> {
        self.record(SignalEvent::Kill(pid))
    }

    fn kill_group(&self) -> Result<()> {
        self.record(SignalEvent::KillGroup)
    }
}

/// Temporary working directory for a session.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> QuickPaths {
        QuickPaths::new(self.temp.path(), &SessionConfig::default())
    }

    pub fn log_path(&self) -> PathBuf {
        self.paths().log_path
    }

    pub fn read_log(&self) -> Result<String> {
        let path = self.log_path();
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Session bound to this workspace with captured console and recorded
    /// signals. The process working directory is left alone.
    pub fn session(
        &self,
        config: &SessionConfig,
    ) -> (Session<RecordingSignaller>, CaptureConsole, RecordingSignaller) {
        let capture = CaptureConsole::new();
        let signaller = RecordingSignaller::new();
        let session = Session::bind(
            self.temp.path(),
            config,
            capture.console(),
            signaller.clone(),
        );
        (session, capture, signaller)
    }
}

/// Poll `path` until its contents contain `needle`, or fail after `timeout`.
pub fn wait_for_log(path: &Path, needle: &str, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;
    loop {
        let contents = fs::read_to_string(path).unwrap_or_default();
        if contents.contains(needle) {
            return Ok(contents);
        }
        if Instant::now() >= deadline {
            return Err(anyhow!(
                "timed out waiting for {needle:?} in {}; log so far:\n{contents}",
                path.display()
            ));
        }
        thread::sleep(Duration::from_millis(20));
    }
}
