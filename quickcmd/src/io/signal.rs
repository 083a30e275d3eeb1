//! Forceful termination of tracked children.
//!
//! [`Signaller`] separates the kill policy from the OS call so sessions can be
//! exercised without terminating anything. [`ProcessSignaller`] sends
//! `SIGKILL`, which the target cannot catch. Every tracked child leads its own
//! process group, so a kill reaches the whole command, not just its shell.

use anyhow::Result;
use tracing::{info, warn};

use crate::core::command::killed;
use crate::core::registry::ProcessRegistry;
use crate::io::log_sink::Logger;

pub trait Signaller {
    /// Kill a tracked child and every process in the group it leads.
    fn kill(&self, pid: u32) -> Result<()>;

    /// Kill every process in the caller's process group, the caller included.
    fn kill_group(&self) -> Result<()>;
}

/// Signaller backed by `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSignaller;

#[cfg(unix)]
impl Signaller for ProcessSignaller {
    fn kill(&self, pid: u32) -> Result<()> {
        use anyhow::Context;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).with_context(|| format!("pid {pid} out of range"))?;
        killpg(Pid::from_raw(raw), Signal::SIGKILL)
            .with_context(|| format!("kill process group {pid}"))?;
        Ok(())
    }

    fn kill_group(&self) -> Result<()> {
        use anyhow::Context;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // pid 0 addresses our own process group.
        kill(Pid::from_raw(0), Signal::SIGKILL).context("kill process group")?;
        Ok(())
    }
}

#[cfg(not(unix))]
impl Signaller for ProcessSignaller {
    fn kill(&self, pid: u32) -> Result<()> {
        Err(anyhow::anyhow!("killing process {pid} is only supported on unix"))
    }

    fn kill_group(&self) -> Result<()> {
        Err(anyhow::anyhow!("process group termination is only supported on unix"))
    }
}

/// Pop every tracked pid (newest first), kill it, and log one record per kill.
///
/// A failed signal (typically a group that died since the last reap) is traced but still
/// logged, so the log shows one record per tracked process.
pub fn drain_and_kill<S: Signaller>(
    registry: &mut ProcessRegistry,
    signaller: &S,
    logger: &Logger,
) -> usize {
    registry.drain_each(|pid| {
        match signaller.kill(pid) {
            Ok(()) => info!(pid, "killed tracked process"),
            Err(err) => warn!(pid, err = %format!("{err:#}"), "kill failed"),
        }
        logger.log(killed(pid));
    })
}
