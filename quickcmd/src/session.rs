//! Session lifecycle: bind a working directory, run commands, tear down.
//!
//! A [`Session`] owns the command log, the registry of started children and
//! the children themselves. A child is only reaped by the session, and its pid
//! leaves the registry in the same step, so a tracked pid always names a
//! process we started. It is created by [`Session::init`] and consumed by
//! exactly one of the two teardown paths:
//!
//! - [`Session::teardown`] closes the log and forgets every tracked child,
//!   leaving the commands running.
//! - [`Session::teardown_and_kill`] kills every tracked child, closes the log
//!   and then kills the whole process group, the calling process included.

use std::env;
use std::mem;
use std::path::{Path, PathBuf};
use std::process::Child;

use anyhow::Result;
use tracing::{debug, error, info, instrument, warn};

use crate::core::command::{BEGIN_LOGGING, DONE_LOGGING};
use crate::core::registry::ProcessRegistry;
use crate::io::config::SessionConfig;
use crate::io::executor::{ExecError, ShellExecutor};
use crate::io::log_sink::{Console, Logger};
use crate::io::signal::{ProcessSignaller, Signaller, drain_and_kill};
use crate::io::workspace::QuickPaths;

/// Returned by [`Session::execute_pid`] when no process was started.
pub const SPAWN_FAILED_PID: i32 = -1;

pub struct Session<S: Signaller = ProcessSignaller> {
    workdir: PathBuf,
    logger: Logger,
    registry: ProcessRegistry,
    executor: ShellExecutor,
    signaller: S,
    /// Started and not yet reaped, killed ones included.
    children: Vec<Child>,
}

impl Session<ProcessSignaller> {
    /// Start a session in `directory` that reports to the real stdout/stderr.
    pub fn init(directory: &Path, config: &SessionConfig) -> Self {
        Self::init_with(directory, config, Console::stdio(), ProcessSignaller)
    }
}

impl<S: Signaller> Session<S> {
    /// Change the process working directory to `directory`, then [`Session::bind`] to it.
    ///
    /// A directory that cannot be entered is traced and the session carries on.
    #[instrument(skip_all, fields(directory = %directory.display()))]
    pub fn init_with(
        directory: &Path,
        config: &SessionConfig,
        console: Console,
        signaller: S,
    ) -> Self {
        let workdir = std::path::absolute(directory).unwrap_or_else(|_| directory.to_path_buf());
        if let Err(err) = env::set_current_dir(&workdir) {
            warn!(err = %err, "could not change working directory");
        }
        Self::bind(&workdir, config, console, signaller)
    }

    /// Open (truncate) the command log in `directory` and start with nothing
    /// tracked. Leaves the process working directory alone; commands still
    /// run in `directory`.
    ///
    /// Never fails: a log that cannot be opened is reported and replaced by
    /// the stderr fallback.
    pub fn bind(directory: &Path, config: &SessionConfig, console: Console, signaller: S) -> Self {
        let workdir = std::path::absolute(directory).unwrap_or_else(|_| directory.to_path_buf());
        let paths = QuickPaths::new(&workdir, config);
        let logger = match Logger::open(&paths.log_path, console.clone()) {
            Ok(logger) => {
                logger.log(BEGIN_LOGGING);
                logger
            }
            Err(err) => {
                warn!(err = %err, path = %paths.log_path.display(), "could not open command log");
                let logger = Logger::absent(config.log_file.clone(), console);
                logger.report_error(format_args!(
                    "Unable to open {} in {}",
                    config.log_file,
                    directory.display()
                ));
                logger
            }
        };

        info!(log_open = logger.is_open(), "session initialized");
        Self {
            executor: ShellExecutor::from_config(&workdir, config),
            workdir,
            logger,
            registry: ProcessRegistry::new(),
            signaller,
            children: Vec::new(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Tracked pids, most recently started first.
    pub fn tracked(&self) -> Vec<u32> {
        self.registry.iter().collect()
    }

    /// Start `command` and track its pid. Returns without waiting for output.
    ///
    /// Failures are reported through the log before being returned; on error
    /// nothing is tracked.
    #[instrument(skip(self))]
    pub fn execute(&mut self, command: &str) -> Result<u32, ExecError> {
        self.reap_finished();
        let child = match self.executor.spawn(command, &self.logger) {
            Ok(child) => child,
            Err(err) => {
                error!(err = ?err, "failed to start command");
                self.logger.report_error(&err);
                return Err(err);
            }
        };
        let pid = child.id();
        self.children.push(child);

        if let Err(err) = self.registry.push(pid) {
            // An untracked child could never be killed later.
            if let Err(kill_err) = self.signaller.kill(pid) {
                warn!(pid, err = %format!("{kill_err:#}"), "failed to stop untracked child");
            }
            let err = ExecError::from(err);
            error!(err = %err, "failed to track command");
            self.logger.report_error(&err);
            return Err(err);
        }

        info!(pid, tracked = self.registry.len(), "command started");
        Ok(pid)
    }

    /// [`Session::execute`] shaped for hosts that expect a raw pid, with
    /// [`SPAWN_FAILED_PID`] standing in for any failure.
    pub fn execute_pid(&mut self, command: &str) -> i32 {
        match self.execute(command) {
            // The executor refuses children whose pid does not fit.
            Ok(pid) => i32::try_from(pid).unwrap_or(SPAWN_FAILED_PID),
            Err(_) => SPAWN_FAILED_PID,
        }
    }

    /// Reap every child that has exited and stop tracking it.
    ///
    /// Returns how many were reaped. Never blocks.
    pub fn reap_finished(&mut self) -> usize {
        let before = self.children.len();
        let registry = &mut self.registry;
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                registry.remove(child.id());
                debug!(pid = child.id(), exit_code = ?status.code(), "command finished");
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!(pid = child.id(), err = %err, "failed to poll command");
                true
            }
        });
        before - self.children.len()
    }

    /// Kill every running tracked child and keep the session open for more
    /// commands. Children that already exited are reaped, not signaled.
    pub fn kill_all(&mut self) -> usize {
        self.reap_finished();
        let killed = drain_and_kill(&mut self.registry, &self.signaller, &self.logger);
        info!(killed, "killed all tracked processes");
        killed
    }

    /// Block until every started command has exited, so the log holds each
    /// one's complete record. Killed commands are reaped here too.
    ///
    /// Returns the number of processes waited on. Commands that never finish
    /// keep this from returning.
    pub fn wait_idle(&mut self) -> usize {
        let children = mem::take(&mut self.children);
        let count = children.len();
        for mut child in children {
            let pid = child.id();
            match child.wait() {
                Ok(status) => debug!(pid, exit_code = ?status.code(), "command finished"),
                Err(err) => warn!(pid, err = %err, "failed to wait for command"),
            }
            self.registry.remove(pid);
        }
        count
    }

    /// Route an error message from the embedding host into the error report.
    pub fn report_error_external(&self, message: &str) {
        self.logger.report_error_external(message);
    }

    /// Close the log and stop tracking children without signaling them.
    ///
    /// Running commands keep writing to the log file after this returns, and
    /// after the calling process exits.
    #[instrument(skip_all)]
    pub fn teardown(self) {
        let Self {
            logger,
            mut registry,
            ..
        } = self;
        close_log(logger);
        let released = registry.drain();
        info!(released, "released tracked processes");
    }

    /// Kill every tracked child, close the log, then kill the process group.
    ///
    /// With [`ProcessSignaller`] this does not return: the calling process is
    /// part of the group. An `Err` means the group signal could not be sent.
    #[instrument(skip_all)]
    pub fn teardown_and_kill(mut self) -> Result<()> {
        self.reap_finished();
        let Self {
            logger,
            mut registry,
            signaller,
            ..
        } = self;
        let killed = drain_and_kill(&mut registry, &signaller, &logger);
        info!(killed, "killed tracked processes before group kill");
        close_log(logger);
        signaller.kill_group()
    }
}

fn close_log(logger: Logger) {
    if logger.is_open() {
        logger.log(DONE_LOGGING);
    }
    logger.close();
}
