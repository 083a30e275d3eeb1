//! Starting shell commands whose combined output is captured in the command log.
//!
//! Each command runs as `<shell> -c CAPTURE_SCRIPT` in a process group of its
//! own. That shell is the child entry point: it writes the header record, runs
//! the command with stderr folded into stdout, and writes the footer record,
//! all through a duplicate of the log's file handle. Nothing in the calling
//! process sits between the command and the log, so capture continues after
//! the caller exits. The caller gets the [`Child`] back immediately and owns
//! reaping it.

use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::command::{CAPTURE_SCRIPT, combined_command, output_footer, output_header, record};
use crate::core::registry::RegistryError;
use crate::io::config::SessionConfig;
use crate::io::log_sink::Logger;

#[derive(Debug, Error)]
pub enum ExecError {
    /// No new process could be created.
    #[error("Cannot fork.")]
    Spawn(#[source] io::Error),
    /// The shell producing the combined output stream could not be started.
    #[error("Unable to create output stream for '{command}'.")]
    Stream {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The child started but could not be tracked.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Starts commands through a shell in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: PathBuf,
    workdir: PathBuf,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            workdir: workdir.into(),
        }
    }

    pub fn from_config(workdir: impl Into<PathBuf>, config: &SessionConfig) -> Self {
        Self::new(config.shell.clone(), workdir)
    }

    /// Start `command` with its output going to `logger`'s file.
    ///
    /// Returns as soon as the process exists. The command string reaches the
    /// shell verbatim. The returned child leads its own process group.
    #[instrument(skip(self, logger), fields(shell = %self.shell.display()))]
    pub fn spawn(&self, command: &str, logger: &Logger) -> Result<Child, ExecError> {
        let (stdout, stderr) = output_stdio(logger).map_err(|source| ExecError::Stream {
            command: command.to_string(),
            source,
        })?;

        let mut shell = Command::new(&self.shell);
        shell
            .arg("-c")
            .arg(CAPTURE_SCRIPT)
            .arg("quickcmd")
            .arg(record(&output_header(command)))
            .arg(combined_command(command))
            .arg(record(&output_footer(command)))
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        own_process_group(&mut shell);

        let mut child = shell
            .spawn()
            .map_err(|source| spawn_error(command, source))?;
        if let Err(source) = signal_pid(child.id()) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Spawn(source));
        }

        debug!(pid = child.id(), "command started");
        Ok(child)
    }
}

/// Signals address pids as `i32`; a child outside that range could never be killed.
pub fn signal_pid(pid: u32) -> io::Result<i32> {
    i32::try_from(pid).map_err(|_| io::Error::other(format!("pid {pid} out of signal range")))
}

/// Both output streams of the child. Without a log they go to our stderr,
/// where the logger's own fallback writes too.
fn output_stdio(logger: &Logger) -> io::Result<(Stdio, Stdio)> {
    match logger.output_file()? {
        Some(file) => Ok((Stdio::from(file.try_clone()?), Stdio::from(file))),
        None => Ok((Stdio::from(io::stderr()), Stdio::from(io::stderr()))),
    }
}

/// One group per command, led by its shell, so a single signal reaches every
/// process the command started.
#[cfg(unix)]
fn own_process_group(shell: &mut Command) {
    use std::os::unix::process::CommandExt;
    shell.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_shell: &mut Command) {}

fn spawn_error(command: &str, source: io::Error) -> ExecError {
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ExecError::Stream {
            command: command.to_string(),
            source,
        },
        _ => ExecError::Spawn(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureConsole;
    use std::fs;

    fn logger_in(dir: &std::path::Path) -> Logger {
        Logger::open(&dir.join("log.txt"), CaptureConsole::new().console()).expect("open")
    }

    #[test]
    fn captures_stdout_between_header_and_footer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::from_config(temp.path(), &SessionConfig::default());

        let mut child = executor.spawn("echo hello", &logger).expect("spawn");
        assert!(child.id() > 0);
        child.wait().expect("wait");

        let log = fs::read_to_string(temp.path().join("log.txt")).expect("read");
        assert_eq!(
            log,
            "Output for 'echo hello':\n\nhello\n\nEnd of output of 'echo hello'.\n\n"
        );
    }

    #[test]
    fn stderr_is_folded_into_the_capture() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::from_config(temp.path(), &SessionConfig::default());

        let mut child = executor
            .spawn("{ echo out; echo err 1>&2; }", &logger)
            .expect("spawn");
        child.wait().expect("wait");

        let log = fs::read_to_string(temp.path().join("log.txt")).expect("read");
        assert!(log.contains("out\n"), "log: {log}");
        assert!(log.contains("err\n"), "log: {log}");
    }

    #[test]
    fn exit_inside_command_still_writes_footer() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::from_config(temp.path(), &SessionConfig::default());

        let mut child = executor.spawn("echo before; exit 3", &logger).expect("spawn");
        child.wait().expect("wait");

        let log = fs::read_to_string(temp.path().join("log.txt")).expect("read");
        assert_eq!(
            log,
            "Output for 'echo before; exit 3':\n\nbefore\n\nEnd of output of 'echo before; exit 3'.\n\n"
        );
    }

    #[test]
    fn malformed_command_is_reported_inside_its_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::from_config(temp.path(), &SessionConfig::default());

        let mut child = executor.spawn("echo 'unterminated", &logger).expect("spawn");
        child.wait().expect("wait");

        let log = fs::read_to_string(temp.path().join("log.txt")).expect("read");
        assert!(log.starts_with("Output for 'echo 'unterminated':\n\n"), "log: {log}");
        assert!(log.ends_with("End of output of 'echo 'unterminated'.\n\n"), "log: {log}");
        assert!(!log.contains("\nunterminated"), "log: {log}");
    }

    #[test]
    fn runs_in_the_configured_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("marker.txt"), "found me").expect("write marker");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::from_config(temp.path(), &SessionConfig::default());

        let mut child = executor.spawn("cat marker.txt", &logger).expect("spawn");
        child.wait().expect("wait");

        let log = fs::read_to_string(temp.path().join("log.txt")).expect("read");
        assert!(log.contains("found me"));
    }

    #[test]
    fn missing_shell_is_a_stream_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let logger = logger_in(temp.path());
        let executor = ShellExecutor::new(temp.path().join("no-such-shell"), temp.path());

        let err = executor.spawn("echo hi", &logger).expect_err("no shell");
        assert!(matches!(err, ExecError::Stream { .. }));
        assert_eq!(err.to_string(), "Unable to create output stream for 'echo hi'.");
    }

    #[test]
    fn pids_beyond_signal_range_are_rejected() {
        assert_eq!(signal_pid(4242).expect("in range"), 4242);
        assert!(signal_pid(u32::MAX).is_err());
    }
}
