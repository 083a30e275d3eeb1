//! The command log and the console fallbacks around it.
//!
//! The log file is the product artifact of a session: every started command
//! leaves a header, its raw combined output and a footer there. It is
//! unrelated to the `tracing` diagnostics configured in [`crate::logging`].
//!
//! Nothing in this module returns an error. Reporting is a diagnostic path, so
//! I/O failures are traced and otherwise swallowed.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::core::command::{error_record, external_error, record};

pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Standard output and standard error, swappable so tests can capture them.
#[derive(Clone)]
pub struct Console {
    out: SharedWriter,
    err: SharedWriter,
}

impl Console {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            err: Arc::new(Mutex::new(Box::new(err))),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

type Sink = Arc<Mutex<BufWriter<File>>>;

/// Handle to the command log. Clones share the same open file.
#[derive(Clone)]
pub struct Logger {
    sink: Option<Sink>,
    sink_name: String,
    console: Console,
}

impl Logger {
    /// Create (or truncate) the log file at `path`.
    pub fn open(path: &Path, console: Console) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        debug!(path = %path.display(), "opened command log");
        Ok(Self {
            sink: Some(Arc::new(Mutex::new(BufWriter::new(file)))),
            sink_name: display_name(path),
            console,
        })
    }

    /// A logger with no sink; every record goes to the stderr fallback.
    pub fn absent(sink_name: impl Into<String>, console: Console) -> Self {
        Self {
            sink: None,
            sink_name: sink_name.into(),
            console,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    /// Append `message` as a record and flush.
    ///
    /// Without a sink the record is written to stderr behind a note saying the
    /// log could not be written.
    pub fn log(&self, message: impl fmt::Display) {
        let text = record(&message.to_string());
        match &self.sink {
            Some(sink) => {
                if let Err(err) = write_flushed(sink, text.as_bytes()) {
                    warn!(err = %err, log = %self.sink_name, "failed to append log record");
                }
            }
            None => {
                let fallback = format!(
                    "Unable to write to {}.\nTry to write:\n{text}",
                    self.sink_name
                );
                write_console(&self.console.err, fallback.as_bytes());
            }
        }
    }

    /// Print an error record to stdout, and also to the log when it is open.
    pub fn report_error(&self, message: impl fmt::Display) {
        let text = error_record(&message.to_string());
        write_console(&self.console.out, text.as_bytes());
        if let Some(sink) = &self.sink
            && let Err(err) = write_flushed(sink, text.as_bytes())
        {
            warn!(err = %err, log = %self.sink_name, "failed to append error record");
        }
    }

    /// Report a plain message that came from the embedding host.
    pub fn report_error_external(&self, message: &str) {
        self.report_error(external_error(message));
    }

    /// A second handle on the log file for a child process to write through.
    ///
    /// Pending records are flushed first. The handle shares the file offset
    /// with this logger, so records and child output append in the order they
    /// are written. `None` when there is no sink.
    pub fn output_file(&self) -> io::Result<Option<File>> {
        let Some(sink) = &self.sink else {
            return Ok(None);
        };
        let mut writer = sink
            .lock()
            .map_err(|_| io::Error::other("command log lock poisoned"))?;
        writer.flush()?;
        writer.get_ref().try_clone().map(Some)
    }

    /// Flush and release this handle. Other clones stay usable and the file
    /// closes once the last one is gone; child processes keep their own handle.
    pub fn close(self) {
        if let Some(sink) = &self.sink
            && let Ok(mut writer) = sink.lock()
            && let Err(err) = writer.flush()
        {
            warn!(err = %err, log = %self.sink_name, "failed to flush command log");
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink_name", &self.sink_name)
            .field("open", &self.is_open())
            .finish()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_flushed(sink: &Sink, bytes: &[u8]) -> io::Result<()> {
    let mut writer = sink
        .lock()
        .map_err(|_| io::Error::other("command log lock poisoned"))?;
    writer.write_all(bytes)?;
    writer.flush()
}

fn write_console(writer: &SharedWriter, bytes: &[u8]) {
    if let Ok(mut writer) = writer.lock() {
        // Console failures have nowhere left to go.
        let _ = writer.write_all(bytes);
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CaptureConsole;
    use std::fs;

    #[test]
    fn log_appends_records_to_sink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("command_exec_log.txt");
        let capture = CaptureConsole::new();
        let logger = Logger::open(&path, capture.console()).expect("open");

        logger.log("Begin logging.");
        logger.log(format_args!("Killed process: {}", 42));

        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "Begin logging.\n\nKilled process: 42\n\n");
        assert!(capture.stderr().is_empty());
    }

    #[test]
    fn open_truncates_previous_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("log.txt");
        fs::write(&path, "stale contents").expect("seed");

        let logger = Logger::open(&path, CaptureConsole::new().console()).expect("open");
        logger.log("fresh");

        assert_eq!(fs::read_to_string(&path).expect("read"), "fresh\n\n");
    }

    #[test]
    fn absent_sink_falls_back_to_stderr() {
        let capture = CaptureConsole::new();
        let logger = Logger::absent("command_exec_log.txt", capture.console());

        logger.log("first");
        logger.log("second");

        let stderr = capture.stderr();
        assert_eq!(
            stderr,
            "Unable to write to command_exec_log.txt.\nTry to write:\nfirst\n\n\
             Unable to write to command_exec_log.txt.\nTry to write:\nsecond\n\n"
        );
        assert!(capture.stdout().is_empty());
    }

    #[test]
    fn report_error_goes_to_stdout_and_sink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("log.txt");
        let capture = CaptureConsole::new();
        let logger = Logger::open(&path, capture.console()).expect("open");

        logger.report_error("Cannot fork.");

        assert_eq!(capture.stdout(), "*****Error: Cannot fork.\n\n");
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "*****Error: Cannot fork.\n\n"
        );
    }

    #[test]
    fn report_error_without_sink_still_prints() {
        let capture = CaptureConsole::new();
        let logger = Logger::absent("log.txt", capture.console());

        logger.report_error("boom");

        assert_eq!(capture.stdout(), "*****Error: boom\n\n");
        assert!(capture.stderr().is_empty());
    }

    #[test]
    fn external_errors_are_marked() {
        let capture = CaptureConsole::new();
        let logger = Logger::absent("log.txt", capture.console());

        logger.report_error_external("config missing");

        assert_eq!(capture.stdout(), "*****Error: config missing from host\n\n\n");
    }

    #[test]
    fn output_file_appends_after_pending_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("log.txt");
        let capture = CaptureConsole::new();
        let logger = Logger::open(&path, capture.console()).expect("open");

        logger.log("header");
        let mut child_side = logger.output_file().expect("clone").expect("open sink");
        child_side.write_all(b"raw output\n").expect("child write");
        logger.log("footer");

        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "header\n\nraw output\nfooter\n\n"
        );
    }

    #[test]
    fn output_file_is_none_without_sink() {
        let logger = Logger::absent("log.txt", CaptureConsole::new().console());
        assert!(logger.output_file().expect("no error").is_none());
    }

    #[test]
    fn clones_share_the_sink_after_close() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("log.txt");
        let logger = Logger::open(&path, CaptureConsole::new().console()).expect("open");
        let other = logger.clone();

        logger.log("Done logging.");
        logger.close();
        other.log("late record");

        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "Done logging.\n\nlate record\n\n"
        );
    }
}
