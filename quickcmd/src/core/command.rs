//! Text produced around a captured command.
//!
//! Every record in the command log ends with a blank line. Output bytes are
//! written raw between a header and footer record.

/// Suffix that folds a command's stderr into its stdout.
pub const COMBINE_STREAMS: &str = " 2>&1";

/// Marker that prefixes every reported error.
pub const ERROR_MARKER: &str = "*****Error: ";

pub const BEGIN_LOGGING: &str = "Begin logging.";
pub const DONE_LOGGING: &str = "Done logging.";

/// Shell program every captured command runs under.
///
/// Positional arguments: `$1` header record, `$2` command text, `$3` footer
/// record. The command is evaluated in a subshell, so an `exit` or a syntax
/// error inside it still leaves the footer to be written.
pub const CAPTURE_SCRIPT: &str = r#"printf '%s' "$1"; ( quickcmd_command=$2; shift 3; eval "$quickcmd_command" ); printf '%s' "$3""#;

/// Shell text that runs `command` with stderr redirected into stdout.
///
/// The command is passed through verbatim; no quoting or validation happens here.
pub fn combined_command(command: &str) -> String {
    format!("{command}{COMBINE_STREAMS}")
}

/// Terminate a log message as a record (message + blank line).
pub fn record(message: &str) -> String {
    format!("{message}\n\n")
}

pub fn error_record(message: &str) -> String {
    record(&format!("{ERROR_MARKER}{message}"))
}

pub fn output_header(command: &str) -> String {
    format!("Output for '{command}':")
}

/// Footer message; the leading newline closes output that lacked a trailing one.
pub fn output_footer(command: &str) -> String {
    format!("\nEnd of output of '{command}'.")
}

pub fn killed(pid: u32) -> String {
    format!("Killed process: {pid}")
}

pub fn external_error(message: &str) -> String {
    format!("{message} from host\n")
}
