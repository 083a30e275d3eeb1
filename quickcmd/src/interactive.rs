//! Line-driven front end for a session (`quickcmd shell`).
//!
//! Lines starting with `:` control the session; anything else is started as
//! a command. End of input behaves like `:quit`.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::catalog::Catalog;
use crate::io::log_sink::Logger;
use crate::io::signal::Signaller;
use crate::io::workspace::load_catalog;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    List,
    Run(String),
    Jobs,
    Kill,
    Reload,
    Quit,
    Detach,
    QuitAndKill,
    Help,
    Unknown(String),
    Exec(String),
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// Running commands finished, then the session was torn down gracefully.
    Quit,
    /// Torn down gracefully without waiting for running commands.
    Detached,
    /// Destructive teardown returned (only possible when the group signal is not delivered).
    Killed,
}

const HELP: &str = "\
:list           show catalog entries
:run <title>    start the catalog entry with that title
:jobs           show pids of running commands, newest first
:kill           kill every tracked process
:reload         re-read the catalog
:quit           wait for output, then exit (commands keep running)
:detach         exit immediately (commands keep running)
:quit!          kill everything, this shell included
<command>       start a shell command
";

pub fn parse_line(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(directive) = line.strip_prefix(':') else {
        return ShellCommand::Exec(line.to_string());
    };
    let (word, rest) = match directive.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (directive, ""),
    };
    match word {
        "list" => ShellCommand::List,
        "run" if !rest.is_empty() => ShellCommand::Run(rest.to_string()),
        "jobs" => ShellCommand::Jobs,
        "kill" => ShellCommand::Kill,
        "reload" => ShellCommand::Reload,
        "quit" | "q" => ShellCommand::Quit,
        "detach" => ShellCommand::Detach,
        "quit!" | "q!" => ShellCommand::QuitAndKill,
        "help" | "h" => ShellCommand::Help,
        other => ShellCommand::Unknown(other.to_string()),
    }
}

/// Drive `session` from `input` until a quit directive or end of input.
///
/// The session is always consumed by one of its teardown paths before this returns.
pub fn run_shell<S, R, W>(
    mut session: Session<S>,
    catalog_path: &Path,
    input: R,
    out: &mut W,
) -> Result<ShellExit>
where
    S: Signaller,
    R: BufRead,
    W: Write,
{
    let mut catalog = read_catalog(catalog_path, session.logger()).unwrap_or_default();

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                session.wait_idle();
                session.teardown();
                return Err(err).context("read shell input");
            }
        };
        let command = parse_line(&line);
        debug!(?command, "shell input");
        match command {
            ShellCommand::Empty => {}
            ShellCommand::List => write_catalog(out, &catalog)?,
            ShellCommand::Run(title) => match catalog.find(&title) {
                Some(entry) => {
                    let command = entry.command.clone();
                    start(&mut session, &command, out)?;
                }
                None => writeln!(out, "no catalog entry titled {title:?}")?,
            },
            ShellCommand::Jobs => {
                session.reap_finished();
                let tracked = session.tracked();
                if tracked.is_empty() {
                    writeln!(out, "no tracked processes")?;
                }
                for pid in tracked {
                    writeln!(out, "{pid}")?;
                }
            }
            ShellCommand::Kill => {
                let killed = session.kill_all();
                writeln!(out, "killed {killed} process(es)")?;
            }
            ShellCommand::Reload => {
                if let Some(fresh) = read_catalog(catalog_path, session.logger()) {
                    catalog = fresh;
                    writeln!(out, "loaded {} catalog entries", catalog.len())?;
                }
            }
            ShellCommand::Quit => {
                session.wait_idle();
                session.teardown();
                return Ok(ShellExit::Quit);
            }
            ShellCommand::Detach => {
                session.teardown();
                return Ok(ShellExit::Detached);
            }
            ShellCommand::QuitAndKill => {
                out.flush()?;
                session.teardown_and_kill()?;
                return Ok(ShellExit::Killed);
            }
            ShellCommand::Help => out.write_all(HELP.as_bytes())?,
            ShellCommand::Unknown(word) => {
                writeln!(out, "unknown directive :{word} (try :help)")?;
            }
            ShellCommand::Exec(command) => start(&mut session, &command, out)?,
        }
    }

    session.wait_idle();
    session.teardown();
    Ok(ShellExit::Quit)
}

fn start<S: Signaller, W: Write>(session: &mut Session<S>, command: &str, out: &mut W) -> Result<()> {
    // Failures were already reported by the session.
    if let Ok(pid) = session.execute(command) {
        writeln!(out, "[{pid}] {command}")?;
    }
    Ok(())
}

fn read_catalog(path: &Path, logger: &Logger) -> Option<Catalog> {
    match load_catalog(path) {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            logger.report_error(format_args!("{err:#}"));
            None
        }
    }
}

pub fn write_catalog<W: Write>(out: &mut W, catalog: &Catalog) -> Result<()> {
    if catalog.is_empty() {
        writeln!(out, "No commands available")?;
        return Ok(());
    }
    for entry in catalog.entries() {
        writeln!(out, "{}: {}", entry.title, entry.command)?;
    }
    Ok(())
}
