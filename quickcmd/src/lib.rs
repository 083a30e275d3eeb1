//! Fire-and-forget shell commands with their output captured in a log.
//!
//! A [`session::Session`] binds a working directory, opens the command log
//! there and tracks every child it starts so they can later be released or
//! killed together. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure logic (pid registry, log record text, catalog parsing).
//! - **[`io`]**: Side effects (log file, process spawning, signals, settings).
//!
//! [`session`] ties the two together; [`interactive`] is the line-driven
//! front end used by the `quickcmd shell` command.

pub mod core;
pub mod exit_codes;
pub mod interactive;
pub mod io;
pub mod logging;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
