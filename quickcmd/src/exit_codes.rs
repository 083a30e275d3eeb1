//! Stable exit codes for quickcmd CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid settings, unreadable files, or other errors.
pub const INVALID: i32 = 1;
/// At least one command could not be started.
pub const SPAWN_FAILED: i32 = 2;
/// `quickcmd run` named a title that is not in the catalog.
pub const UNKNOWN_ENTRY: i32 = 3;
