//! Side-effecting helpers: the command log, process spawning, signals and files.

pub mod config;
pub mod executor;
pub mod log_sink;
pub mod signal;
pub mod workspace;
