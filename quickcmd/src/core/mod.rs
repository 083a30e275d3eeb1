//! Pure logic with no I/O: the pid stack, log record text, and catalog parsing.

pub mod catalog;
pub mod command;
pub mod registry;
