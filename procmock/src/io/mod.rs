//! Targets wrapping real process and console side effects, plus config I/O.

pub mod config;
pub mod console;
pub mod process;
