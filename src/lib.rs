//! Core of an interactive source-level debugger for x86-64 Linux
//! executables: process tracing, breakpoints, stepping, and DWARF/ELF
//! symbol resolution. This crate has no user interface of its own; it
//! exposes the verbs a REPL or other front end drives.

#[macro_use]
pub mod log;

pub mod debugger;

pub use debugger::config::Config;
pub use debugger::error::Error;
pub use debugger::Debugger;
