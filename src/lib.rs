//! This crate simulates the Windows dynamic linking procedures `LoadLibraryA`, `LoadLibraryExW`
//! and `GetProcAddress` for a process emulated by a symbolic execution engine.
//!
//! ### Execution state
//!
//! Every execution path owns an [state::ExecutionState] holding its memory, the modules it has
//! loaded and the procedures it has resolved. Forked paths clone the state, so loading decisions
//! made on one path are never observed by another.
//!
//! ### Loading
//!
//! The [loader::DynamicLoader] delegates mapping images to an [image::BinaryLoader] and registers
//! the resulting modules with the state. The [loader::InstrumentationHook] is notified for every
//! newly mapped image so that hosts can install simulated routines.
//!
//! ### Resolution
//!
//! The [resolver::ProcAddressResolver] looks up exports by name or ordinal. Symbolic module handles
//! are rejected with [error::Error::SymbolicHandle] so that the host can decide how to proceed.
//!
//! The [win32::DynamicLinkingApi] wraps both behind the emulated call entry points.

/// Policies for module names and procedure queries.
pub mod config;

pub mod error;

/// Images mapped by the binary loader and the loader interface.
pub mod image;

/// Loading modules into execution states.
pub mod loader;

/// Reading strings and values from emulated memory.
pub mod mem;

/// Loaded modules and the per-state module store.
pub mod module;

pub mod resolver;

pub mod state;

/// Exported symbol tables.
pub mod symbols;

/// Emulated call entry points.
pub mod win32;

pub use error::{Error, Result};

#[cfg(test)]
mod test_fixture;
