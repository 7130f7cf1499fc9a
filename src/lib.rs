//! roomtag session library.
//!
//! The binary in `main.rs` wires these pieces to a control socket; the
//! library surface exists so integration tests can drive a full session
//! in-process.

pub mod config;
pub mod control;
pub mod session;
pub mod signals;
