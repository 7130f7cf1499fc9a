//! Viewer control channel: line-delimited JSON over TCP or a Unix socket.

pub mod protocol;
pub mod server;

pub use server::{ControlEndpoint, ControlMsg, ControlServer};
