//! spectia is a pure Rust spectator view streaming server for mixed reality
//! applications: a single remote viewer connects over a minimal WebSocket
//! endpoint, sends JSON pose and size requests, and receives a stream of
//! encoded camera snapshots as length-prefixed binary chunks.

pub mod common;

pub mod capture;
pub mod protocol;
pub mod server;

pub mod error;
pub mod types;
