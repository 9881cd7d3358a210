//! Meshsignal bootstraps multi-party real-time sessions.
//!
//! Peers connect to a rendezvous hub over TCP, get an id, are introduced to
//! every other participant, and exchange codecs and connectivity candidates
//! through the hub before media transport (out of scope here) starts.
//!
//! It provides two binaries:
//! - `signaling_hub`: the hub, authority for ids and relay between peers.
//! - `signaling_peer`: a peer joining a hub.

/// Client side: hub connection plus participant directory.
pub mod client;
/// Handles configuration loading and management.
pub mod config;
/// One framed signaling socket.
pub mod connection;
/// The rendezvous hub.
pub mod hub;
/// Logging utilities for the application.
pub mod log;
/// Per-participant handlers (the seam to the media layer).
pub mod participant;
/// Wire format: frames, message kinds and payload records.
pub mod protocol;
