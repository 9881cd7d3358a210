//! Peer side: one connection to the hub and a directory of participants.

pub mod client;
pub mod client_error;
pub mod directory;
pub mod signaling_client;

pub use client::Client;
pub use client_error::ClientError;
pub use directory::Directory;
pub use signaling_client::{SignalingClient, run_client};
