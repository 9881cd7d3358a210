//! The rendezvous hub: id authority, introduction fan-out and frame relay.

pub mod hub;
pub mod hub_error;
pub mod hub_event;
pub mod hub_server;
pub mod listener;
pub mod participant_table;

pub use hub::{Hub, Outgoing};
pub use hub_error::HubError;
pub use hub_event::HubEvent;
pub use hub_server::run_hub;
pub use listener::Listener;
pub use participant_table::{ParticipantEntry, ParticipantTable, SessionKey};
