//! WebSocket push channel to the mosh backend.
//!
//! The backend pushes job progress as JSON text frames. This crate owns
//! the connection lifecycle (connect, read, reconnect with backoff) and
//! hands typed [`messages::PushMessage`]s to the engine over an mpsc
//! channel. It never interprets the messages; reconciliation lives in
//! the engine crate.

pub mod backoff;
pub mod channel;
pub mod client;
pub mod messages;

pub use backoff::Backoff;
pub use channel::{run_push_channel, ChannelEvent};
pub use client::{PushClient, PushClientError, PushConnection};
pub use messages::{parse_message, BatchEntry, JobUpdate, PushMessage};
