//! REST client for the mosh backend HTTP API.
//!
//! All pull-side state (projects, clips, sessions, scenes, timelines)
//! and all mutating actions (upload, mosh, convert, delete) go through
//! [`client::BackendClient`]. Push-side progress arrives separately
//! over the WebSocket channel.

pub mod client;
pub mod types;

pub use client::{ApiError, BackendClient};
