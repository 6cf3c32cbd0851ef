//! Domain model and pure state machines for the remosh client.
//!
//! Everything in this crate is synchronous and I/O-free: job and
//! artifact types, the in-memory job registry, the timeline selection
//! engine, the session/history model, and the filename/identifier
//! conventions shared with the backend. The async layers (`remosh-push`,
//! `remosh-api`, `remosh-engine`) build on top of these.

pub mod history;
pub mod job;
pub mod naming;
pub mod project;
pub mod registry;
pub mod selection;
pub mod types;
