//! State reconciliation engine.
//!
//! Sits between the push channel, the REST client, and the UI: push
//! messages are folded into the in-memory job registry by a pure
//! reconciliation step, the resulting effects (history pulls,
//! converted-file rechecks, display refreshes) are executed against
//! the backend, and the UI is notified over a broadcast bus.

pub mod actions;
pub mod conversions;
pub mod driver;
pub mod events;
pub mod reconcile;
pub mod workspace;

pub use actions::ActionError;
pub use driver::Engine;
pub use events::{EventBus, UiEvent};
pub use workspace::ProjectWorkspace;
