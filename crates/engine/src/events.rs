//! Engine-level events broadcast to the UI.
//!
//! Fan-out uses a [`tokio::sync::broadcast`] channel so any number of
//! views can subscribe. Publishing never blocks; subscribers that fall
//! behind lose the oldest events, which is fine because every event is
//! a "re-read the state" hint rather than a data carrier.

use tokio::sync::broadcast;

use remosh_core::job::ConvertFormat;

/// Broadcast channel capacity for UI events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications emitted by the engine.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// The push connection came up or went down.
    ConnectionChanged { connected: bool },

    /// Job registry contents changed; refresh any progress display.
    JobsChanged,

    /// Every generation job of the current batch reached a terminal
    /// state and the settle delay elapsed.
    BatchFinished,

    /// The mosh history changed (new artifact, deletion, or refreshed
    /// converted-file availability).
    HistoryChanged,

    /// Progress for an artifact conversion.
    ConversionProgress {
        artifact_id: String,
        format: ConvertFormat,
        progress: f64,
    },

    /// A conversion finished (either way) and its availability has
    /// been rechecked against the backend.
    ConversionFinished {
        artifact_id: String,
        format: ConvertFormat,
        succeeded: bool,
    },

    /// Project-level state (project, clips, scenes, timeline) was
    /// reloaded or mutated.
    ProjectChanged,
}

/// Cloneable handle for publishing and subscribing to [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Silently drops it when nobody subscribes.
    pub fn publish(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
