//! Shared primitive aliases.

/// Opaque backend job identifier (e.g. `"single_1749018199"`, `"batch_0"`).
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
