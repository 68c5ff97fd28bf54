//! Queue job payload.

use serde::{Deserialize, Serialize};

/// A transient reference to a call record awaiting processing.
///
/// Deliberately minimal: all mutable state lives on the record, so a
/// lost or duplicated message risks a redundant claim attempt, never
/// data loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// ID of the call record to process
    pub call_id: String,
}

impl Job {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
        }
    }
}
