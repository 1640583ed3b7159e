//! The per-workflow session record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::events::EventHub;
use crate::model::FileUnit;

/// Server-side record of one background workflow run.
///
/// Lifecycle: created → running (events accumulate on the hub) → finished
/// (result or error set) → consumed (deleted when the result is served).
#[derive(Debug)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    /// When the run finished, successfully or not. Drives result expiry.
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the run aborted; served once by the result endpoint.
    pub error: Option<String>,
    /// Flat output list, set when the run completed successfully.
    pub result: Option<Vec<FileUnit>>,
    /// Broadcast point every progress subscriber attaches to.
    pub hub: Arc<EventHub>,
}

impl WorkflowSession {
    pub fn new(id: Uuid, hub: Arc<EventHub>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            finished: false,
            finished_at: None,
            error: None,
            result: None,
            hub,
        }
    }

    /// Read-only snapshot served by the progress endpoint.
    #[must_use]
    pub fn progress(&self) -> ProgressReport {
        ProgressReport {
            created_at: self.created_at,
            finished: self.finished,
            failed: self.error.is_some(),
        }
    }
}

/// Point-in-time view of a session's lifecycle.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    pub failed: bool,
}
