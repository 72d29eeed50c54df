//! Session and event records.
//!
//! Timestamps are Unix milliseconds. Events are immutable once appended and
//! live in their session's log in arrival order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One monitored interview and its append-only event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub candidate_name: String,
    pub start_time: u64,
    /// Set once by finalize.
    pub end_time: Option<u64>,
    /// Stored placeholder; the computed score supersedes it on read.
    pub integrity_score: u32,
    /// Set once by finalize.
    pub recording_url: Option<String>,
    pub events: Vec<Event>,
}

impl Session {
    pub fn new(candidate_name: impl Into<String>, start_time: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_name: candidate_name.into(),
            start_time,
            end_time: None,
            integrity_score: crate::constants::DEFAULT_SCORE,
            recording_url: None,
            events: Vec::new(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            candidate_name: self.candidate_name.clone(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            candidate_name: self.candidate_name.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            integrity_score: self.integrity_score,
            recording_url: self.recording_url.clone(),
            event_count: self.events.len(),
        }
    }

    /// Event labels in log order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.event_type.as_str())
    }
}

/// A recorded occurrence. The candidate name is a denormalized copy of the
/// owning session's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub session_id: Uuid,
    pub candidate_name: String,
    pub event_type: String,
    pub timestamp: u64,
}

/// Event as submitted for append, before the aggregate assigns identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    pub event_type: String,
    pub timestamp: u64,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, timestamp: u64) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
        }
    }

    pub(crate) fn into_event(self, session: &Session) -> Event {
        Event {
            id: Uuid::new_v4(),
            session_id: session.id,
            candidate_name: session.candidate_name.clone(),
            event_type: self.event_type,
            timestamp: self.timestamp,
        }
    }
}

/// Listing row for a session, without its events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub candidate_name: String,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub integrity_score: u32,
    pub recording_url: Option<String>,
    pub event_count: usize,
}

/// Explicit reference to the session a monitor reports into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    pub id: Uuid,
    pub candidate_name: String,
}
