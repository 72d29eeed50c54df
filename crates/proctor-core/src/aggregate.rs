//! Session Aggregate: the repository contract and an in-memory implementation.
//!
//! Repositories take explicit timestamps and never read a clock. Append is the
//! sole ordering authority for a session's log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::warn;
use uuid::Uuid;

use crate::error::{AggregateError, Result};
use crate::session::{Event, NewEvent, Session, SessionSummary};

/// Storage for sessions and their event logs.
///
/// Appends to one session are serialized; operations on different sessions
/// do not contend.
pub trait SessionRepository: Send + Sync {
    /// Allocate a session starting at `start_time` with an empty log.
    fn create(&self, candidate_name: &str, start_time: u64) -> Result<Session>;

    /// Append to the end of the session's log.
    fn append(&self, session_id: Uuid, event: NewEvent) -> Result<Event>;

    /// Stamp the end time and recording reference.
    ///
    /// The first call wins; later calls leave the session unchanged and
    /// return it as stored.
    fn finalize(&self, session_id: Uuid, recording_ref: &str, end_time: u64) -> Result<Session>;

    /// The session with its events in log order.
    fn get(&self, session_id: Uuid) -> Result<Session>;

    /// All sessions, newest start first.
    fn list(&self) -> Result<Vec<SessionSummary>>;

    /// Remove the session and every event it owns.
    fn delete(&self, session_id: Uuid) -> Result<()>;
}

/// Order summaries newest-first; ties break on id so listings are stable.
pub fn sort_summaries(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Applies finalize to a loaded session. Returns whether it changed.
///
/// An empty recording reference is stored as no recording.
pub fn apply_finalize(session: &mut Session, recording_ref: &str, end_time: u64) -> bool {
    if session.is_finalized() {
        warn!(
            session = %session.id,
            "finalize called on an already finalized session, keeping the first end time"
        );
        return false;
    }
    session.end_time = Some(end_time);
    session.recording_url = Some(recording_ref)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    true
}

type Slot = Arc<Mutex<Session>>;

/// Process-local repository. Each session sits behind its own mutex; the
/// outer map lock is held only long enough to find the slot.
#[derive(Default)]
pub struct MemoryRepository {
    sessions: RwLock<HashMap<Uuid, Slot>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: Uuid) -> Result<Slot> {
        let map = self.sessions.read().map_err(poisoned)?;
        map.get(&id).cloned().ok_or(AggregateError::NotFound(id))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AggregateError {
    AggregateError::Backend("lock poisoned".to_string())
}

impl SessionRepository for MemoryRepository {
    fn create(&self, candidate_name: &str, start_time: u64) -> Result<Session> {
        let session = Session::new(candidate_name, start_time);
        let mut map = self.sessions.write().map_err(poisoned)?;
        map.insert(session.id, Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    fn append(&self, session_id: Uuid, event: NewEvent) -> Result<Event> {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().map_err(poisoned)?;
        let event = event.into_event(&session);
        session.events.push(event.clone());
        Ok(event)
    }

    fn finalize(&self, session_id: Uuid, recording_ref: &str, end_time: u64) -> Result<Session> {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().map_err(poisoned)?;
        apply_finalize(&mut session, recording_ref, end_time);
        Ok(session.clone())
    }

    fn get(&self, session_id: Uuid) -> Result<Session> {
        let slot = self.slot(session_id)?;
        let session = slot.lock().map_err(poisoned)?;
        Ok(session.clone())
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let slots: Vec<Slot> = {
            let map = self.sessions.read().map_err(poisoned)?;
            map.values().cloned().collect()
        };
        let mut out = slots
            .iter()
            .map(|slot| slot.lock().map(|s| s.summary()).map_err(poisoned))
            .collect::<Result<Vec<_>>>()?;
        sort_summaries(&mut out);
        Ok(out)
    }

    fn delete(&self, session_id: Uuid) -> Result<()> {
        let mut map = self.sessions.write().map_err(poisoned)?;
        map.remove(&session_id)
            .map(|_| ())
            .ok_or(AggregateError::NotFound(session_id))
    }
}
