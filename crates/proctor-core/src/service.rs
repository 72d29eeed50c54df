//! Session lifecycle operations over any repository, timestamped by a clock.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::aggregate::SessionRepository;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::report::SessionReport;
use crate::session::{Event, NewEvent, Session, SessionHandle, SessionSummary};
use crate::time::Clock;

#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &Arc<dyn SessionRepository> {
        &self.repo
    }

    pub fn start(&self, candidate_name: &str) -> Result<Session> {
        let session = self.repo.create(candidate_name, self.clock.now_millis())?;
        info!(session = %session.id, candidate = %session.candidate_name, "session started");
        Ok(session)
    }

    /// Append an event. `timestamp` defaults to now.
    pub fn append_event(
        &self,
        session_id: Uuid,
        event_type: &str,
        timestamp: Option<u64>,
    ) -> Result<Event> {
        let at = timestamp.unwrap_or_else(|| self.clock.now_millis());
        self.repo.append(session_id, NewEvent::new(event_type, at))
    }

    pub fn finalize(&self, session_id: Uuid, recording_ref: &str) -> Result<Session> {
        let session = self
            .repo
            .finalize(session_id, recording_ref, self.clock.now_millis())?;
        info!(session = %session_id, events = session.events.len(), "session finalized");
        Ok(session)
    }

    /// Session with resolved events and the freshly computed score.
    pub fn detail(&self, session_id: Uuid) -> Result<SessionReport> {
        let session = self.repo.get(session_id)?;
        Ok(SessionReport::from_session(&session))
    }

    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        self.repo.list()
    }

    pub fn delete(&self, session_id: Uuid) -> Result<()> {
        self.repo.delete(session_id)?;
        info!(session = %session_id, "session deleted");
        Ok(())
    }

    /// An emitter bound to `handle`, sharing this service's repository and clock.
    pub fn emitter(&self, handle: SessionHandle) -> Emitter {
        Emitter::new(Arc::clone(&self.repo), Arc::clone(&self.clock), handle)
    }
}
