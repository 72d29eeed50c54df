//! Event Emitter: stamps a flagged occurrence and appends it to the session
//! the emitter was bound to.
//!
//! Emission never fails loudly. A vanished session is logged at debug and a
//! backend failure at warn; either way the event is dropped and the caller's
//! debounce state carries on as if it had landed.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregate::SessionRepository;
use crate::error::AggregateError;
use crate::events::Flagged;
use crate::session::{Event, NewEvent, SessionHandle};
use crate::time::Clock;

#[derive(Clone)]
pub struct Emitter {
    repo: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    handle: SessionHandle,
}

impl Emitter {
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        handle: SessionHandle,
    ) -> Self {
        Self {
            repo,
            clock,
            handle,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Append `flag` stamped with the current time. `None` when dropped.
    pub fn emit(&self, flag: &Flagged) -> Option<Event> {
        let event = NewEvent::new(flag.label.clone(), self.clock.now_millis());
        match self.repo.append(self.handle.id, event) {
            Ok(event) => {
                debug!(session = %self.handle.id, event = %event.event_type, "event recorded");
                Some(event)
            }
            Err(AggregateError::NotFound(id)) => {
                debug!(session = %id, event = %flag.label, "session gone, event discarded");
                None
            }
            Err(e) => {
                warn!(session = %self.handle.id, event = %flag.label, "event dropped: {e}");
                None
            }
        }
    }

    pub fn emit_all(&self, flags: &[Flagged]) -> usize {
        flags.iter().filter_map(|f| self.emit(f)).count()
    }
}
