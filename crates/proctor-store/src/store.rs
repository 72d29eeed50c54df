use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use proctor_core::{
    AggregateError, Event, NewEvent, Session, SessionRepository, SessionSummary, apply_finalize,
};

use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite-backed session repository.
///
/// One connection behind a mutex: every write, including appends from
/// concurrent monitor tasks, is serialized through it.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::InvalidData("connection lock poisoned".to_string()))
    }

    // --- Sessions ---

    pub fn create_session(&self, candidate_name: &str, start_time: u64) -> Result<Session> {
        let session = Session::new(candidate_name, start_time);
        self.conn()?.execute(
            "INSERT INTO sessions (id, candidate_name, start_time, integrity_score, recording_url)
             VALUES (?1, ?2, ?3, ?4, '')",
            params![
                session.id.to_string(),
                session.candidate_name,
                to_sql_millis(session.start_time),
                session.integrity_score,
            ],
        )?;
        Ok(session)
    }

    pub fn append_event(&self, session_id: Uuid, event: NewEvent) -> Result<Event> {
        let conn = self.conn()?;
        let candidate_name: String = conn
            .query_row(
                "SELECT candidate_name FROM sessions WHERE id = ?1",
                [session_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound(session_id))?;

        let event = Event {
            id: Uuid::new_v4(),
            session_id,
            candidate_name,
            event_type: event.event_type,
            timestamp: event.timestamp,
        };
        conn.execute(
            "INSERT INTO events (id, session_id, candidate_name, event_type, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id.to_string(),
                session_id.to_string(),
                event.candidate_name,
                event.event_type,
                to_sql_millis(event.timestamp),
            ],
        )?;
        Ok(event)
    }

    pub fn finalize_session(
        &self,
        session_id: Uuid,
        recording_ref: &str,
        end_time: u64,
    ) -> Result<Session> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut session = load_session(&tx, session_id)?;
        if apply_finalize(&mut session, recording_ref, end_time) {
            tx.execute(
                "UPDATE sessions SET end_time = ?1, recording_url = ?2 WHERE id = ?3",
                params![
                    to_sql_millis(end_time),
                    recording_ref,
                    session_id.to_string()
                ],
            )?;
        }
        tx.commit()?;
        Ok(session)
    }

    pub fn load_session(&self, session_id: Uuid) -> Result<Session> {
        let conn = self.conn()?;
        load_session(&conn, session_id)
    }

    /// Summaries ordered newest start first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.candidate_name, s.start_time, s.end_time, s.integrity_score,
                    s.recording_url,
                    (SELECT COUNT(*) FROM events e WHERE e.session_id = s.id)
             FROM sessions s
             ORDER BY s.start_time DESC, s.id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, candidate_name, start, end, score, recording, count)| -> Result<_> {
                    Ok(SessionSummary {
                        id: parse_uuid(&id)?,
                        candidate_name,
                        start_time: from_sql_millis(start),
                        end_time: end.map(from_sql_millis),
                        integrity_score: score,
                        recording_url: non_empty(recording),
                        event_count: count.max(0) as usize,
                    })
                },
            )
            .collect()
    }

    /// Delete the session; its events go with it by cascade.
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM sessions WHERE id = ?1", [session_id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(session_id));
        }
        Ok(())
    }
}

impl SessionRepository for Store {
    fn create(&self, candidate_name: &str, start_time: u64) -> proctor_core::Result<Session> {
        Ok(self.create_session(candidate_name, start_time)?)
    }

    fn append(&self, session_id: Uuid, event: NewEvent) -> proctor_core::Result<Event> {
        Ok(self.append_event(session_id, event)?)
    }

    fn finalize(
        &self,
        session_id: Uuid,
        recording_ref: &str,
        end_time: u64,
    ) -> proctor_core::Result<Session> {
        Ok(self.finalize_session(session_id, recording_ref, end_time)?)
    }

    fn get(&self, session_id: Uuid) -> proctor_core::Result<Session> {
        Ok(self.load_session(session_id)?)
    }

    fn list(&self) -> proctor_core::Result<Vec<SessionSummary>> {
        self.list_sessions().map_err(AggregateError::from)
    }

    fn delete(&self, session_id: Uuid) -> proctor_core::Result<()> {
        Ok(self.delete_session(session_id)?)
    }
}

fn load_session(conn: &Connection, session_id: Uuid) -> Result<Session> {
    let key = session_id.to_string();
    let row = conn
        .query_row(
            "SELECT candidate_name, start_time, end_time, integrity_score, recording_url
             FROM sessions WHERE id = ?1",
            [&key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;
    let Some((candidate_name, start, end, score, recording)) = row else {
        return Err(StoreError::NotFound(session_id));
    };

    let mut stmt = conn.prepare(
        "SELECT id, candidate_name, event_type, timestamp
         FROM events WHERE session_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt
        .query_map([&key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let events = rows
        .into_iter()
        .map(|(id, name, event_type, ts)| -> Result<Event> {
            Ok(Event {
                id: parse_uuid(&id)?,
                session_id,
                candidate_name: name,
                event_type,
                timestamp: from_sql_millis(ts),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Session {
        id: session_id,
        candidate_name,
        start_time: from_sql_millis(start),
        end_time: end.map(from_sql_millis),
        integrity_score: score,
        recording_url: non_empty(recording),
        events,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("bad UUID '{s}': {e}")))
}

fn to_sql_millis(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

fn from_sql_millis(ms: i64) -> u64 {
    ms.max(0) as u64
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(session: &Session) -> Vec<&str> {
        session.labels().collect()
    }

    fn event_rows(store: &Store) -> i64 {
        store
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_and_load_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let created = store.create_session("Ada", 1_700_000_000_123).unwrap();
        let loaded = store.load_session(created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.integrity_score, 100);
        assert!(loaded.recording_url.is_none());
    }

    #[test]
    fn test_append_keeps_arrival_order() {
        let store = Store::open_in_memory().unwrap();
        let s = store.create_session("Ada", 0).unwrap();
        store.append_event(s.id, NewEvent::new("LOOKING_AWAY (5s)", 900)).unwrap();
        store.append_event(s.id, NewEvent::new("PHONE_DETECTED", 100)).unwrap();
        store.append_event(s.id, NewEvent::new("LOOKING_AWAY (5s)", 500)).unwrap();

        let loaded = store.load_session(s.id).unwrap();
        assert_eq!(
            labels(&loaded),
            vec!["LOOKING_AWAY (5s)", "PHONE_DETECTED", "LOOKING_AWAY (5s)"]
        );
        assert!(loaded.events.iter().all(|e| e.candidate_name == "Ada"));
    }

    #[test]
    fn test_append_unknown_session() {
        let store = Store::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        let err = store.append_event(id, NewEvent::new("X", 0)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[test]
    fn test_finalize_once() {
        let store = Store::open_in_memory().unwrap();
        let s = store.create_session("Ada", 0).unwrap();
        let done = store.finalize_session(s.id, "https://cdn/rec.webm", 65_000).unwrap();
        assert_eq!(done.end_time, Some(65_000));

        let again = store.finalize_session(s.id, "other", 99_000).unwrap();
        assert_eq!(again.end_time, Some(65_000));
        assert_eq!(again.recording_url.as_deref(), Some("https://cdn/rec.webm"));

        let loaded = store.load_session(s.id).unwrap();
        assert_eq!(loaded.end_time, Some(65_000));
    }

    #[test]
    fn test_list_newest_first_with_counts() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_session("a", 1_000).unwrap();
        store.create_session("c", 3_000).unwrap();
        store.create_session("b", 2_000).unwrap();
        store.append_event(a.id, NewEvent::new("BOOK_DETECTED", 1_500)).unwrap();

        let list = store.list_sessions().unwrap();
        let names: Vec<&str> = list.iter().map(|s| s.candidate_name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert_eq!(list[2].event_count, 1);
    }

    #[test]
    fn test_delete_cascades_events() {
        let store = Store::open_in_memory().unwrap();
        let s = store.create_session("Ada", 0).unwrap();
        let keep = store.create_session("Bob", 0).unwrap();
        store.append_event(s.id, NewEvent::new("PHONE_DETECTED", 1)).unwrap();
        store.append_event(s.id, NewEvent::new("BOOK_DETECTED", 2)).unwrap();
        store.append_event(keep.id, NewEvent::new("BOOK_DETECTED", 2)).unwrap();

        store.delete_session(s.id).unwrap();
        assert_eq!(event_rows(&store), 1);
        assert!(matches!(
            store.load_session(s.id),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_session(s.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_repository_maps_not_found() {
        let store = Store::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        assert_eq!(
            SessionRepository::get(&store, id),
            Err(AggregateError::NotFound(id))
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let id = {
            let store = Store::open(&path).unwrap();
            let s = store.create_session("Ada", 10).unwrap();
            store.append_event(s.id, NewEvent::new("PHONE_DETECTED", 20)).unwrap();
            s.id
        };
        let store = Store::open(&path).unwrap();
        assert_eq!(labels(&store.load_session(id).unwrap()), vec!["PHONE_DETECTED"]);
    }
}
