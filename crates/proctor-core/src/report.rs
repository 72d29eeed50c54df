//! Session detail report: session metadata, resolved events and the computed
//! score, in JSON and plain-text form.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{Deduction, score};
use crate::session::Session;
use crate::time::{format_session_duration, unix_millis_to_iso8601};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub event_type: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub id: Uuid,
    pub candidate_name: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub recording_url: Option<String>,
    pub integrity_score: u32,
    pub duration: String,
    pub focus_lost_count: usize,
    pub deductions: Vec<Deduction>,
    pub events: Vec<EventView>,
}

/// Qualitative band for an integrity score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Warning,
    Poor,
}

impl ScoreBand {
    pub fn of(score: u32) -> Self {
        match score {
            80.. => ScoreBand::Good,
            50..=79 => ScoreBand::Warning,
            _ => ScoreBand::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Warning => "warning",
            ScoreBand::Poor => "poor",
        }
    }
}

impl SessionReport {
    /// Build the report, recomputing the score from the event log.
    pub fn from_session(session: &Session) -> Self {
        let computed = score(&session.events);
        Self {
            id: session.id,
            candidate_name: session.candidate_name.clone(),
            start_time: unix_millis_to_iso8601(session.start_time),
            end_time: session.end_time.map(unix_millis_to_iso8601),
            recording_url: session.recording_url.clone(),
            integrity_score: computed.integrity_score,
            duration: format_session_duration(session.start_time, session.end_time),
            focus_lost_count: computed.focus_lost_count,
            deductions: computed.deductions,
            events: session
                .events
                .iter()
                .map(|e| EventView {
                    id: e.id,
                    event_type: e.event_type.clone(),
                    timestamp: unix_millis_to_iso8601(e.timestamp),
                })
                .collect(),
        }
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::of(self.integrity_score)
    }

    /// Human-readable report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Session:          {}", self.id);
        let _ = writeln!(out, "Candidate:        {}", self.candidate_name);
        let _ = writeln!(out, "Started:          {}", self.start_time);
        let _ = writeln!(
            out,
            "Ended:            {}",
            self.end_time.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "Duration:         {}", self.duration);
        let _ = writeln!(
            out,
            "Recording:        {}",
            self.recording_url.as_deref().filter(|r| !r.is_empty()).unwrap_or("-")
        );
        let _ = writeln!(
            out,
            "Integrity score:  {} ({})",
            self.integrity_score,
            self.band().as_str()
        );
        let _ = writeln!(out, "Focus lost:       {}", self.focus_lost_count);
        let _ = writeln!(out, "Events:           {}", self.events.len());

        if !self.deductions.is_empty() {
            let _ = writeln!(out, "\nDeductions:");
            for d in &self.deductions {
                let _ = writeln!(out, "  {:>4}  {}", d.points, d.event);
            }
        }
        if !self.events.is_empty() {
            let _ = writeln!(out, "\nTimeline:");
            for e in &self.events {
                let _ = writeln!(out, "  {}  {}", e.timestamp, e.event_type);
            }
        }
        out
    }
}
