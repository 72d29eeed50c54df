//! Integrity scoring: a pure fold over a session's event labels.
//!
//! Depends only on the labels and their order. Wall-clock time and event
//! timestamps play no part in the points.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SCORE;
use crate::events::{is_focus_lost, penalty_for};
use crate::session::Event;

/// One penalized event. `points` is negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub event: String,
    pub points: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// In `[0, 100]`.
    pub integrity_score: u32,
    /// One entry per penalized event, in log order.
    pub deductions: Vec<Deduction>,
    pub focus_lost_count: usize,
}

/// Score a sequence of event labels.
pub fn score_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Score {
    let mut running = i64::from(DEFAULT_SCORE);
    let mut deductions = Vec::new();
    let mut focus_lost_count = 0;

    for label in labels {
        if let Some((_, points)) = penalty_for(label) {
            running -= i64::from(points);
            deductions.push(Deduction {
                event: label.to_string(),
                points: -(points as i32),
            });
        }
        if is_focus_lost(label) {
            focus_lost_count += 1;
        }
    }

    Score {
        integrity_score: running.max(0) as u32,
        deductions,
        focus_lost_count,
    }
}

/// Score a session's event log.
pub fn score(events: &[Event]) -> Score {
    score_labels(events.iter().map(|e| e.event_type.as_str()))
}
