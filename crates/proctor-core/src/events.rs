//! Event-type enumeration and the fixed penalty table.
//!
//! Stored event labels are free-form strings that carry a marker plus an
//! optional hold annotation (`LOOKING_AWAY (5s)`), so classification is by
//! substring, first match in table order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::format_hold;

/// The watched integrity-violation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    PhoneDetected,
    BookDetected,
    LookingAway,
    NoFaceDetected,
    MultipleFacesDetected,
    DrowsinessDetected,
    BackgroundVoice,
    ExtraDeviceDetected,
}

/// `(marker, points)` in classification order.
pub const PENALTY_TABLE: [(&str, u32); 8] = [
    ("PHONE_DETECTED", 7),
    ("BOOK_DETECTED", 5),
    ("LOOKING_AWAY", 2),
    ("NO_FACE_DETECTED", 5),
    ("MULTIPLE_FACES_DETECTED", 10),
    ("DROWSINESS_DETECTED", 5),
    ("BACKGROUND_VOICE", 3),
    ("EXTRA_DEVICE_DETECTED", 8),
];

/// Label substrings that count toward `focusLostCount`.
const FOCUS_LOST_MARKERS: [&str; 2] = ["LOOKING_AWAY", "NO_FACE"];

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::PhoneDetected,
        EventKind::BookDetected,
        EventKind::LookingAway,
        EventKind::NoFaceDetected,
        EventKind::MultipleFacesDetected,
        EventKind::DrowsinessDetected,
        EventKind::BackgroundVoice,
        EventKind::ExtraDeviceDetected,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            EventKind::PhoneDetected => "PHONE_DETECTED",
            EventKind::BookDetected => "BOOK_DETECTED",
            EventKind::LookingAway => "LOOKING_AWAY",
            EventKind::NoFaceDetected => "NO_FACE_DETECTED",
            EventKind::MultipleFacesDetected => "MULTIPLE_FACES_DETECTED",
            EventKind::DrowsinessDetected => "DROWSINESS_DETECTED",
            EventKind::BackgroundVoice => "BACKGROUND_VOICE",
            EventKind::ExtraDeviceDetected => "EXTRA_DEVICE_DETECTED",
        }
    }

    pub fn penalty(self) -> u32 {
        penalty_for(self.marker()).map_or(0, |(_, points)| points)
    }

    /// Stored label: the bare marker, or `MARKER (hold)` for sustained kinds.
    pub fn label(self, hold_ms: Option<u64>) -> String {
        match hold_ms {
            Some(ms) => format!("{} ({})", self.marker(), format_hold(ms)),
            None => self.marker().to_string(),
        }
    }

    /// Exact marker lookup, for callers that accept a kind by name.
    pub fn from_marker(marker: &str) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|k| k.marker() == marker)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// First penalty-table row whose marker occurs in `label`.
pub fn penalty_for(label: &str) -> Option<(&'static str, u32)> {
    PENALTY_TABLE
        .iter()
        .copied()
        .find(|(marker, points)| *points > 0 && label.contains(marker))
}

/// Whether `label` denotes a gaze-away or face-absence occurrence.
pub fn is_focus_lost(label: &str) -> bool {
    FOCUS_LOST_MARKERS.iter().any(|m| label.contains(m))
}

/// A debounced occurrence ready for emission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flagged {
    pub kind: EventKind,
    pub label: String,
}

impl Flagged {
    pub fn new(kind: EventKind, hold_ms: Option<u64>) -> Self {
        Self {
            kind,
            label: kind.label(hold_ms),
        }
    }
}
