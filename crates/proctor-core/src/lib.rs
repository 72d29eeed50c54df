//! Interview integrity engine.
//!
//! Turns jittery per-sample classifier output (face landmarks, object
//! detections, audio level) into debounced integrity events, keeps each
//! session's append-only event log, and folds that log into a deterministic
//! 0-100 integrity score with an itemized breakdown.
//!
//! Zero I/O: persistence sits behind [`SessionRepository`], classifiers behind
//! the traits in [`classifier`], and time behind [`Clock`].

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod emitter;
pub mod error;
pub mod events;
pub mod landmarks;
pub mod modality;
pub mod report;
pub mod scoring;
pub mod service;
pub mod session;
pub mod time;

pub use aggregate::{MemoryRepository, SessionRepository, apply_finalize, sort_summaries};
pub use classifier::{AudioMeter, Detection, FaceLandmarker, ObjectDetector};
pub use config::MonitorConfig;
pub use constants::{DEFAULT_SCORE, EAR_THRESHOLD, GAZE_MAX_RATIO, GAZE_MIN_RATIO};
pub use debounce::{EdgeTrigger, GuardPermit, ReentrancyGuard, SustainedDebouncer};
pub use emitter::Emitter;
pub use error::{AggregateError, ClassifierError, Result};
pub use events::{EventKind, Flagged, PENALTY_TABLE, is_focus_lost, penalty_for};
pub use landmarks::{FaceLandmarks, Landmark, eye_aspect_ratio, is_looking_away, pose_ratio};
pub use modality::{AudioMonitor, FaceMonitor, classify_detections};
pub use report::{ScoreBand, SessionReport};
pub use scoring::{Deduction, Score, score, score_labels};
pub use service::SessionService;
pub use session::{Event, NewEvent, Session, SessionHandle, SessionSummary};
pub use time::{Clock, IN_PROGRESS, ManualClock, SystemClock};
