//! Per-modality monitors: the debounce machines of one modality wired to its
//! classifier thresholds.
//!
//! Each monitor owns its state privately and is driven by `observe` (one
//! sample) and `poll` (timer wake-up between samples). Both take the same
//! monotonic millisecond clock.

use tracing::warn;

use crate::classifier::Detection;
use crate::config::MonitorConfig;
use crate::debounce::{EdgeTrigger, SustainedDebouncer};
use crate::events::{EventKind, Flagged};
use crate::landmarks::{FaceLandmarks, eye_aspect_ratio, is_looking_away};

/// Face-mesh monitor: no-face, multiple faces, gaze-away and drowsiness.
#[derive(Clone, Debug)]
pub struct FaceMonitor {
    gaze_min_ratio: f64,
    gaze_max_ratio: f64,
    ear_threshold: f64,
    no_face: SustainedDebouncer,
    gaze: SustainedDebouncer,
    drowsiness: SustainedDebouncer,
    multi_face: EdgeTrigger,
}

impl FaceMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            gaze_min_ratio: config.gaze_min_ratio,
            gaze_max_ratio: config.gaze_max_ratio,
            ear_threshold: config.ear_threshold,
            no_face: SustainedDebouncer::new(config.no_face_hold_ms),
            gaze: SustainedDebouncer::new(config.gaze_hold_ms),
            drowsiness: SustainedDebouncer::new(config.drowsiness_hold_ms),
            multi_face: EdgeTrigger::new(1),
        }
    }

    /// Fire every sustained timer whose deadline has passed.
    pub fn poll(&mut self, now: u64) -> Vec<Flagged> {
        let mut out = Vec::new();
        if self.no_face.poll(now) {
            out.push(sustained(EventKind::NoFaceDetected, &self.no_face));
        }
        if self.gaze.poll(now) {
            out.push(sustained(EventKind::LookingAway, &self.gaze));
        }
        if self.drowsiness.poll(now) {
            out.push(sustained(EventKind::DrowsinessDetected, &self.drowsiness));
        }
        out
    }

    /// Apply one landmarker sample.
    ///
    /// Gaze and drowsiness are only evaluated for exactly one face; with zero
    /// or several faces their pending timers are dropped.
    pub fn observe(&mut self, faces: &[FaceLandmarks], now: u64) -> Vec<Flagged> {
        let mut out = self.poll(now);

        if self.no_face.observe(faces.is_empty(), now) {
            out.push(sustained(EventKind::NoFaceDetected, &self.no_face));
        }
        if self.multi_face.observe(faces.len()) {
            out.push(Flagged::new(EventKind::MultipleFacesDetected, None));
        }

        let [face] = faces else {
            self.gaze.cancel();
            self.drowsiness.cancel();
            return out;
        };

        let away = is_looking_away(face, self.gaze_min_ratio, self.gaze_max_ratio);
        if self.gaze.observe(away, now) {
            out.push(sustained(EventKind::LookingAway, &self.gaze));
        }

        match eye_aspect_ratio(face) {
            Ok(ear) => {
                if self.drowsiness.observe(ear < self.ear_threshold, now) {
                    out.push(sustained(EventKind::DrowsinessDetected, &self.drowsiness));
                }
            }
            Err(e) => warn!("eye aspect ratio unavailable, skipping drowsiness sample: {e}"),
        }
        out
    }

    /// Earliest pending deadline across the sustained machines.
    pub fn deadline(&self) -> Option<u64> {
        [
            self.no_face.deadline(),
            self.gaze.deadline(),
            self.drowsiness.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Discard all pending timers without emitting.
    pub fn cancel_all(&mut self) {
        self.no_face.cancel();
        self.gaze.cancel();
        self.drowsiness.cancel();
        self.multi_face.reset();
    }
}

/// Audio-level monitor: sustained elevated level means a background voice.
#[derive(Clone, Debug)]
pub struct AudioMonitor {
    threshold: f64,
    voice: SustainedDebouncer,
}

impl AudioMonitor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            threshold: config.audio_level_threshold,
            voice: SustainedDebouncer::new(config.voice_hold_ms),
        }
    }

    pub fn poll(&mut self, now: u64) -> Option<Flagged> {
        self.voice
            .poll(now)
            .then(|| sustained(EventKind::BackgroundVoice, &self.voice))
    }

    pub fn observe(&mut self, level: f64, now: u64) -> Option<Flagged> {
        self.voice
            .observe(level > self.threshold, now)
            .then(|| sustained(EventKind::BackgroundVoice, &self.voice))
    }

    pub fn deadline(&self) -> Option<u64> {
        self.voice.deadline()
    }

    pub fn cancel_all(&mut self) {
        self.voice.cancel();
    }
}

/// Map one completed object-detector sample to flags: at most one per kind,
/// in table order, considering the first `max_detections` detections that
/// meet `min_score`.
pub fn classify_detections(
    detections: &[Detection],
    min_score: f64,
    max_detections: usize,
) -> Vec<Flagged> {
    let seen: Vec<&str> = detections
        .iter()
        .take(max_detections)
        .filter(|d| d.score >= min_score)
        .map(|d| d.class.as_str())
        .collect();
    let has = |class: &str| seen.contains(&class);

    let mut out = Vec::new();
    if has("cell phone") {
        out.push(Flagged::new(EventKind::PhoneDetected, None));
    }
    if has("book") {
        out.push(Flagged::new(EventKind::BookDetected, None));
    }
    if has("laptop") || has("tv") {
        out.push(Flagged::new(EventKind::ExtraDeviceDetected, None));
    }
    out
}

fn sustained(kind: EventKind, debouncer: &SustainedDebouncer) -> Flagged {
    Flagged::new(kind, Some(debouncer.hold_ms()))
}
