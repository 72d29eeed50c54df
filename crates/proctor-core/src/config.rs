use serde::{Deserialize, Serialize};

use crate::constants::{
    AUDIO_LEVEL_THRESHOLD, EAR_THRESHOLD, GAZE_MAX_RATIO, GAZE_MIN_RATIO, OBJECT_MAX_DETECTIONS,
    OBJECT_MIN_SCORE,
};

/// Tunables for the per-modality monitors and their sampling cadences.
/// All durations are milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub face_interval_ms: u64,
    pub audio_interval_ms: u64,
    pub object_interval_ms: u64,

    pub no_face_hold_ms: u64,
    pub gaze_hold_ms: u64,
    pub drowsiness_hold_ms: u64,
    pub voice_hold_ms: u64,

    pub gaze_min_ratio: f64,
    pub gaze_max_ratio: f64,
    pub ear_threshold: f64,
    pub audio_level_threshold: f64,

    pub object_min_score: f64,
    pub object_max_detections: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            face_interval_ms: 500,
            audio_interval_ms: 500,
            object_interval_ms: 5_000,
            no_face_hold_ms: 10_000,
            gaze_hold_ms: 5_000,
            drowsiness_hold_ms: 3_000,
            voice_hold_ms: 3_000,
            gaze_min_ratio: GAZE_MIN_RATIO,
            gaze_max_ratio: GAZE_MAX_RATIO,
            ear_threshold: EAR_THRESHOLD,
            audio_level_threshold: AUDIO_LEVEL_THRESHOLD,
            object_min_score: OBJECT_MIN_SCORE,
            object_max_detections: OBJECT_MAX_DETECTIONS,
        }
    }
}

impl MonitorConfig {
    /// Reject settings the runtime cannot honor.
    pub fn validate(&self) -> Result<(), String> {
        if self.face_interval_ms == 0 || self.audio_interval_ms == 0 || self.object_interval_ms == 0
        {
            return Err("sampling intervals must be non-zero".to_string());
        }
        if !(self.gaze_min_ratio < self.gaze_max_ratio) {
            return Err(format!(
                "gaze band is empty: [{}, {}]",
                self.gaze_min_ratio, self.gaze_max_ratio
            ));
        }
        Ok(())
    }
}
