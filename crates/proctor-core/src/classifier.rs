//! Boundaries to the external classifiers. Each yields one measurement per
//! call; the monitor runtime decides when to call.

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::landmarks::FaceLandmarks;

/// One labelled object detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub score: f64,
}

impl Detection {
    pub fn new(class: impl Into<String>, score: f64) -> Self {
        Self {
            class: class.into(),
            score,
        }
    }
}

/// Face-mesh landmarker: all faces visible in the current frame.
pub trait FaceLandmarker: Send {
    fn detect(&mut self) -> Result<Vec<FaceLandmarks>, ClassifierError>;
}

/// Object detector. Inference is heavy and runs off the async workers, so the
/// detector is shared rather than owned by its task.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self) -> Result<Vec<Detection>, ClassifierError>;
}

/// Audio level meter: mean frequency-bin magnitude on a 0-255 scale.
pub trait AudioMeter: Send {
    fn level(&mut self) -> Result<f64, ClassifierError>;
}
