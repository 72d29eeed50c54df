//! JSONL replay feeds standing in for the live classifiers.
//!
//! One sample per line; blank lines are skipped. Face feeds hold a JSON array
//! of faces (each an array of landmarks, `null` for unplaced points), object
//! feeds an array of `{"class", "score"}` detections, audio feeds a bare
//! number.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use proctor_core::{
    AudioMeter, ClassifierError, Detection, FaceLandmarker, FaceLandmarks, ObjectDetector,
};
use serde::de::DeserializeOwned;

/// Reads one JSON value per line until the input runs out.
pub struct JsonlReplay<T> {
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    _sample: std::marker::PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonlReplay<T> {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open feed {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            line_no: 0,
            _sample: std::marker::PhantomData,
        }
    }

    /// Next sample, [`ClassifierError::Exhausted`] at end of input, or
    /// [`ClassifierError::Malformed`] for a line that does not parse.
    pub fn next_sample(&mut self) -> std::result::Result<T, ClassifierError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| ClassifierError::Malformed(format!("read failed: {e}")))?;
            if read == 0 {
                return Err(ClassifierError::Exhausted);
            }
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map_err(|e| ClassifierError::Malformed(format!("line {}: {e}", self.line_no)));
        }
    }
}

impl FaceLandmarker for JsonlReplay<Vec<FaceLandmarks>> {
    fn detect(&mut self) -> std::result::Result<Vec<FaceLandmarks>, ClassifierError> {
        self.next_sample()
    }
}

impl AudioMeter for JsonlReplay<f64> {
    fn level(&mut self) -> std::result::Result<f64, ClassifierError> {
        self.next_sample()
    }
}

/// Object feed shared between the scheduling task and blocking inference.
pub struct SharedReplay(Mutex<JsonlReplay<Vec<Detection>>>);

impl SharedReplay {
    pub fn new(replay: JsonlReplay<Vec<Detection>>) -> Self {
        Self(Mutex::new(replay))
    }
}

impl ObjectDetector for SharedReplay {
    fn detect(&self) -> std::result::Result<Vec<Detection>, ClassifierError> {
        let mut replay = self
            .0
            .lock()
            .map_err(|_| ClassifierError::Malformed("replay lock poisoned".to_string()))?;
        replay.next_sample()
    }
}
