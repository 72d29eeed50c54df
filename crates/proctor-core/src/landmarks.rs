//! Geometric classifiers over one face-mesh sample.
//!
//! Pure functions: gaze pose ratio from nose and ear landmarks, and the
//! eye-aspect ratio (EAR) from the six canonical contour points of each eye.

use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, LEFT_EAR, LEFT_EYE, NOSE_TIP, RIGHT_EAR, RIGHT_EYE};
use crate::error::ClassifierError;

/// A single face-mesh landmark in normalized image coordinates.
/// A missing depth reads as zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 3-D Euclidean distance.
    pub fn distance(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Landmarks for one detected face, indexed by mesh position.
/// Slots may be null when the landmarker could not place a point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Option<Landmark>>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Option<Landmark>>) -> Self {
        Self { points }
    }

    pub fn get(&self, idx: usize) -> Option<&Landmark> {
        self.points.get(idx).and_then(Option::as_ref)
    }

    fn require(&self, idx: usize) -> Result<&Landmark, ClassifierError> {
        self.get(idx).ok_or(ClassifierError::MissingLandmark(idx))
    }
}

/// Horizontal position of the nose between the ears:
/// `(nose.x - leftEar.x) / (rightEar.x - leftEar.x)`.
///
/// `None` when any of the three landmarks is absent or the ears share an x.
pub fn pose_ratio(face: &FaceLandmarks) -> Option<f64> {
    let left = face.get(LEFT_EAR)?;
    let right = face.get(RIGHT_EAR)?;
    let nose = face.get(NOSE_TIP)?;
    let span = right.x - left.x;
    if span.abs() < EPSILON {
        return None;
    }
    Some((nose.x - left.x) / span)
}

/// Whether the face is turned away from the screen.
///
/// Missing landmarks report "not away" so that a bad sample never flags.
pub fn is_looking_away(face: &FaceLandmarks, min_ratio: f64, max_ratio: f64) -> bool {
    match pose_ratio(face) {
        Some(ratio) => ratio < min_ratio || ratio > max_ratio,
        None => false,
    }
}

/// EAR for one eye: `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)`.
pub fn single_eye_aspect_ratio(
    face: &FaceLandmarks,
    contour: &[usize; 6],
) -> Result<f64, ClassifierError> {
    let [p1, p2, p3, p4, p5, p6] = contour.map(|idx| face.require(idx));
    let (p1, p2, p3, p4, p5, p6) = (p1?, p2?, p3?, p4?, p5?, p6?);

    let horizontal = p1.distance(p4);
    if horizontal < EPSILON {
        return Err(ClassifierError::DegenerateGeometry("zero-width eye"));
    }
    Ok((p2.distance(p6) + p3.distance(p5)) / (2.0 * horizontal))
}

/// EAR averaged over both eyes.
pub fn eye_aspect_ratio(face: &FaceLandmarks) -> Result<f64, ClassifierError> {
    let right = single_eye_aspect_ratio(face, &RIGHT_EYE)?;
    let left = single_eye_aspect_ratio(face, &LEFT_EYE)?;
    Ok((left + right) / 2.0)
}
