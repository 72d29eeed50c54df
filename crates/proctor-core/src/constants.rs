/// Integrity score a session starts at and is stored with until computed.
pub const DEFAULT_SCORE: u32 = 100;

/// Face-mesh landmark index of the nose tip.
pub const NOSE_TIP: usize = 1;

/// Face-mesh landmark index of the left ear tragion.
pub const LEFT_EAR: usize = 234;

/// Face-mesh landmark index of the right ear tragion.
pub const RIGHT_EAR: usize = 454;

/// Right-eye contour landmarks in EAR order: p1..p6.
/// p1/p4 are the horizontal corners, (p2, p6) and (p3, p5) the vertical pairs.
pub const RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Left-eye contour landmarks in EAR order: p1..p6.
pub const LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Gaze is "away" when the pose ratio falls below this bound...
pub const GAZE_MIN_RATIO: f64 = 0.3;

/// ...or rises above this one.
pub const GAZE_MAX_RATIO: f64 = 0.7;

/// Averaged EAR below this marks a drowsy sample.
pub const EAR_THRESHOLD: f64 = 0.2;

/// Mean frequency-bin magnitude (0-255) above which audio counts as elevated.
pub const AUDIO_LEVEL_THRESHOLD: f64 = 30.0;

/// Minimum detector confidence for an object detection to count.
pub const OBJECT_MIN_SCORE: f64 = 0.4;

/// Upper bound on detections considered per object sample.
pub const OBJECT_MAX_DETECTIONS: usize = 20;

/// Horizontal eye spans shorter than this make EAR undefined.
pub const EPSILON: f64 = 1e-9;
