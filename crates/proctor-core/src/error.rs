use std::fmt;

use uuid::Uuid;

/// Failure of a Session Aggregate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// The referenced session does not exist.
    NotFound(Uuid),
    /// The persistence backend rejected or failed the operation.
    Backend(String),
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::NotFound(id) => write!(f, "session not found: {id}"),
            AggregateError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for AggregateError {}

pub type Result<T> = std::result::Result<T, AggregateError>;

/// Failure of an external classifier for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// A landmark the computation needs is absent or null.
    MissingLandmark(usize),
    /// Landmarks are present but their geometry makes the measure undefined.
    DegenerateGeometry(&'static str),
    /// The classifier produced output that could not be interpreted.
    Malformed(String),
    /// The source has no more samples to give.
    Exhausted,
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::MissingLandmark(idx) => write!(f, "missing landmark {idx}"),
            ClassifierError::DegenerateGeometry(what) => write!(f, "degenerate geometry: {what}"),
            ClassifierError::Malformed(msg) => write!(f, "malformed classifier output: {msg}"),
            ClassifierError::Exhausted => write!(f, "sample source exhausted"),
        }
    }
}

impl std::error::Error for ClassifierError {}
