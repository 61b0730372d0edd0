// Burst parsing and encoding
pub mod codec;
pub mod record;
pub mod shape;

pub use codec::{DecodeMode, PayloadDiagnostic, Samples};
pub use record::{Burst, SubsetLimits};
pub use shape::{DataShape, SampleType, ATTENUATORS_KEY, AVERAGE_KEY};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurstError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Header(#[from] crate::header::HeaderError),

    #[error("mandatory dimension key {0:?} is missing from the header")]
    MissingDimension(String),

    #[error("header key {key:?} has value {value:?}, expected an integer")]
    InvalidDimensionValue { key: String, value: String },

    #[error("unsupported averaging/stacking configuration: Average={0}")]
    UnsupportedAveraging(i64),

    #[error("payload truncated: expected {expected} bytes, found {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("payload element type {found:?} does not match the header's {expected:?}")]
    SampleTypeMismatch {
        expected: shape::SampleType,
        found: shape::SampleType,
    },

    #[error("invalid subset request: {0}")]
    InvalidSubsetRequest(String),
}

pub type Result<T> = std::result::Result<T, BurstError>;
