// Hierarchical container format: model and raw-format bridge
pub mod bridge;
pub mod dataset;

pub use bridge::{dataset_to_file, file_to_dataset, DATA_VARIABLE, HISTORY_ATTR};
pub use dataset::{Attribute, Dataset, Dimension, Group, Scope, Variable};

use thiserror::Error;

/// Canonical container file suffix.
pub const CONTAINER_SUFFIX: &str = ".acf";

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("container serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Burst(#[from] crate::burst::BurstError),

    #[error("dimension {name:?} already defined with length {existing}, cannot redefine as {requested}")]
    DimensionMismatch {
        name: String,
        existing: usize,
        requested: usize,
    },

    #[error("variable {variable:?} references undefined dimension {dimension:?}")]
    UndefinedDimension { variable: String, dimension: String },

    #[error("variable {variable:?} holds {actual} elements but its dimensions call for {expected}")]
    VariableShapeMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("container scope {scope:?} has no data variable")]
    MissingVariable { scope: String },
}

pub type Result<T> = std::result::Result<T, ContainerError>;
