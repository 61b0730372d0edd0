// APRES-RS: Rust rework of the ApRES radar sounder file tooling
// Reads, rewrites and converts ApRES raw burst files

pub mod burst;
pub mod container;
pub mod file;
pub mod header;
pub mod stream;

// Re-export commonly used types
pub use burst::{
    Burst, BurstError, DataShape, DecodeMode, PayloadDiagnostic, SampleType, Samples, SubsetLimits,
};
pub use container::{dataset_to_file, file_to_dataset, ContainerError, Dataset, CONTAINER_SUFFIX};
pub use file::{ApresFile, BurstReader, FileError, APRES_SUFFIX};
pub use header::{FormatVersion, Header, HeaderError};
pub use stream::{open as open_stream, StreamError, StreamOptions};

/// APRES-RS version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
