//! Application layer: the sample tree used by the CLI
//!
//! This layer orchestrates domain logic for the command line front end.

pub mod error;
pub mod error_ext;
pub mod sample;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use sample::{SampleTree, SAMPLE_LABELS};
