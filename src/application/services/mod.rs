//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem) but are themselves
//! concrete structs, not traits.

mod dataset;
mod prediction;

pub use dataset::{parse_csv, render_csv, AttributeInfo, DatasetService};
pub use prediction::{Prediction, PredictionService, PredictionSummary};
