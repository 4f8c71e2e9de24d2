//! Startup success - outcome labelling, feature projection and success
//! estimation for venture-backed companies
//!
//! This library provides:
//! - Outcome labels derived from company status and operating age
//! - Feature projection with a persisted, versioned feature schema
//! - Success probability estimation using an ONNX classifier
//! - CSV loading of historical data and export of the training table
//!
//! # Example
//!
//! ```no_run
//! use startup_success::core::LabelBuilder;
//! use startup_success::data::{load_raw_records, FeatureProjector};
//!
//! let records = load_raw_records("data/startups.csv")?;
//! let labels = LabelBuilder::default().build(&records);
//! let (known, _success) = labels.select_known(&records);
//!
//! let projection = FeatureProjector::fit(&known)?;
//! projection.metadata.save("models/schema_metadata.json")?;
//! # Ok::<(), startup_success::PipelineError>(())
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod models;
pub mod predictor;

// HTTP handlers (only available with api feature)
#[cfg(feature = "api")]
pub mod handlers;

// Re-export commonly used types
pub use config::{PipelineConfig, ServerConfig};
pub use crate::core::{LabelBuilder, Labels};
pub use data::{FeatureProjector, FeatureRow, ProjectionMode, SchemaMetadata};
pub use error::{PipelineError, Result};
pub use models::{RawRecord, RawValue, StartupProfile, SuccessEstimate};
pub use predictor::{Classifier, OnnxClassifier, PredictionService};
