//! Data loading, feature projection and the persisted feature schema

pub mod csv_loader;
pub mod features;
pub mod schema;

// Re-export commonly used types
pub use csv_loader::{load_raw_records, training_frame, write_training_table, LABEL_COLUMN};
pub use features::{
    transform_record, FeatureProjector, FeatureRow, FeatureSlot, FeatureValue, Projection,
    ProjectionMode, TransformedRecord, FEATURE_CANDIDATES,
};
pub use schema::{SchemaMetadata, SCHEMA_FORMAT_VERSION};
