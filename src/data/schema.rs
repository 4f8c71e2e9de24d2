//! Frozen feature schema shared by training and serving
//!
//! The schema is written once at the end of a training run and loaded
//! read-only by every serving process. On disk it is a versioned JSON
//! document; loading re-derives the categorical indices and rejects any
//! artifact whose stored indices disagree.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Artifact format written by this version
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

/// Ordered feature names plus which of them are categorical
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaArtifact", into = "SchemaArtifact")]
pub struct SchemaMetadata {
    feature_order: Vec<String>,
    categorical_features: Vec<String>,
    categorical_indices: Vec<usize>,
}

/// On-disk representation of [`SchemaMetadata`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaArtifact {
    format_version: u32,
    feature_order: Vec<String>,
    categorical_features: Vec<String>,
    categorical_indices: Vec<usize>,
}

impl SchemaMetadata {
    /// Build a schema, deriving `categorical_indices`.
    ///
    /// Fails if the order is empty, a name repeats or a categorical feature is
    /// not part of the feature order.
    pub fn new(feature_order: Vec<String>, categorical_features: Vec<String>) -> Result<Self> {
        if feature_order.is_empty() {
            return Err(PipelineError::configuration("feature order is empty"));
        }

        let mut seen = HashSet::new();
        for name in &feature_order {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::configuration(format!(
                    "duplicate feature '{}' in feature order",
                    name
                )));
            }
        }

        let mut seen_categorical = HashSet::new();
        let mut categorical_indices = Vec::with_capacity(categorical_features.len());
        for name in &categorical_features {
            if !seen_categorical.insert(name.as_str()) {
                return Err(PipelineError::configuration(format!(
                    "duplicate categorical feature '{}'",
                    name
                )));
            }
            let index = feature_order.iter().position(|f| f == name).ok_or_else(|| {
                PipelineError::configuration(format!(
                    "categorical feature '{}' is not in the feature order",
                    name
                ))
            })?;
            categorical_indices.push(index);
        }

        Ok(Self {
            feature_order,
            categorical_features,
            categorical_indices,
        })
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    pub fn categorical_features(&self) -> &[String] {
        &self.categorical_features
    }

    /// Position of each categorical feature within the feature order
    pub fn categorical_indices(&self) -> &[usize] {
        &self.categorical_indices
    }

    pub fn len(&self) -> usize {
        self.feature_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_order.is_empty()
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical_features.iter().any(|c| c == name)
    }

    /// Write the schema artifact as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::configuration(format!("cannot serialize schema: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::persistence(parent, e))?;
        }
        fs::write(path, json).map_err(|e| PipelineError::persistence(path, e))?;

        info!(
            "Saved feature schema ({} features, {} categorical) to {:?}",
            self.len(),
            self.categorical_features.len(),
            path
        );
        Ok(())
    }

    /// Load and validate a schema artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PipelineError::persistence(path, e))?;
        let metadata = Self::from_json(&content)?;

        info!(
            "Loaded feature schema ({} features) from {:?}",
            metadata.len(),
            path
        );
        Ok(metadata)
    }

    /// Parse and validate a schema artifact from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PipelineError::configuration(format!("invalid schema artifact: {}", e)))
    }
}

impl TryFrom<SchemaArtifact> for SchemaMetadata {
    type Error = PipelineError;

    fn try_from(artifact: SchemaArtifact) -> Result<Self> {
        if artifact.format_version != SCHEMA_FORMAT_VERSION {
            return Err(PipelineError::configuration(format!(
                "unsupported schema format version {} (expected {})",
                artifact.format_version, SCHEMA_FORMAT_VERSION
            )));
        }

        let metadata = SchemaMetadata::new(artifact.feature_order, artifact.categorical_features)?;
        if metadata.categorical_indices != artifact.categorical_indices {
            return Err(PipelineError::configuration(format!(
                "categorical indices {:?} do not match feature order (expected {:?})",
                artifact.categorical_indices, metadata.categorical_indices
            )));
        }

        Ok(metadata)
    }
}

impl From<SchemaMetadata> for SchemaArtifact {
    fn from(metadata: SchemaMetadata) -> Self {
        Self {
            format_version: SCHEMA_FORMAT_VERSION,
            feature_order: metadata.feature_order,
            categorical_features: metadata.categorical_features,
            categorical_indices: metadata.categorical_indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> SchemaMetadata {
        SchemaMetadata::new(
            names(&[
                "funding_total_usd",
                "funding_total_log",
                "funding_rounds",
                "country_code",
                "city",
                "main_category",
            ]),
            names(&["country_code", "city", "main_category"]),
        )
        .unwrap()
    }

    #[test]
    fn test_indices_are_derived() {
        let metadata = sample();
        assert_eq!(metadata.categorical_indices(), &[3, 4, 5]);
        for (i, name) in metadata.categorical_features().iter().enumerate() {
            let pos = metadata.feature_order().iter().position(|f| f == name).unwrap();
            assert_eq!(metadata.categorical_indices()[i], pos);
        }
        assert!(metadata.is_categorical("city"));
        assert!(!metadata.is_categorical("funding_rounds"));
    }

    #[test]
    fn test_indices_follow_categorical_order() {
        let metadata =
            SchemaMetadata::new(names(&["a", "b", "c"]), names(&["c", "a"])).unwrap();
        assert_eq!(metadata.categorical_indices(), &[2, 0]);
    }

    #[test]
    fn test_rejects_unknown_categorical() {
        let err = SchemaMetadata::new(names(&["a", "b"]), names(&["z"])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(SchemaMetadata::new(names(&["a", "a"]), vec![]).is_err());
        assert!(SchemaMetadata::new(names(&["a", "b"]), names(&["a", "a"])).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let metadata = sample();
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"format_version\":1"));
        assert!(json.contains("\"categorical_indices\":[3,4,5]"));

        let restored = SchemaMetadata::from_json(&json).unwrap();
        assert_eq!(restored, metadata);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("schema_metadata.json");

        let metadata = sample();
        metadata.save(&path).unwrap();
        let restored = SchemaMetadata::load(&path).unwrap();

        assert_eq!(restored.feature_order(), metadata.feature_order());
        assert_eq!(restored.categorical_features(), metadata.categorical_features());
        assert_eq!(restored.categorical_indices(), metadata.categorical_indices());
    }

    #[test]
    fn test_load_rejects_inconsistent_indices() {
        let json = r#"{
            "format_version": 1,
            "feature_order": ["funding_total_usd", "country_code"],
            "categorical_features": ["country_code"],
            "categorical_indices": [0]
        }"#;
        let err = SchemaMetadata::from_json(json).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_rejects_empty_feature_order() {
        assert!(matches!(
            SchemaMetadata::new(vec![], vec![]),
            Err(PipelineError::Configuration(_))
        ));

        let json = r#"{
            "format_version": 1,
            "feature_order": [],
            "categorical_features": [],
            "categorical_indices": []
        }"#;
        assert!(matches!(
            SchemaMetadata::from_json(json),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_rejects_unsupported_version() {
        let json = r#"{
            "format_version": 99,
            "feature_order": ["a"],
            "categorical_features": [],
            "categorical_indices": []
        }"#;
        assert!(matches!(
            SchemaMetadata::from_json(json),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        assert!(matches!(
            SchemaMetadata::from_json("{ not json"),
            Err(PipelineError::Configuration(_))
        ));
        assert!(matches!(
            SchemaMetadata::from_json(r#"{"feature_order": ["a"]}"#),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaMetadata::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { .. }));
        assert!(err.is_collaborator_failure());
    }
}
