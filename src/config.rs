//! Runtime configuration
//!
//! Paths and thresholds are passed explicitly into the pipeline entry points.
//! `from_env` is only a convenience for the binaries.

use std::path::PathBuf;

use crate::core::DEFAULT_MIN_OPERATING_YEARS;

const DEFAULT_DATASET_PATH: &str = "data/startups.csv";
const DEFAULT_MODEL_PATH: &str = "models/startup_success.onnx";
const DEFAULT_METADATA_PATH: &str = "models/schema_metadata.json";

/// Locations of the dataset and model artifacts plus the label threshold
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub min_operating_years: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            min_operating_years: DEFAULT_MIN_OPERATING_YEARS,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `DATASET_PATH`, `MODEL_PATH`, `METADATA_PATH`
    /// and `MIN_OPERATING_YEARS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            dataset_path: lookup("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_path),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            metadata_path: lookup("METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_path),
            min_operating_years: lookup("MIN_OPERATING_YEARS")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.min_operating_years),
        }
    }
}

/// HTTP bind address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HOST` and `PORT`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
