use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::data::{FeatureProjector, FeatureRow, SchemaMetadata};
use crate::error::{validate_probability, PipelineError, Result};
use crate::models::{RawRecord, SuccessEstimate};

/// Trained binary classifier over a feature row.
///
/// Implementations consume the row positionally, in schema order.
pub trait Classifier: Send {
    /// Probability of the positive (success) class
    fn predict_proba(&mut self, row: &FeatureRow) -> Result<f64>;
}

/// Input and output tensor names of the exported model
#[derive(Debug, Clone)]
pub struct OnnxIo {
    /// float32 `[1, n]` tensor of numeric features in schema order
    pub numeric_input: String,
    /// string `[1, m]` tensor of categorical features in schema order
    pub categorical_input: String,
    /// `[1, 2]` class probabilities, or `[1, 1]` positive-class probability
    pub probability_output: String,
}

impl Default for OnnxIo {
    fn default() -> Self {
        Self {
            numeric_input: "numeric".to_string(),
            categorical_input: "categorical".to_string(),
            probability_output: "probabilities".to_string(),
        }
    }
}

/// ONNX-based classifier for the exported gradient-boosted model
pub struct OnnxClassifier {
    session: Session,
    io: OnnxIo,
}

impl OnnxClassifier {
    /// Load a model with the default tensor names
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_io(model_path, OnnxIo::default())
    }

    pub fn with_io<P: AsRef<Path>>(model_path: P, io: OnnxIo) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(PipelineError::persistence(
                model_path,
                io::Error::new(io::ErrorKind::NotFound, "model file not found"),
            ));
        }

        info!("Loading model: {:?}", model_path);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;

        Ok(Self { session, io })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&mut self, row: &FeatureRow) -> Result<f64> {
        let numeric: Vec<f32> = row.numeric_values().into_iter().map(|x| x as f32).collect();
        let categorical = row.categorical_values();

        let numeric_tensor = Tensor::from_array(([1usize, numeric.len()], numeric))?;
        let categorical_tensor =
            Tensor::from_string_array(([1usize, categorical.len()], categorical.as_slice()))?;

        let outputs = self.session.run(ort::inputs![
            self.io.numeric_input.as_str() => numeric_tensor,
            self.io.categorical_input.as_str() => categorical_tensor,
        ])?;

        let output = outputs.get(&self.io.probability_output).ok_or_else(|| {
            PipelineError::Classifier(format!(
                "model has no output named '{}'",
                self.io.probability_output
            ))
        })?;
        let (_, probs) = output.try_extract_tensor::<f32>()?;

        // Two-class output: [P(0), P(1)]
        let positive = match probs {
            [_, p1, ..] => *p1,
            [p] => *p,
            [] => {
                return Err(PipelineError::Classifier(
                    "model returned an empty probability tensor".to_string(),
                ))
            }
        };

        Ok(positive as f64)
    }
}

/// Serving-side pipeline: schema enforcement followed by the classifier.
///
/// The schema is read-only after load. The classifier sits behind a mutex
/// because inference needs `&mut`.
pub struct PredictionService {
    classifier: Mutex<Box<dyn Classifier>>,
    metadata: Arc<SchemaMetadata>,
}

impl PredictionService {
    pub fn new(classifier: Box<dyn Classifier>, metadata: SchemaMetadata) -> Self {
        Self {
            classifier: Mutex::new(classifier),
            metadata: Arc::new(metadata),
        }
    }

    /// Load the model and its schema from the configured paths
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let metadata = SchemaMetadata::load(&config.metadata_path)?;
        let classifier = OnnxClassifier::new(&config.model_path)?;
        Ok(Self::new(Box::new(classifier), metadata))
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        &self.metadata
    }

    /// Project a record under the frozen schema
    pub fn features(&self, record: &RawRecord) -> FeatureRow {
        FeatureProjector::apply(record, &self.metadata)
    }

    /// Estimate the success probability of one company.
    ///
    /// Classifier failures propagate; there is no fallback estimate.
    pub fn predict(&self, record: &RawRecord) -> Result<SuccessEstimate> {
        let row = self.features(record);

        let probability = {
            let mut classifier = self
                .classifier
                .lock()
                .map_err(|_| PipelineError::Classifier("classifier lock poisoned".to_string()))?;
            classifier.predict_proba(&row)?
        };
        validate_probability(probability)?;

        debug!("Predicted success probability {:.4}", probability);
        Ok(SuccessEstimate::from_probability(probability))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::FeatureValue;

    /// Logistic score on log funding and round count
    pub(crate) struct StubClassifier {
        pub calls: usize,
    }

    impl Classifier for StubClassifier {
        fn predict_proba(&mut self, row: &FeatureRow) -> Result<f64> {
            self.calls += 1;
            let log_funding = row
                .get("funding_total_log")
                .and_then(FeatureValue::as_f64)
                .unwrap_or(0.0);
            let rounds = row
                .get("funding_rounds")
                .and_then(FeatureValue::as_f64)
                .unwrap_or(0.0);
            let z = 0.2 * log_funding + 0.3 * rounds - 4.0;
            Ok(1.0 / (1.0 + (-z).exp()))
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict_proba(&mut self, _row: &FeatureRow) -> Result<f64> {
            Err(PipelineError::Classifier("model unavailable".to_string()))
        }
    }

    struct OutOfRangeClassifier;

    impl Classifier for OutOfRangeClassifier {
        fn predict_proba(&mut self, _row: &FeatureRow) -> Result<f64> {
            Ok(1.7)
        }
    }

    pub(crate) fn sample_metadata() -> SchemaMetadata {
        let records = vec![RawRecord::new()
            .with("funding_total_usd", "1000")
            .with("country_code", "USA")
            .with("state_code", "CA")
            .with("region", "SF Bay Area")
            .with("city", "San Francisco")
            .with("category_list", "Software")];
        FeatureProjector::fit(&records).unwrap().metadata
    }

    pub(crate) fn stub_service() -> PredictionService {
        PredictionService::new(Box::new(StubClassifier { calls: 0 }), sample_metadata())
    }

    #[test]
    fn test_predict_returns_estimate() {
        let service = stub_service();
        let record = RawRecord::new()
            .with("funding_total_usd", "5000000")
            .with("funding_rounds", 3i64)
            .with("category_list", "Software|Analytics");

        let estimate = service.predict(&record).unwrap();
        assert!(estimate.success_probability > 0.0 && estimate.success_probability < 1.0);
        assert!(
            (estimate.success_probability_percent - estimate.success_probability * 100.0).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_predict_more_funding_scores_higher() {
        let service = stub_service();
        let low = service
            .predict(&RawRecord::new().with("funding_total_usd", "1000"))
            .unwrap();
        let high = service
            .predict(
                &RawRecord::new()
                    .with("funding_total_usd", "50000000")
                    .with("funding_rounds", 6i64),
            )
            .unwrap();
        assert!(high.success_probability > low.success_probability);
    }

    #[test]
    fn test_features_follow_schema() {
        let service = stub_service();
        let row = service.features(&RawRecord::new().with("unrelated", "x"));
        let names: Vec<&str> = row.names().collect();
        let expected: Vec<&str> = service
            .metadata()
            .feature_order()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let service = PredictionService::new(Box::new(FailingClassifier), sample_metadata());
        let err = service.predict(&RawRecord::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Classifier(_)));
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        let service = PredictionService::new(Box::new(OutOfRangeClassifier), sample_metadata());
        assert!(service.predict(&RawRecord::new()).is_err());
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            model_path: dir.path().join("model.onnx"),
            metadata_path: dir.path().join("schema.json"),
            ..PipelineConfig::default()
        };
        let err = PredictionService::load(&config).err().unwrap();
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }

    #[test]
    fn test_load_missing_model_after_schema() {
        let dir = tempfile::tempdir().unwrap();
        let metadata_path = dir.path().join("schema.json");
        sample_metadata().save(&metadata_path).unwrap();

        let config = PipelineConfig {
            model_path: dir.path().join("model.onnx"),
            metadata_path,
            ..PipelineConfig::default()
        };
        let err = PredictionService::load(&config).err().unwrap();
        assert!(err.is_collaborator_failure());
    }
}
