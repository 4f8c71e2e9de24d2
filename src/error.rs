use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors.
///
/// Per-field data problems are never errors: they resolve to documented
/// defaults inside the label and feature code.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Schema metadata missing or structurally inconsistent where required
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Durable storage could not be read or written
    #[error("failed to access {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset could not be read or written
    #[error("dataset error: {0}")]
    Dataset(#[from] polars::prelude::PolarsError),

    /// External classifier unavailable or returned an unusable result
    #[error("classifier failure: {0}")]
    Classifier(String),
}

impl PipelineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Failures of a collaborator (storage, dataset, classifier) rather than
    /// of this crate's configuration
    pub fn is_collaborator_failure(&self) -> bool {
        !matches!(self, PipelineError::Configuration(_))
    }
}

impl From<ort::Error> for PipelineError {
    fn from(err: ort::Error) -> Self {
        PipelineError::Classifier(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Validate a classifier probability
pub fn validate_probability(prob: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(PipelineError::Classifier(format!(
            "Probability must be between 0 and 1, got {}",
            prob
        )));
    }
    Ok(())
}

#[cfg(feature = "api")]
pub use api::*;

#[cfg(feature = "api")]
mod api {
    use actix_web::{http::StatusCode, HttpResponse, ResponseError};
    use std::fmt;

    use super::PipelineError;
    use crate::models::{ErrorResponse, StartupProfile};

    /// Application error types
    #[derive(Debug)]
    pub enum AppError {
        /// Invalid request data
        ValidationError(String),
        /// Schema metadata missing or inconsistent
        ConfigurationError(String),
        /// No model loaded
        ServiceUnavailable(String),
        /// Classifier or artifact failure
        PredictionError(String),
    }

    impl fmt::Display for AppError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
                AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
                AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
                AppError::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            }
        }
    }

    impl std::error::Error for AppError {}

    impl From<PipelineError> for AppError {
        fn from(err: PipelineError) -> Self {
            match err {
                PipelineError::Configuration(msg) => AppError::ConfigurationError(msg),
                other => AppError::PredictionError(other.to_string()),
            }
        }
    }

    impl ResponseError for AppError {
        fn status_code(&self) -> StatusCode {
            match self {
                AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
                AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AppError::PredictionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }

        fn error_response(&self) -> HttpResponse {
            let (error_code, message) = match self {
                AppError::ValidationError(msg) => ("validation_error", msg.clone()),
                AppError::ConfigurationError(msg) => ("configuration_error", msg.clone()),
                AppError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone()),
                AppError::PredictionError(msg) => ("prediction_error", msg.clone()),
            };

            HttpResponse::build(self.status_code()).json(ErrorResponse {
                error: error_code.to_string(),
                message,
            })
        }
    }

    /// Validation functions
    pub fn validate_funding(amount: f64) -> Result<(), AppError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::ValidationError(format!(
                "Funding total must be a non-negative number, got {}",
                amount
            )));
        }
        Ok(())
    }

    pub fn validate_funding_rounds(rounds: u32) -> Result<(), AppError> {
        if rounds > 100 {
            return Err(AppError::ValidationError(format!(
                "Funding rounds must be at most 100, got {}",
                rounds
            )));
        }
        Ok(())
    }

    pub fn validate_profile(profile: &StartupProfile) -> Result<(), AppError> {
        if let Some(amount) = profile.funding_total {
            validate_funding(amount)?;
        }
        if let Some(rounds) = profile.funding_rounds {
            validate_funding_rounds(rounds)?;
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_validate_funding_valid() {
            assert!(validate_funding(0.0).is_ok());
            assert!(validate_funding(5_000_000.0).is_ok());
        }

        #[test]
        fn test_validate_funding_invalid() {
            assert!(validate_funding(-1.0).is_err());
            assert!(validate_funding(f64::NAN).is_err());
            assert!(validate_funding(f64::INFINITY).is_err());
        }

        #[test]
        fn test_validate_funding_rounds() {
            assert!(validate_funding_rounds(0).is_ok());
            assert!(validate_funding_rounds(12).is_ok());
            assert!(validate_funding_rounds(101).is_err());
        }

        #[test]
        fn test_validate_profile() {
            let mut profile = StartupProfile::default();
            assert!(validate_profile(&profile).is_ok());

            profile.funding_total = Some(-10.0);
            assert!(validate_profile(&profile).is_err());
        }

        #[test]
        fn test_error_display() {
            let err = AppError::ValidationError("test error".to_string());
            assert!(err.to_string().contains("Validation error"));
        }

        #[test]
        fn test_pipeline_error_conversion() {
            let err: AppError = PipelineError::configuration("missing metadata").into();
            assert!(matches!(err, AppError::ConfigurationError(_)));

            let err: AppError = PipelineError::Classifier("boom".to_string()).into();
            assert!(matches!(err, AppError::PredictionError(_)));
        }

        #[test]
        fn test_error_status_codes() {
            assert_eq!(
                AppError::ValidationError("".to_string()).status_code(),
                StatusCode::BAD_REQUEST
            );
            assert_eq!(
                AppError::ServiceUnavailable("".to_string()).status_code(),
                StatusCode::SERVICE_UNAVAILABLE
            );
            assert_eq!(
                AppError::PredictionError("".to_string()).status_code(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
            assert_eq!(
                AppError::ConfigurationError("".to_string()).status_code(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_probability_valid() {
        assert!(validate_probability(0.0).is_ok());
        assert!(validate_probability(0.5).is_ok());
        assert!(validate_probability(1.0).is_ok());
    }

    #[test]
    fn test_validate_probability_invalid() {
        assert!(validate_probability(-0.1).is_err());
        assert!(validate_probability(1.1).is_err());
        assert!(validate_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_collaborator_classification() {
        assert!(!PipelineError::configuration("x").is_collaborator_failure());
        assert!(PipelineError::Classifier("x".to_string()).is_collaborator_failure());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(PipelineError::persistence("a.json", io).is_collaborator_failure());
    }
}
