use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::error;

use super::AppState;
use crate::error::{validate_profile, AppError};
use crate::models::{RawRecord, StartupProfile};

fn estimate(state: &AppState, record: &RawRecord) -> Result<HttpResponse, AppError> {
    let service = state
        .service
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("model not loaded".to_string()))?;

    let estimate = service.predict(record).map_err(|e| {
        error!("Prediction failed: {}", e);
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(estimate))
}

/// Estimate success for a record in the historical dataset vocabulary
pub async fn predict_record(
    state: web::Data<Arc<AppState>>,
    req: web::Json<RawRecord>,
) -> Result<HttpResponse, AppError> {
    estimate(&state, &req)
}

/// Estimate success from form-style profile fields
pub async fn predict_profile(
    state: web::Data<Arc<AppState>>,
    req: web::Json<StartupProfile>,
) -> Result<HttpResponse, AppError> {
    validate_profile(&req)?;
    estimate(&state, &req.to_raw_record())
}
