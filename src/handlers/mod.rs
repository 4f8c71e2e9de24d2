//! HTTP handlers

pub mod health;
pub mod predict;

use actix_web::web;

use crate::predictor::PredictionService;

/// Application state shared across handlers
pub struct AppState {
    /// `None` when the model or its schema failed to load
    pub service: Option<PredictionService>,
}

impl AppState {
    pub fn new(service: Option<PredictionService>) -> Self {
        Self { service }
    }
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/predict", web::post().to(predict::predict_record))
        .route("/predict/profile", web::post().to(predict::predict_profile));
}
