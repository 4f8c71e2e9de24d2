use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use startup_success::handlers::{configure, AppState};
use startup_success::{PipelineConfig, PredictionService, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(std::io::Error::other)?;

    let server = ServerConfig::from_env();
    let pipeline = PipelineConfig::from_env();

    info!(
        "Loading model {:?} with schema {:?}",
        pipeline.model_path, pipeline.metadata_path
    );

    let service = match PredictionService::load(&pipeline) {
        Ok(s) => {
            info!("Model loaded ({} features)", s.metadata().len());
            Some(s)
        }
        Err(e) => {
            warn!("Failed to load model: {}. Predictions will be unavailable.", e);
            None
        }
    };

    let app_state = Arc::new(AppState::new(service));
    let addr = server.addr();

    info!("Starting Startup Success API server at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&addr)?
    .run()
    .await
}
