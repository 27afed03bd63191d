use std::collections::BTreeMap;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse, Result};
use chrono::Local;
use log::error;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{ErrorBody, FeaturesResponse, HealthResponse, IndexResponse};
use crate::service::PredictionService;

pub const ENDPOINTS: [(&str, &str); 4] = [
    ("/predict", "POST - Get meal recommendation"),
    ("/predict_batch", "POST - Get recommendations for multiple meals"),
    ("/features", "GET - Get model feature information"),
    ("/health", "GET - Health check"),
];

/// Registers every route plus a JSON extractor that answers bad bodies with 400.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorBody {
            error: err.to_string(),
            trace: None,
        };
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json)
        .service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/features").route(web::get().to(features)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/predict_batch").route(web::post().to(predict_batch)));
}

pub async fn index(service: web::Data<PredictionService>) -> HttpResponse {
    let store = service.store();
    let accuracy = store.model().accuracy;

    HttpResponse::Ok().json(IndexResponse {
        message: "Enhanced Meal Recommendation ML API is running.",
        model_accuracy: if accuracy != 0.0 {
            format!("{accuracy:.3}")
        } else {
            "N/A".to_string()
        },
        feature_count: store.model().feature_count(),
        model_loaded: store.is_loaded(),
        model_source: store.source(),
        endpoints: ENDPOINTS.into_iter().collect::<BTreeMap<_, _>>(),
    })
}

pub async fn features(service: web::Data<PredictionService>) -> HttpResponse {
    let model = service.model();
    HttpResponse::Ok().json(FeaturesResponse {
        features: model.schema.names(),
        feature_count: model.feature_count(),
        model_accuracy: model.accuracy,
    })
}

pub async fn health(service: web::Data<PredictionService>) -> HttpResponse {
    let store = service.store();
    let loaded = store.is_loaded();
    HttpResponse::Ok().json(HealthResponse {
        status: if loaded { "healthy" } else { "degraded" },
        model_loaded: loaded,
        model_source: store.source(),
        feature_count: store.model().feature_count(),
        model_accuracy: store.model().accuracy,
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
    })
}

pub async fn predict(
    service: web::Data<PredictionService>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let response = service.predict_one(&body).map_err(|e| {
        if let AppError::Inference { trace, .. } = &e {
            error!("prediction failed: {trace}");
        }
        e
    })?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn predict_batch(
    service: web::Data<PredictionService>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let meals = body
        .get("meals")
        .and_then(Value::as_array)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("No meals provided".to_string()))?;

    Ok(HttpResponse::Ok().json(service.predict_batch(meals)))
}
