use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;

use meal_recommender::config::{ServerConfig, TrainingConfig};
use meal_recommender::handlers::{self, ENDPOINTS};
use meal_recommender::service::PredictionService;
use meal_recommender::store::ModelStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    let store = ModelStore::bootstrap(&config, &TrainingConfig::default());
    info!(
        "model ready: source={:?} accuracy={:.3} features={}",
        store.source(),
        store.model().accuracy,
        store.model().feature_count()
    );

    let service = web::Data::new(PredictionService::new(store));

    let (host, port) = config.bind_addr();
    info!("starting meal recommendation API on {host}:{port}");
    for (path, description) in ENDPOINTS {
        info!("  {path:<15} {description}");
    }

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
