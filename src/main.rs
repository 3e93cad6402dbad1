use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use placement_engine::config::Settings;
use placement_engine::routes::{self, AppState};
use placement_engine::services::{InMemoryStore, MatchingService, Repositories, Snapshot};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn config_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(config_error)?;

    // Initialize logging; LOG_LEVEL and LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting placement engine...");

    let defaults = settings.matching_defaults().map_err(|e| {
        error!("Invalid matching configuration: {}", e);
        config_error(e)
    })?;

    info!("Configuration loaded successfully");

    // Seed the store from a snapshot when one is configured
    let store = match settings.data.snapshot_path.as_deref() {
        Some(path) => {
            let snapshot = Snapshot::load(path).map_err(|e| {
                error!("Failed to load snapshot {}: {}", path, e);
                config_error(e)
            })?;
            info!(
                "Loaded snapshot {} ({} students, {} organizations, {} preferences)",
                path,
                snapshot.students.len(),
                snapshot.organizations.len(),
                snapshot.preferences.len()
            );
            InMemoryStore::from_snapshot(snapshot)
        }
        None => {
            warn!("No snapshot configured, starting with an empty store");
            InMemoryStore::new()
        }
    };

    let service = MatchingService::new(Repositories::from_store(Arc::new(store)), defaults);

    info!(
        "Matching service initialized ({} by default, weights: {:?})",
        defaults.algorithm_type, defaults.weights
    );

    let app_state = AppState::new(service);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
