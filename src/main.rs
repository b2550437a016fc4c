use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use weather_route::config::{LoggingSettings, Settings};
use weather_route::routes::{self, AppState};
use weather_route::services::{
    DirectionsClient, PostgresQueryStore, QueryLogger, QueryStore, RouteProvider, WeatherClient,
    WeatherProvider,
};
use weather_route::RouteWeatherPipeline;

fn init_logging(settings: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Configuration is loaded before logging, so report failures on stderr
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging);

    info!("Starting weather route service...");

    // Missing credentials leave the client unset; requests then answer 503
    let directions: Option<Arc<dyn RouteProvider>> =
        match DirectionsClient::new(&settings.directions) {
            Ok(client) => {
                info!("Google Maps directions client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("Directions client disabled: {}", e);
                None
            }
        };

    let weather: Option<Arc<dyn WeatherProvider>> = match WeatherClient::new(&settings.weather) {
        Ok(client) => {
            info!("Weather client initialized (units: {})", settings.weather.units);
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("Weather client disabled: {}", e);
            None
        }
    };

    // Query history is optional - the service works without it
    let store: Option<Arc<dyn QueryStore>> = if settings.database.url.is_some() {
        match PostgresQueryStore::from_settings(&settings.database).await {
            Ok(store) => {
                info!("PostgreSQL query-log store connected");
                Some(Arc::new(store))
            }
            Err(e) => {
                error!("PostgreSQL connection failed ({}), running without query history", e);
                None
            }
        }
    } else {
        warn!("DATABASE_URL not set, running without query history");
        None
    };

    let logger = QueryLogger::new(
        store,
        Duration::from_secs(settings.database.write_timeout_secs),
    );

    let pipeline = RouteWeatherPipeline::new(directions, weather, settings.pipeline.max_waypoints);

    info!("Pipeline initialized (max waypoints: {})", pipeline.max_waypoints());

    let app_state = AppState { pipeline, logger };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
            .default_service(web::route().to(routes::not_found))
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
