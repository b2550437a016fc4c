// Integration tests for the weather route HTTP API

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weather_route::config::{DirectionsSettings, WeatherSettings};
use weather_route::models::{Coordinate, QueryLogRecord, RoutePath, WeatherObservation};
use weather_route::routes::{self, AppState};
use weather_route::services::{
    DirectionsClient, LoggingError, QueryLogger, QueryStore, RouteProvider, RoutingError,
    WeatherClient, WeatherFetchError, WeatherProvider,
};
use weather_route::RouteWeatherPipeline;

const NEW_YORK: (f64, f64) = (40.7128, -74.0060);
const HARTFORD: (f64, f64) = (41.7658, -72.6734);
const BOSTON: (f64, f64) = (42.3601, -71.0589);

struct StaticRoute {
    calls: AtomicUsize,
}

impl StaticRoute {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl RouteProvider for StaticRoute {
    async fn compute_route(&self, _start: &str, _end: &str) -> Result<RoutePath, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoutePath {
            distance: "215 mi".to_string(),
            duration: "3 hours 45 mins".to_string(),
            start_address: "New York, NY, USA".to_string(),
            end_address: "Boston, MA, USA".to_string(),
            ordered_points: [NEW_YORK, HARTFORD, BOSTON]
                .iter()
                .map(|&(lat, lon)| Coordinate::new(lat, lon))
                .collect(),
        })
    }
}

struct UnresolvableRoute;

#[async_trait]
impl RouteProvider for UnresolvableRoute {
    async fn compute_route(&self, _start: &str, _end: &str) -> Result<RoutePath, RoutingError> {
        Err(RoutingError::NotFound("NOT_FOUND".into()))
    }
}

/// Weather fake that fails for the listed latitudes
struct FakeWeather {
    calls: AtomicUsize,
    failing_lats: Vec<f64>,
}

impl FakeWeather {
    fn new(failing_lats: Vec<f64>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing_lats,
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn fetch_weather(&self, lat: f64, _lon: f64) -> Result<WeatherObservation, WeatherFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_lats.contains(&lat) {
            return Err(WeatherFetchError::InvalidResponse("operation timed out".into()));
        }
        Ok(WeatherObservation {
            temperature: "18°C".to_string(),
            conditions: "Clouds".to_string(),
            description: "scattered clouds".to_string(),
            humidity: "60%".to_string(),
            wind_speed: "3.6 m/s".to_string(),
        })
    }
}

struct RecordingStore {
    records: std::sync::Mutex<Vec<QueryLogRecord>>,
}

#[async_trait]
impl QueryStore for RecordingStore {
    async fn append(&self, record: &QueryLogRecord) -> Result<(), LoggingError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct OfflineStore;

#[async_trait]
impl QueryStore for OfflineStore {
    async fn append(&self, _record: &QueryLogRecord) -> Result<(), LoggingError> {
        Err(LoggingError::Unavailable("connection refused".into()))
    }
}

fn state(
    routes: Option<Arc<dyn RouteProvider>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    store: Option<Arc<dyn QueryStore>>,
) -> AppState {
    AppState {
        pipeline: RouteWeatherPipeline::new(routes, weather, 3),
        logger: QueryLogger::new(store, Duration::from_secs(1)),
    }
}

async fn post_route_weather(state: AppState, body: Value) -> (StatusCode, Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .configure(routes::configure_routes)
            .default_service(web::route().to(routes::not_found)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/route_weather")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

fn ny_to_boston() -> Value {
    json!({"start_address": "New York, NY", "end_address": "Boston, MA"})
}

#[actix_web::test]
async fn test_all_waypoints_populated() {
    let weather = Arc::new(FakeWeather::new(vec![]));
    let state = state(
        Some(Arc::new(StaticRoute::new())),
        Some(weather.clone() as Arc<dyn WeatherProvider>),
        None,
    );

    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["start_address"], "New York, NY");
    assert_eq!(body["end_address"], "Boston, MA");
    assert_eq!(body["distance"], "215 mi");
    assert_eq!(body["duration"], "3 hours 45 mins");

    let entries = body["weather_data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["weather"].is_object()));
    assert_eq!(entries[0]["location"], "start");
    assert_eq!(entries[2]["location"], "end");
    assert_eq!(weather.calls.load(Ordering::SeqCst), 3);
}

#[actix_web::test]
async fn test_second_waypoint_timeout_degrades_only_that_entry() {
    let weather = Arc::new(FakeWeather::new(vec![HARTFORD.0]));
    let state = state(
        Some(Arc::new(StaticRoute::new()) as Arc<dyn RouteProvider>),
        Some(weather as Arc<dyn WeatherProvider>),
        None,
    );

    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let entries = body["weather_data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries[0]["weather"].is_object());
    assert!(entries[1]["weather"].is_null());
    assert!(entries[2]["weather"].is_object());
    assert_eq!(entries[1]["lat"], HARTFORD.0);
}

#[actix_web::test]
async fn test_routing_failure_is_fatal_and_skips_weather() {
    let weather = Arc::new(FakeWeather::new(vec![]));
    let state = state(
        Some(Arc::new(UnresolvableRoute) as Arc<dyn RouteProvider>),
        Some(weather.clone() as Arc<dyn WeatherProvider>),
        None,
    );

    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("No route found"));
    assert!(body.get("weather_data").is_none());
    assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_empty_start_address_rejected_before_any_call() {
    let routes = Arc::new(StaticRoute::new());
    let weather = Arc::new(FakeWeather::new(vec![]));
    let state = state(
        Some(routes.clone() as Arc<dyn RouteProvider>),
        Some(weather.clone() as Arc<dyn WeatherProvider>),
        None,
    );

    let (status, body) = post_route_weather(
        state,
        json!({"start_address": "", "end_address": "Boston, MA"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Both start_address and end_address are required");
    assert_eq!(routes.calls.load(Ordering::SeqCst), 0);
    assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_missing_field_rejected() {
    let state = state(
        Some(Arc::new(StaticRoute::new())),
        Some(Arc::new(FakeWeather::new(vec![]))),
        None,
    );
    let (status, body) = post_route_weather(state, json!({"start_address": "New York, NY"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_malformed_json_rejected() {
    let state = state(
        Some(Arc::new(StaticRoute::new())),
        Some(Arc::new(FakeWeather::new(vec![]))),
        None,
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/route_weather")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON"));
}

#[actix_web::test]
async fn test_logging_outage_does_not_change_response() {
    let recording = Arc::new(RecordingStore { records: std::sync::Mutex::new(vec![]) });

    let healthy = state(
        Some(Arc::new(StaticRoute::new())),
        Some(Arc::new(FakeWeather::new(vec![HARTFORD.0]))),
        Some(recording.clone() as Arc<dyn QueryStore>),
    );
    let outage = state(
        Some(Arc::new(StaticRoute::new())),
        Some(Arc::new(FakeWeather::new(vec![HARTFORD.0]))),
        Some(Arc::new(OfflineStore)),
    );

    let (healthy_status, healthy_body) = post_route_weather(healthy, ny_to_boston()).await;
    let (outage_status, outage_body) = post_route_weather(outage, ny_to_boston()).await;

    assert_eq!(healthy_status, StatusCode::OK);
    assert_eq!(healthy_status, outage_status);
    assert_eq!(healthy_body, outage_body);

    // The detached write to the healthy store eventually lands
    for _ in 0..50 {
        if !recording.records.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let records = recording.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].waypoint_count, 3);
}

#[actix_web::test]
async fn test_unconfigured_routing_is_service_unavailable() {
    let state = state(None, Some(Arc::new(FakeWeather::new(vec![]))), None);
    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[actix_web::test]
async fn test_health_reports_startup_state() {
    let state = state(
        Some(Arc::new(StaticRoute::new())),
        None,
        Some(Arc::new(OfflineStore)),
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["google_maps_configured"], true);
    assert_eq!(body["weather_api_configured"], false);
    assert_eq!(body["mongodb_connected"], true);
}

#[actix_web::test]
async fn test_unknown_endpoint() {
    let state = state(None, None, None);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes)
            .default_service(web::route().to(routes::not_found)),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/nope").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": false, "error": "Endpoint not found"}));
}

#[actix_web::test]
async fn test_end_to_end_against_mock_providers() {
    use mockito::Matcher;

    let mut maps = mockito::Server::new_async().await;
    let directions_mock = maps
        .mock("GET", "/maps/api/directions/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "status": "OK",
                "routes": [{"legs": [{
                    "distance": {"text": "215 mi"},
                    "duration": {"text": "3 hours 45 mins"},
                    "start_address": "New York, NY, USA",
                    "end_address": "Boston, MA, USA",
                    "start_location": {"lat": NEW_YORK.0, "lng": NEW_YORK.1},
                    "end_location": {"lat": BOSTON.0, "lng": BOSTON.1},
                    "steps": [
                        {"end_location": {"lat": HARTFORD.0, "lng": HARTFORD.1}},
                        {"end_location": {"lat": BOSTON.0, "lng": BOSTON.1}}
                    ]
                }]}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut owm = mockito::Server::new_async().await;
    let failing_mock = owm
        .mock("GET", "/data/2.5/weather")
        .match_query(Matcher::UrlEncoded("lat".into(), HARTFORD.0.to_string()))
        .with_status(504)
        .create_async()
        .await;
    let clear_sky = r#"{"weather":[{"main":"Clear","description":"clear sky"}],"main":{"temp":21.3,"humidity":45},"wind":{"speed":2.2}}"#;
    let start_mock = owm
        .mock("GET", "/data/2.5/weather")
        .match_query(Matcher::UrlEncoded("lat".into(), NEW_YORK.0.to_string()))
        .with_status(200)
        .with_body(clear_sky)
        .create_async()
        .await;
    let end_mock = owm
        .mock("GET", "/data/2.5/weather")
        .match_query(Matcher::UrlEncoded("lat".into(), BOSTON.0.to_string()))
        .with_status(200)
        .with_body(clear_sky)
        .create_async()
        .await;

    let directions = DirectionsClient::new(&DirectionsSettings {
        api_key: Some("maps-key".to_string()),
        base_url: maps.url(),
        timeout_secs: 5,
    })
    .unwrap();
    let weather = WeatherClient::new(&WeatherSettings {
        api_key: Some("owm-key".to_string()),
        base_url: owm.url(),
        units: "metric".to_string(),
        timeout_secs: 5,
    })
    .unwrap();

    let state = state(Some(Arc::new(directions)), Some(Arc::new(weather)), None);
    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    directions_mock.assert_async().await;
    failing_mock.assert_async().await;
    start_mock.assert_async().await;
    end_mock.assert_async().await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let entries = body["weather_data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["weather"]["temperature"], "21.3°C");
    assert!(entries[1]["weather"].is_null());
    assert_eq!(entries[2]["weather"]["conditions"], "Clear");
}

async fn wait_for_record(store: &RecordingStore) -> QueryLogRecord {
    for _ in 0..100 {
        if let Some(record) = store.records.lock().unwrap().first() {
            return record.clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("query record was never written");
}

fn directions_settings(base_url: String, timeout_secs: u64) -> DirectionsSettings {
    DirectionsSettings {
        api_key: Some("SUPERSECRETKEY".to_string()),
        base_url,
        timeout_secs,
    }
}

fn weather_settings(base_url: String, timeout_secs: u64) -> WeatherSettings {
    WeatherSettings {
        api_key: Some("SUPERSECRETAPPID".to_string()),
        base_url,
        units: "metric".to_string(),
        timeout_secs,
    }
}

const CLEAR_SKY: &str = r#"{"weather":[{"main":"Clear","description":"clear sky"}],"main":{"temp":21.3,"humidity":45},"wind":{"speed":2.2}}"#;

/// Minimal weather upstream: answers every request except those for `stall_lat`,
/// which are held open without a response
async fn weather_server_stalling_at(stall_lat: f64) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let stall = format!("lat={}&", stall_lat);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let stall = stall.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") && read < buf.len() {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                }

                if String::from_utf8_lossy(&buf[..read]).contains(&stall) {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    return;
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    CLEAR_SKY.len(),
                    CLEAR_SKY
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    url
}

/// Accepts connections and never answers
async fn stalled_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    url
}

#[actix_web::test]
async fn test_failed_query_history_omits_api_key() {
    let recording = Arc::new(RecordingStore { records: std::sync::Mutex::new(vec![]) });
    // Nothing listens on port 9 locally
    let directions =
        DirectionsClient::new(&directions_settings("http://127.0.0.1:9".to_string(), 5)).unwrap();
    let state = state(
        Some(Arc::new(directions) as Arc<dyn RouteProvider>),
        Some(Arc::new(FakeWeather::new(vec![])) as Arc<dyn WeatherProvider>),
        Some(recording.clone() as Arc<dyn QueryStore>),
    );

    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.to_string().contains("SUPERSECRETKEY"));

    let record = wait_for_record(&recording).await;
    assert!(!record.success);
    let error = record.error.unwrap();
    assert!(error.starts_with("Directions request failed"));
    assert!(!error.contains("SUPERSECRETKEY"));
}

#[actix_web::test]
async fn test_stalled_weather_lookup_degrades_only_that_waypoint() {
    use mockito::Matcher;

    let mut maps = mockito::Server::new_async().await;
    let _directions_mock = maps
        .mock("GET", "/maps/api/directions/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({
                "status": "OK",
                "routes": [{"legs": [{
                    "distance": {"text": "215 mi"},
                    "duration": {"text": "3 hours 45 mins"},
                    "start_location": {"lat": NEW_YORK.0, "lng": NEW_YORK.1},
                    "end_location": {"lat": BOSTON.0, "lng": BOSTON.1},
                    "steps": [
                        {"end_location": {"lat": HARTFORD.0, "lng": HARTFORD.1}},
                        {"end_location": {"lat": BOSTON.0, "lng": BOSTON.1}}
                    ]
                }]}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let weather_url = weather_server_stalling_at(HARTFORD.0).await;
    let directions = DirectionsClient::new(&directions_settings(maps.url(), 5)).unwrap();
    let weather = WeatherClient::new(&weather_settings(weather_url, 1)).unwrap();
    let state = state(
        Some(Arc::new(directions) as Arc<dyn RouteProvider>),
        Some(Arc::new(weather) as Arc<dyn WeatherProvider>),
        None,
    );

    let started = std::time::Instant::now();
    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let entries = body["weather_data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["weather"]["conditions"], "Clear");
    assert!(entries[1]["weather"].is_null());
    assert_eq!(entries[2]["weather"]["conditions"], "Clear");
}

#[actix_web::test]
async fn test_stalled_directions_provider_is_bad_gateway() {
    let weather = Arc::new(FakeWeather::new(vec![]));
    let directions =
        DirectionsClient::new(&directions_settings(stalled_server().await, 1)).unwrap();
    let state = state(
        Some(Arc::new(directions) as Arc<dyn RouteProvider>),
        Some(weather.clone() as Arc<dyn WeatherProvider>),
        None,
    );

    let started = std::time::Instant::now();
    let (status, body) = post_route_weather(state, ny_to_boston()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
}
