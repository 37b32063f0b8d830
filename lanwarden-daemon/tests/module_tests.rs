//! Module lifecycle tests.
//!
//! Starts the HTTP API server on an ephemeral port and talks to it over
//! a plain TCP socket.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use lanwarden_capture::{CaptureSettings, FrameSource, MemoryFrameSource, NoopResolver};
use lanwarden_core::config::ServerConfig;
use lanwarden_core::error::ModelError;
use lanwarden_core::pipeline::{ModuleRegistry, Pipeline};
use lanwarden_daemon::api::AppState;
use lanwarden_daemon::modules::{AlertMonitor, ApiServer};
use lanwarden_pipeline::{
    AlertBus, BehaviorClassifier, BehaviorModel, CaptureService, FeatureVector,
};
use lanwarden_storage::{Database, PacketRecorder, TrustStore};

struct AlwaysNormal;

impl BehaviorModel for AlwaysNormal {
    fn predict(&self, _: &FeatureVector) -> Result<i64, ModelError> {
        Ok(0)
    }

    fn describe(&self) -> String {
        "always normal".to_owned()
    }
}

fn state(shutdown: &CancellationToken, alerts: &AlertBus) -> AppState {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let trust = TrustStore::new(Arc::clone(&db));
    let recorder = PacketRecorder::new(db);
    let capture = CaptureService::builder()
        .trust_store(trust.clone())
        .recorder(recorder.clone())
        .classifier(BehaviorClassifier::new(Arc::new(AlwaysNormal)))
        .alert_bus(alerts.clone())
        .source_factory(Arc::new(|_: &CaptureSettings| {
            Ok(Box::new(MemoryFrameSource::new(Vec::new())) as Box<dyn FrameSource>)
        }))
        .resolver(Arc::new(NoopResolver))
        .shutdown_token(shutdown.clone())
        .build()
        .unwrap();

    AppState {
        capture: Arc::new(capture),
        trust,
        recorder,
        started: Instant::now(),
        shutdown: shutdown.clone(),
    }
}

fn ephemeral() -> ServerConfig {
    ServerConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 0,
    }
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_api_server_serves_health() {
    // Given: An API server on an ephemeral port
    let shutdown = CancellationToken::new();
    let alerts = AlertBus::new(8);
    let mut server = ApiServer::new(&ephemeral(), state(&shutdown, &alerts)).unwrap();
    assert!(server.health_check().await.is_unhealthy());

    // When: Started and queried
    server.start().await.unwrap();
    let addr = server.local_addr().expect("bound address");
    let response = http_get(addr, "/health").await;

    // Then: Health answers 200 with a JSON body
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains("\"uptime_secs\""));
    assert!(server.health_check().await.is_healthy());

    server.stop().await.unwrap();
    assert!(server.health_check().await.is_unhealthy());
}

#[tokio::test]
async fn test_api_server_rejects_bad_listen_addr() {
    let shutdown = CancellationToken::new();
    let alerts = AlertBus::new(8);
    let config = ServerConfig {
        listen_addr: "not an address".to_owned(),
        ..ephemeral()
    };
    let err = ApiServer::new(&config, state(&shutdown, &alerts))
        .err()
        .expect("invalid address")
        .to_string();
    assert!(err.contains("server.listen_addr"), "got: {err}");
}

#[tokio::test]
async fn test_registry_starts_and_stops_modules_in_order() {
    // Given: Both daemon modules registered
    let shutdown = CancellationToken::new();
    let alerts = AlertBus::new(8);
    let mut registry = ModuleRegistry::new();
    registry
        .register("alert-monitor", Box::new(AlertMonitor::new(alerts.clone(), &shutdown)))
        .unwrap();
    registry
        .register(
            "api-server",
            Box::new(ApiServer::new(&ephemeral(), state(&shutdown, &alerts)).unwrap()),
        )
        .unwrap();

    // When: Starting all
    registry.start_all().await.unwrap();

    // Then: Both report healthy and the monitor is subscribed
    let statuses = registry.health_check_all().await;
    assert!(statuses.iter().all(|(_, s)| s.is_healthy()), "{statuses:?}");
    assert!(alerts.subscriber_count() >= 1);

    // And: Daemon shutdown followed by stop_all completes cleanly
    shutdown.cancel();
    registry.stop_all().await.unwrap();
    let statuses = registry.health_check_all().await;
    assert!(statuses.iter().all(|(_, s)| s.is_unhealthy()));
}

#[tokio::test]
async fn test_duplicate_module_name_rejected() {
    let shutdown = CancellationToken::new();
    let alerts = AlertBus::new(8);
    let mut registry = ModuleRegistry::new();
    registry
        .register("alert-monitor", Box::new(AlertMonitor::new(alerts.clone(), &shutdown)))
        .unwrap();
    assert!(
        registry
            .register("alert-monitor", Box::new(AlertMonitor::new(alerts, &shutdown)))
            .is_err()
    );
}
