//! HTTP API.
//!
//! Routes mirror the endpoints the dashboard already speaks:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET  | `/capture` | run one capture session |
//! | POST | `/update_device` | trust or block a device |
//! | GET  | `/get_devices` | list devices by category |
//! | GET  | `/device_stats` | device counts |
//! | GET  | `/get_blocked_devices` | blocked devices |
//! | POST | `/block-device`, `/unblock-device` | block / move to trusted |
//! | GET  | `/get_all_packets` | filtered audit log |
//! | GET  | `/export_packets` | streamed CSV export |
//! | POST | `/store_packet` | append an external record |
//! | GET  | `/events` | websocket alert stream |
//! | GET  | `/health` | aggregated health |
//!
//! Storage calls are synchronous SQLite work and run on the blocking pool.
//! Cross-origin requests are allowed from any origin, with credentials,
//! so a dashboard served from another port can call the API.

pub mod capture;
pub mod devices;
pub mod error;
pub mod events;
pub mod packets;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use lanwarden_core::error::ValidationError;
use lanwarden_core::pipeline::HealthStatus;
use lanwarden_core::types::MacAddr;
use lanwarden_pipeline::CaptureService;
use lanwarden_storage::{PacketRecorder, TrustStore};

use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};

pub use error::{ApiError, ApiResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub capture: Arc<CaptureService>,
    pub trust: TrustStore,
    pub recorder: PacketRecorder,
    /// Daemon start time (for uptime reporting).
    pub started: Instant,
    /// Cancelled when the daemon shuts down; closes open websockets.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Aggregated health of the components behind the API.
    pub async fn health(&self) -> DaemonHealth {
        let trust = self.trust.clone();
        let storage = match tokio::task::spawn_blocking(move || trust.stats()).await {
            Ok(Ok(_)) => HealthStatus::Healthy,
            Ok(Err(e)) => HealthStatus::Unhealthy(format!("database unavailable: {e}")),
            Err(e) => HealthStatus::Unhealthy(format!("database check failed: {e}")),
        };

        let modules = vec![
            ModuleHealth::enabled("capture", self.capture.health()),
            ModuleHealth::enabled("storage", storage),
        ];

        DaemonHealth {
            status: aggregate_status(&modules),
            uptime_secs: self.started.elapsed().as_secs(),
            modules,
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/capture", get(capture::capture))
        .route("/update_device", post(devices::update_device))
        .route("/get_devices", get(devices::get_devices))
        .route("/device_stats", get(devices::device_stats))
        .route("/get_blocked_devices", get(devices::get_blocked_devices))
        .route("/block-device", post(devices::block_device))
        .route("/unblock-device", post(devices::unblock_device))
        .route("/get_all_packets", get(packets::get_all_packets))
        .route("/export_packets", get(packets::export_packets))
        .route("/store_packet", post(packets::store_packet))
        .route("/events", get(events::events))
        .route("/health", get(health))
        .layer(cors())
        .with_state(state)
}

/// Credentialed CORS: origin, methods and headers are echoed back, since
/// the `*` wildcard is not allowed alongside credentials.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health().await;
    let status = if report.status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

/// `{"message": "..."}` success body.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

pub(crate) fn message(text: impl Into<String>) -> Json<MessageBody> {
    Json(MessageBody {
        message: text.into(),
    })
}

/// Run synchronous storage work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Non-empty, trimmed required field.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::MissingField(field.to_owned()))
}

pub(crate) fn required_mac(value: Option<String>, field: &str) -> Result<MacAddr, ValidationError> {
    required(value, field)?.parse()
}
