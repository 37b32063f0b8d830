//! `GET /capture`

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lanwarden_core::types::ClassifiedPacketRecord;
use lanwarden_pipeline::{CaptureRequest, PacketFailure, SessionReport};

use super::AppState;

/// Error body that still carries the packets captured before the failure.
#[derive(Debug, Serialize)]
struct PartialCapture<'a> {
    error: String,
    packets: &'a [ClassifiedPacketRecord],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    failures: &'a [PacketFailure],
}

/// Run one bounded capture session and return the enriched records.
pub async fn capture(State(state): State<AppState>) -> Response {
    let trace_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(trace_id = %trace_id, "capture requested");

    let report = state
        .capture
        .run(CaptureRequest {
            max_packets: None,
            trace_id: Some(trace_id),
        })
        .await;
    session_response(&report)
}

/// Map a session report onto the HTTP contract.
///
/// - capture fault: 500 with the records captured before it
/// - shutdown during the session: 503 with the partial records
/// - per-packet failures: 500 with records and failures
/// - otherwise: 200 with the record array
pub fn session_response(report: &SessionReport) -> Response {
    let partial = |status: StatusCode, error: String| {
        let body = PartialCapture {
            error,
            packets: &report.records,
            failures: &report.failures,
        };
        (status, Json(body)).into_response()
    };

    if let Some(fault) = &report.fault {
        return partial(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("capture failed: {fault}"),
        );
    }
    if report.cancelled {
        return partial(
            StatusCode::SERVICE_UNAVAILABLE,
            "capture cancelled: daemon is shutting down".to_owned(),
        );
    }
    if !report.failures.is_empty() {
        return partial(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} packet(s) could not be processed", report.failures.len()),
        );
    }

    Json(&report.records).into_response()
}
