//! Audit log endpoints.

use std::io;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::sync::mpsc;

use lanwarden_core::error::ValidationError;
use lanwarden_core::time::normalize_time;
use lanwarden_core::types::{
    BehaviorLabel, ClassifiedPacketRecord, PacketObservation, TrustState, UNKNOWN,
};
use lanwarden_storage::{CSV_HEADER, PacketFilter, StoredPacket};

use super::{ApiResult, AppState, MessageBody, blocking, message, required, required_mac};

/// CSV lines buffered between the database reader and the socket.
const EXPORT_BUFFER_LINES: usize = 64;

#[derive(Debug, Default, Deserialize)]
pub struct PacketsQuery {
    pub eth_src: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// `GET /get_all_packets?eth_src&date_from&date_to`
///
/// Rows carry the trust state recorded at capture time.
pub async fn get_all_packets(
    State(state): State<AppState>,
    query: Result<Query<PacketsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<StoredPacket>>> {
    let Query(query) = query?;
    let filter = PacketFilter::parse(
        query.eth_src.as_deref(),
        query.date_from.as_deref(),
        query.date_to.as_deref(),
    )?;

    let recorder = state.recorder.clone();
    let rows = blocking(move || Ok(recorder.query(&filter)?)).await?;
    Ok(Json(rows))
}

/// `GET /export_packets`
///
/// Streams the audit log as CSV with each device's current trust state.
/// Rows are read on the blocking pool and forwarded line by line; the
/// reader stops as soon as the client goes away.
pub async fn export_packets(State(state): State<AppState>) -> Response {
    let (tx, rx) = mpsc::channel::<Result<String, io::Error>>(EXPORT_BUFFER_LINES);
    let recorder = state.recorder.clone();

    tokio::task::spawn_blocking(move || {
        if tx.blocking_send(Ok(format!("{CSV_HEADER}\n"))).is_err() {
            return;
        }
        match recorder.export_rows(|row| tx.blocking_send(Ok(row.to_csv_line())).is_ok()) {
            Ok(rows) => tracing::debug!(rows, "packet export finished"),
            Err(e) => {
                tracing::error!(error = %e, "packet export failed");
                let _ = tx.blocking_send(Err(io::Error::other(e.to_string())));
            }
        }
    });

    let lines = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    });

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=packets_report.csv",
            ),
        ],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Port values arrive as either numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Externally produced packet record, keyed like the `packets` table columns.
#[derive(Debug, Deserialize)]
pub struct PacketPayload {
    pub eth_src: Option<String>,
    pub eth_dst: Option<String>,
    #[serde(rename = "IP_proto")]
    pub protocol: Option<String>,
    pub port_src: Option<PortValue>,
    pub port_dst: Option<PortValue>,
    pub size: Option<u64>,
    pub time: Option<String>,
    pub host: Option<String>,
    pub hostname: Option<String>,
    pub classification: Option<String>,
    pub behavior_prediction: Option<String>,
}

impl PacketPayload {
    /// Validate every field before anything is written.
    pub fn into_record(self) -> Result<ClassifiedPacketRecord, ValidationError> {
        let port = |value: Option<PortValue>, field: &str| {
            required(value.map(PortValue::into_string), field)
        };
        let raw_time = required(self.time, "time")?;
        let time = normalize_time(&raw_time).ok_or_else(|| ValidationError::InvalidTimestamp {
            field: "time".to_owned(),
            value: raw_time.clone(),
        })?;

        let classification = match self.classification.filter(|v| !v.trim().is_empty()) {
            Some(value) => value.parse().map_err(|()| ValidationError::InvalidEnum {
                field: "classification".to_owned(),
                value,
                expected: "Trusted, Blocked, Unknown".to_owned(),
            })?,
            None => TrustState::Unknown,
        };
        let behavior_prediction = match self.behavior_prediction.filter(|v| !v.trim().is_empty())
        {
            Some(value) => value.parse().map_err(|()| ValidationError::InvalidEnum {
                field: "behavior_prediction".to_owned(),
                value,
                expected: "Normal, Suspicious, Unknown".to_owned(),
            })?,
            None => BehaviorLabel::Unknown,
        };

        Ok(ClassifiedPacketRecord {
            observation: PacketObservation {
                eth_src: required_mac(self.eth_src, "eth_src")?,
                eth_dst: required_mac(self.eth_dst, "eth_dst")?,
                protocol: required(self.protocol, "IP_proto")?,
                port_src: port(self.port_src, "port_src")?,
                port_dst: port(self.port_dst, "port_dst")?,
                size: self
                    .size
                    .ok_or_else(|| ValidationError::MissingField("size".to_owned()))?,
                time,
                host: self.host.unwrap_or_else(|| UNKNOWN.to_owned()),
                hostname: self.hostname.unwrap_or_else(|| UNKNOWN.to_owned()),
            },
            classification,
            behavior_prediction,
        })
    }
}

/// `POST /store_packet {eth_src, eth_dst, IP_proto, port_src, port_dst, size, time, ...}`
pub async fn store_packet(
    State(state): State<AppState>,
    payload: Result<Json<PacketPayload>, JsonRejection>,
) -> ApiResult<Json<MessageBody>> {
    let Json(packet) = payload?;
    let record = packet.into_record()?;

    let recorder = state.recorder.clone();
    blocking(move || Ok(recorder.append(&record)?)).await?;
    Ok(message("Packet stored successfully."))
}
