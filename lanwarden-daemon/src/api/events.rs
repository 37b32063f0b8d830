//! `GET /events` -- websocket alert stream.
//!
//! Each alert is pushed as a text frame
//! `{"event": "suspicious_behavior", "data": {mac, type, message, time}}`.
//! Delivery is at-most-once: a socket that falls behind skips the
//! alerts it missed and keeps going.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use lanwarden_core::event::{AlertEvent, AlertPayload, EVENT_SUSPICIOUS_BEHAVIOR};

use super::AppState;

#[derive(Debug, Serialize)]
struct EventFrame {
    event: &'static str,
    data: AlertPayload,
}

/// Render one alert as a websocket text frame.
pub fn event_frame(alert: &AlertEvent) -> serde_json::Result<String> {
    serde_json::to_string(&EventFrame {
        event: EVENT_SUSPICIOUS_BEHAVIOR,
        data: alert.payload(),
    })
}

pub async fn events(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the upgrade so alerts published during the handshake are kept.
    let alerts = state.capture.alerts().subscribe();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| forward_alerts(socket, alerts, shutdown))
}

async fn forward_alerts(
    socket: WebSocket,
    mut alerts: broadcast::Receiver<AlertEvent>,
    shutdown: CancellationToken,
) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("event subscriber connected");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // client frames carry nothing
                Some(Ok(_)) => {}
            },
            alert = alerts.recv() => match alert {
                Ok(alert) => {
                    let frame = match event_frame(&alert) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode alert frame");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagging, alerts skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("event subscriber disconnected");
}
