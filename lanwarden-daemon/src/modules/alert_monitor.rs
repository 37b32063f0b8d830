//! Alert monitor module.
//!
//! Subscribes to the [`AlertBus`] and writes every suspicious-behavior
//! alert to the log, so alerts leave a trace even when no websocket
//! client is connected.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lanwarden_core::error::{LanwardenError, PipelineError};
use lanwarden_core::event::Event;
use lanwarden_core::pipeline::{HealthStatus, Pipeline};
use lanwarden_pipeline::AlertBus;

pub struct AlertMonitor {
    alerts: AlertBus,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AlertMonitor {
    pub fn new(alerts: AlertBus, shutdown: &CancellationToken) -> Self {
        Self {
            alerts,
            stop: shutdown.child_token(),
            task: None,
        }
    }
}

impl Pipeline for AlertMonitor {
    async fn start(&mut self) -> Result<(), LanwardenError> {
        if self.task.is_some() {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let mut rx = self.alerts.subscribe();
        let stop = self.stop.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        tracing::debug!("alert monitor shutting down");
                        break;
                    }
                    received = rx.recv() => match received {
                        Ok(alert) => {
                            tracing::warn!(
                                alert_id = %alert.event_id(),
                                trace_id = %alert.metadata().trace_id,
                                mac = %alert.mac,
                                alarm = %alert.alarm_type,
                                time = %alert.time,
                                "{}",
                                alert.message
                            );
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "alert monitor lagging, alerts skipped");
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("alert bus closed, exiting monitor");
                            break;
                        }
                    },
                }
            }
        }));

        tracing::info!("alert monitor started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LanwardenError> {
        let Some(task) = self.task.take() else {
            tracing::debug!("alert monitor not running, nothing to stop");
            return Ok(());
        };
        self.stop.cancel();
        task.await
            .map_err(|e| PipelineError::StopFailed(format!("alert monitor task: {e}")))?;
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match &self.task {
            Some(task) if !task.is_finished() => HealthStatus::Healthy,
            Some(_) => HealthStatus::Unhealthy("monitor task exited".to_owned()),
            None => HealthStatus::Unhealthy("not running".to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use lanwarden_core::event::AlertEvent;
    use lanwarden_core::types::{MacAddr, TrustState};

    use super::*;

    #[tokio::test]
    async fn test_monitor_lifecycle() {
        // Given: A monitor attached to a bus
        let bus = AlertBus::new(8);
        let shutdown = CancellationToken::new();
        let mut monitor = AlertMonitor::new(bus.clone(), &shutdown);
        assert!(monitor.health_check().await.is_unhealthy());

        // When: Started, it subscribes and consumes alerts
        monitor.start().await.unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(AlertEvent::suspicious(
            MacAddr::from_octets([0xaa, 0, 0, 0, 0, 1]),
            TrustState::Unknown,
            "2024-01-01T00:00:00.000000",
            "trace",
        ));
        assert!(monitor.health_check().await.is_healthy());

        // Then: Stop completes and a second stop is a no-op
        monitor.stop().await.unwrap();
        monitor.stop().await.unwrap();
        assert!(monitor.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let shutdown = CancellationToken::new();
        let mut monitor = AlertMonitor::new(AlertBus::new(8), &shutdown);
        monitor.start().await.unwrap();
        assert!(monitor.start().await.is_err());
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_daemon_shutdown_ends_task() {
        let shutdown = CancellationToken::new();
        let mut monitor = AlertMonitor::new(AlertBus::new(8), &shutdown);
        monitor.start().await.unwrap();

        shutdown.cancel();
        monitor.stop().await.unwrap();
    }
}
