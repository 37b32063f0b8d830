//! HTTP API server module.
//!
//! Binds the listener on `start` and serves the router until `stop`,
//! which drains in-flight requests through axum's graceful shutdown.

use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lanwarden_core::config::ServerConfig;
use lanwarden_core::error::{ConfigError, LanwardenError, PipelineError};
use lanwarden_core::pipeline::{HealthStatus, Pipeline};

use crate::api::{self, AppState};

pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
    stop: CancellationToken,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Result<Self, LanwardenError> {
        let addr: SocketAddr = format!("{}:{}", config.listen_addr, config.port)
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.listen_addr".to_owned(),
                reason: format!("{e}"),
            })?;
        let stop = state.shutdown.child_token();
        Ok(Self {
            addr,
            state,
            stop,
            local_addr: None,
            task: None,
        })
    }

    /// Address actually bound (differs from the configured one for port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Pipeline for ApiServer {
    async fn start(&mut self) -> Result<(), LanwardenError> {
        if self.task.is_some() {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let router = api::router(self.state.clone());
        let stop = self.stop.clone();

        self.task = Some(tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "HTTP API server failed");
            }
        }));
        self.local_addr = Some(local_addr);

        tracing::info!(listen_addr = %local_addr, "HTTP API listening");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LanwardenError> {
        let Some(task) = self.task.take() else {
            tracing::debug!("api server not running, nothing to stop");
            return Ok(());
        };
        self.stop.cancel();
        task.await
            .map_err(|e| PipelineError::StopFailed(format!("api server task: {e}")))?;
        tracing::info!("HTTP API stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match &self.task {
            None => HealthStatus::Unhealthy("not running".to_owned()),
            Some(task) if task.is_finished() => {
                HealthStatus::Unhealthy("server task exited".to_owned())
            }
            Some(_) => HealthStatus::Healthy,
        }
    }
}
