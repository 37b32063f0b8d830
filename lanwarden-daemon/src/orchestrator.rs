//! Daemon orchestration -- assembly, lifecycle and shutdown.
//!
//! The [`Orchestrator`] loads configuration, initializes the behavior
//! model and the database, wires the capture service to the alert bus,
//! registers the long-running modules and runs until a shutdown signal.
//!
//! # Startup Order
//!
//! 1. Validate configuration, install metrics recorder
//! 2. Load the behavior model (fail fast)
//! 3. Open the database and normalize legacy rows
//! 4. Build the capture service (shares the daemon shutdown token)
//! 5. Start modules: alert monitor, then HTTP API
//!
//! # Shutdown
//!
//! Cancelling the shutdown token stops an in-flight capture session at
//! the next packet boundary and closes websocket streams. Modules are
//! then stopped in registration order and the PID file is removed.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use lanwarden_capture::CaptureSettings;
use lanwarden_core::config::LanwardenConfig;
use lanwarden_core::event::{MODULE_ALERT_MONITOR, MODULE_API_SERVER};
use lanwarden_core::pipeline::ModuleRegistry;
use lanwarden_pipeline::{AlertBus, BehaviorClassifier, CaptureService, load_model};
use lanwarden_storage::{Database, PacketRecorder, TrustStore};

use crate::api::AppState;
use crate::health::{DaemonHealth, ModuleHealth, aggregate_status};
use crate::metrics_server;
use crate::modules::{AlertMonitor, ApiServer};

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LanwardenConfig,
    /// Long-running modules (ordered for start/stop).
    modules: ModuleRegistry,
    /// State shared with the HTTP handlers.
    state: AppState,
    /// Root shutdown token; capture sessions and modules hold children.
    shutdown: CancellationToken,
    start_time: Instant,
}

impl Orchestrator {
    /// Load `lanwarden.toml` (with environment overrides) and build.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LanwardenConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// - Configuration validation fails
    /// - The behavior model cannot be loaded
    /// - The database cannot be opened or normalized
    pub async fn build_from_config(config: LanwardenConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let model = load_model(&config.model)
            .map_err(|e| anyhow::anyhow!("failed to load behavior model: {}", e))?;
        let classifier = BehaviorClassifier::new(model);

        let (trust, recorder) = open_stores(&config).await?;

        let shutdown = CancellationToken::new();
        let alerts = AlertBus::new(config.alerts.channel_capacity);
        let settings = CaptureSettings::from_core(&config.capture);
        tracing::info!(
            interface = %settings.interface,
            max_packets = settings.max_packets,
            offline = settings.pcap_file.is_some(),
            "capture configured"
        );

        let capture = CaptureService::builder()
            .trust_store(trust.clone())
            .recorder(recorder.clone())
            .classifier(classifier)
            .alert_bus(alerts.clone())
            .settings(settings)
            .shutdown_token(shutdown.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build capture service: {}", e))?;

        let state = AppState {
            capture: Arc::new(capture),
            trust,
            recorder,
            started: Instant::now(),
            shutdown: shutdown.clone(),
        };

        let mut modules = ModuleRegistry::new();
        modules.register(
            MODULE_ALERT_MONITOR,
            Box::new(AlertMonitor::new(alerts, &shutdown)),
        )?;
        if config.server.enabled {
            modules.register(
                MODULE_API_SERVER,
                Box::new(ApiServer::new(&config.server, state.clone())?),
            )?;
        } else {
            tracing::info!("HTTP API disabled in configuration");
        }

        tracing::info!(modules = ?modules.names(), "orchestrator initialized");

        if config.metrics.enabled {
            record_daemon_metrics();
        }

        Ok(Self {
            config,
            modules,
            state,
            shutdown,
            start_time: Instant::now(),
        })
    }

    /// Start all modules and block until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

        self.run_until(async move {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "shutdown signal received");
        })
        .await
    }

    /// Start all modules and run until `stop_signal` resolves.
    pub async fn run_until(&mut self, stop_signal: impl Future<Output = ()>) -> Result<()> {
        let pid_file = (!self.config.general.pid_file.is_empty())
            .then(|| self.config.general.pid_file.clone());
        if let Some(path) = &pid_file {
            write_pid_file(Path::new(path))?;
        }

        tracing::info!("starting modules");
        if let Err(e) = self.modules.start_all().await {
            tracing::warn!(error = %e, "startup failed, rolling back started modules");
            self.shutdown.cancel();
            if let Err(stop_err) = self.modules.stop_all().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            if let Some(path) = &pid_file {
                remove_pid_file(Path::new(path));
            }
            return Err(e.into());
        }

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown.clone()));

        tracing::info!("lanwarden-daemon running");
        stop_signal.await;

        tracing::info!("cancelling capture sessions and background tasks");
        self.shutdown.cancel();

        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        let stopped = self.modules.stop_all().await;

        if let Some(path) = &pid_file {
            remove_pid_file(Path::new(path));
        }

        stopped.map_err(|e| anyhow::anyhow!("failed to stop modules: {}", e))?;
        tracing::info!("lanwarden-daemon shut down");
        Ok(())
    }

    /// Current aggregated health: registered modules plus capture and storage.
    pub async fn health(&self) -> DaemonHealth {
        let mut report = self.state.health().await;
        let mut modules: Vec<ModuleHealth> = self
            .modules
            .health_check_all()
            .await
            .into_iter()
            .map(|(name, status)| ModuleHealth::enabled(name, status))
            .collect();
        modules.append(&mut report.modules);

        report.status = aggregate_status(&modules);
        report.uptime_secs = self.start_time.elapsed().as_secs();
        report.modules = modules;
        report
    }

    /// Handler state (shared with the HTTP API).
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &LanwardenConfig {
        &self.config
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Open the database and canonicalize rows left by earlier versions.
async fn open_stores(config: &LanwardenConfig) -> Result<(TrustStore, PacketRecorder)> {
    let path = config.storage.database_path.clone();
    let busy_timeout = Duration::from_millis(config.storage.busy_timeout_ms);

    tokio::task::spawn_blocking(move || {
        let db = Arc::new(
            Database::open(&path, busy_timeout)
                .map_err(|e| anyhow::anyhow!("failed to open database {}: {}", path, e))?,
        );
        let trust = TrustStore::new(Arc::clone(&db));
        let recorder = PacketRecorder::new(db);

        let trust_rows = trust
            .normalize_existing()
            .map_err(|e| anyhow::anyhow!("failed to normalize trust tables: {}", e))?;
        let packet_rows = recorder
            .normalize_existing()
            .map_err(|e| anyhow::anyhow!("failed to normalize audit log: {}", e))?;
        if trust_rows + packet_rows > 0 {
            tracing::info!(trust_rows, packet_rows, "legacy rows normalized");
        }

        Ok((trust, recorder))
    })
    .await
    .map_err(|e| anyhow::anyhow!("database initialization task failed: {}", e))?
}

/// Write the current process PID to a file.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with mode 0o700, the file with 0o600
pub(crate) fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .mode(0o700)
                .recursive(true)
                .create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !file.metadata()?.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{pid}")?;

    tracing::info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file. Logs but never fails.
pub(crate) fn remove_pid_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "PID file removed"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file"),
    }
}

fn record_daemon_metrics() {
    use lanwarden_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Refresh the uptime gauge every 10 seconds until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    use lanwarden_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
