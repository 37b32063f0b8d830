//! Long-running daemon modules.
//!
//! Each module implements [`Pipeline`](lanwarden_core::pipeline::Pipeline)
//! and is registered with the orchestrator's
//! [`ModuleRegistry`](lanwarden_core::pipeline::ModuleRegistry), which
//! starts and stops them in registration order.
//!
//! ```text
//! CaptureService --AlertEvent--> AlertBus --> AlertMonitor (log)
//!                                        \--> ApiServer /events (websocket)
//! ```

pub mod alert_monitor;
pub mod api_server;

pub use alert_monitor::AlertMonitor;
pub use api_server::ApiServer;
