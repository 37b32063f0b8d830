//! CLI argument definitions for lanwarden-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use lanwarden_core::config::LanwardenConfig;

/// Lanwarden network device-trust daemon.
///
/// Captures LAN traffic on demand, classifies device behavior,
/// records an audit log and streams suspicious-behavior alerts.
#[derive(Parser, Debug)]
#[command(name = "lanwarden-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to lanwarden.toml configuration file.
    #[arg(short, long, default_value = "/etc/lanwarden/lanwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the file and environment values.
    pub fn apply_overrides(&self, config: &mut LanwardenConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file.clone_from(pid_file);
        }
    }
}
