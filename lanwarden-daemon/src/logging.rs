//! Tracing subscriber setup.
//!
//! `general.log_level` seeds the filter unless `RUST_LOG` is set.
//! HTTP internals are capped at `warn` so request plumbing does not
//! drown out capture and alert events.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use lanwarden_core::config::GeneralConfig;

/// Targets that stay at `warn` regardless of the configured level.
const QUIET_TARGETS: [&str; 3] = ["hyper", "hyper_util", "tower"];

/// Install the global subscriber. Call once, before the first event.
///
/// `log_format` is `json` (one object per line, with span context) or
/// `pretty`.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter_directives(&config.log_level))
            .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", config.log_level, e))?,
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer().pretty().boxed(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Filter string for `level` with the quiet targets appended.
fn filter_directives(level: &str) -> String {
    let mut directives = level.to_owned();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}
