//! File-backed tracing setup
//!
//! The terminal belongs to the review UI, so log output goes to a daily
//! rolling file under the app directory instead of stdout.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides `level`.
pub fn init_logging<P: AsRef<Path>>(log_dir: P, level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "mdreview.log");

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(file_appender).with_ansi(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(file_appender).with_ansi(false))
            .try_init()
    };
}
