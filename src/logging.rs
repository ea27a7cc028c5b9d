#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Overrides `log.level`; accepts full `EnvFilter` directives.
pub const LOG_ENV: &str = "TASKDECK_LOG";

/// Installs the global stderr subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(format!("taskdeck={default_level}")))
        .unwrap_or_else(|_| EnvFilter::new("taskdeck=warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
