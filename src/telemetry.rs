#[cfg(feature = "telemetry")]
use std::sync::OnceLock;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize tracing subscriber once per process.
#[cfg(feature = "telemetry")]
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("refstate=info"));
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing() {}

/// Instrument an inline block with a span if telemetry is enabled.
#[macro_export]
macro_rules! instrument_block {
    ($name:expr, $block:block) => {{
        #[cfg(feature = "telemetry")]
        {
            let span = tracing::info_span!("refstate", phase = $name);
            let _guard = span.enter();
            (|| $block)()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            (|| $block)()
        }
    }};
}

/// `tracing::debug!` that compiles away without the telemetry feature.
#[macro_export]
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "telemetry")]
        {
            tracing::debug!($($arg)*);
        }
    };
}

/// `tracing::warn!` that compiles away without the telemetry feature.
#[macro_export]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "telemetry")]
        {
            tracing::warn!($($arg)*);
        }
    };
}
