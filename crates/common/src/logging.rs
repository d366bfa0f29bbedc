//! Logging setup and configuration
//!
//! Code logs through `tracing` everywhere. On Android the events are routed
//! to logcat via the `log` facade; on other targets a `tracing_subscriber`
//! formatter writes them out.

/// Tag under which the runtime shows up in logcat
pub const LOG_TAG: &str = "UsbDeviceIsoConnection-Native";

/// Setup the log sink for the process
///
/// Fails with `Error::Config` when the level is not understood or a sink has
/// already been installed.
#[cfg(target_os = "android")]
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    use android_logger::Config;
    use log::LevelFilter;
    use std::sync::OnceLock;

    static INSTALLED: OnceLock<LevelFilter> = OnceLock::new();

    let level: LevelFilter = default_level
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid log level {default_level:?}: {e}")))?;

    // init_once ignores repeated calls, so track the first one here.
    INSTALLED.set(level).map_err(|_| {
        crate::Error::Config("Logging already initialised: logcat sink installed".to_string())
    })?;

    android_logger::init_once(
        Config::default()
            .with_tag(LOG_TAG)
            .with_max_level(level),
    );

    Ok(())
}

/// Setup tracing subscriber for the process
///
/// `RUST_LOG` takes precedence over `default_level`.
#[cfg(not(target_os = "android"))]
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Logging already initialised: {}", e)))
}
