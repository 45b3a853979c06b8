use std::error::Error;
use tracing::Level;

/// Console logging setup for binaries embedding the sink.
///
/// The sink itself only emits `tracing` events; installing a subscriber
/// is left to the application. This is a convenience for demos and
/// small services.
///
/// **Fields**
/// - `level`: most verbose level that is printed.
/// - `with_target`: print the event target (module path).
/// - `ansi`: colored output.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: Level,
    pub with_target: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: true,
            ansi: true,
        }
    }
}

/// Install a global `fmt` subscriber described by `config`.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_max_level(config.level)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
}

pub fn init_logging_with_level(level: Level) -> Result<(), Box<dyn Error + Send + Sync>> {
    init_logging_with_config(LoggingConfig {
        level,
        ..LoggingConfig::default()
    })
}

/// Initialize console logging with sensible defaults.
pub fn init_logging() -> Result<(), Box<dyn Error + Send + Sync>> {
    init_logging_with_config(LoggingConfig::default())
}
