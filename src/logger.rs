use std::{str::FromStr, sync::OnceLock, time::Instant};

use fern::colors::{Color, ColoredLevelConfig};
use log::info;
use thiserror::Error;

pub use log::LevelFilter;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Unrecognized log level `{0}`")]
    InvalidLogLevel(String),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(#[from] log::SetLoggerError),
}

/// Parse a level name such as `"info"` or `"debug"`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerInitError> {
    LevelFilter::from_str(level).map_err(|_| LoggerInitError::InvalidLogLevel(level.to_string()))
}

/// Seconds since the logger was initialised
pub fn elapsed_seconds() -> f64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Initialise the logger for this execution. Must only be called once.
pub fn logger_init(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    EPOCH.get_or_init(Instant::now);

    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::BrightBlack)
        .info(Color::White)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            // Debug and trace include the target
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {:5}] {}: {}",
                    elapsed_seconds(),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {:5}] {}",
                    elapsed_seconds(),
                    colors.color(record.level()),
                    message
                ))
            }
        })
        .level(min_level)
        .level_for("plotters", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;

    info!("Logging initialised");
    info!("    Log level: {:?}", min_level);

    Ok(())
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    #[test]
    fn parses_config_level_names() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::Info);
        assert_eq!(parse_level("DEBUG").unwrap(), LevelFilter::Debug);
        assert!(matches!(
            parse_level("loud"),
            Err(LoggerInitError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn elapsed_time_is_monotonic() {
        let first = elapsed_seconds();
        let second = elapsed_seconds();
        assert!(second >= first);
    }
}
