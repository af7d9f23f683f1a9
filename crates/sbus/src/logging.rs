use clap::ValueEnum;
use sbus_transport::LogContext;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Severity names accepted by `--log-level`; the same set the channel logger uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Off,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Warning => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Off => tracing::level_filters::LevelFilter::OFF,
        }
    }

    pub fn as_channel_level(self) -> sbus_transport::LogLevel {
        match self {
            LogLevel::Debug => sbus_transport::LogLevel::Debug,
            LogLevel::Info => sbus_transport::LogLevel::Info,
            LogLevel::Warning => sbus_transport::LogLevel::Warning,
            LogLevel::Error => sbus_transport::LogLevel::Error,
            LogLevel::Critical => sbus_transport::LogLevel::Critical,
            LogLevel::Off => sbus_transport::LogLevel::Off,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

/// Logging context handed to channels and senders created by this process.
pub fn channel_log(level: LogLevel, container_id: &str) -> LogContext {
    LogContext::start(level.as_channel_level(), container_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_maps_to_error_filter() {
        assert_eq!(
            LogLevel::Critical.as_filter(),
            tracing::level_filters::LevelFilter::ERROR
        );
        assert_eq!(
            LogLevel::Critical.as_channel_level(),
            sbus_transport::LogLevel::Critical
        );
    }

    #[test]
    fn channel_log_carries_container_label() {
        let log = channel_log(LogLevel::Warning, "c-42");
        assert_eq!(log.label(), "CONT #c-42: sbus");
        assert_eq!(log.level(), sbus_transport::LogLevel::Warning);
    }
}
