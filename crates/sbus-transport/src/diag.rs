//! Diagnostic context for channel events.
//!
//! A [`LogContext`] carries a severity threshold and a label (`CONT #<id>: sbus`).
//! Channels and senders hold one and route their boundary events through it into
//! `tracing`. Clones share state, so [`LogContext::stop`] silences every holder.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SbusError;

/// Emit a `tracing` event through a [`LogContext`], tagged with its label.
macro_rules! sbus_log {
    ($ctx:expr, Debug, $($arg:tt)+) => {
        if $ctx.enabled($crate::diag::LogLevel::Debug) {
            ::tracing::debug!(sbus = %$ctx.label(), $($arg)+);
        }
    };
    ($ctx:expr, Info, $($arg:tt)+) => {
        if $ctx.enabled($crate::diag::LogLevel::Info) {
            ::tracing::info!(sbus = %$ctx.label(), $($arg)+);
        }
    };
    ($ctx:expr, Warning, $($arg:tt)+) => {
        if $ctx.enabled($crate::diag::LogLevel::Warning) {
            ::tracing::warn!(sbus = %$ctx.label(), $($arg)+);
        }
    };
    ($ctx:expr, Error, $($arg:tt)+) => {
        if $ctx.enabled($crate::diag::LogLevel::Error) {
            ::tracing::error!(sbus = %$ctx.label(), $($arg)+);
        }
    };
    ($ctx:expr, Critical, $($arg:tt)+) => {
        if $ctx.enabled($crate::diag::LogLevel::Critical) {
            ::tracing::error!(sbus = %$ctx.label(), critical = true, $($arg)+);
        }
    };
}

pub(crate) use sbus_log;

/// Severity threshold of a [`LogContext`].
///
/// Ordered from most to least verbose. `Critical` admits fewer events than `Error`,
/// and `Off` admits none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Off,
}

impl LogLevel {
    /// Parse a level name. Unknown names fall back to [`LogLevel::Error`].
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_uppercase();
        if name.starts_with("DEBUG") {
            LogLevel::Debug
        } else if name.starts_with("INFO") {
            LogLevel::Info
        } else if name.starts_with("WARNING") {
            LogLevel::Warning
        } else if name.starts_with("CRITICAL") {
            LogLevel::Critical
        } else if name.starts_with("OFF") {
            LogLevel::Off
        } else {
            LogLevel::Error
        }
    }

    /// Upper-case level name.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Off => "OFF",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    label: String,
    level: LogLevel,
    stopped: AtomicBool,
}

/// Leveled, labelled event sink held by channels and senders.
#[derive(Debug, Clone)]
pub struct LogContext {
    inner: Arc<Inner>,
}

impl LogContext {
    /// Start a logging context for the given container id.
    pub fn start(level: LogLevel, container_id: &str) -> Self {
        let ctx = Self::with_label(level, format!("CONT #{container_id}: sbus"));
        sbus_log!(ctx, Error, level = level.as_str(), "logger started");
        ctx
    }

    /// A context that never emits anything.
    pub fn disabled() -> Self {
        Self::with_label(LogLevel::Off, "sbus".to_string())
    }

    fn with_label(level: LogLevel, label: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                label,
                level,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Tear the context down. Later events from any clone are dropped.
    pub fn stop(&self) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        sbus_log!(self, Debug, "logger stopped");
        self.inner.stopped.store(true, Ordering::Release);
    }

    /// Whether [`LogContext::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// The label attached to every event.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The configured threshold.
    pub fn level(&self) -> LogLevel {
        self.inner.level
    }

    /// Whether an event of `severity` passes this context.
    pub fn enabled(&self, severity: LogLevel) -> bool {
        let level = self.inner.level;
        level != LogLevel::Off
            && severity != LogLevel::Off
            && severity >= level
            && !self.is_stopped()
    }

    /// Log a failure at its point of detection and hand it back.
    pub(crate) fn report(&self, op: &'static str, err: SbusError) -> SbusError {
        sbus_log!(self, Error, op, kind = %err.kind(), error = %err, "sbus operation failed");
        err
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn start_line_passes_default_error_threshold() {
        let out = capture(|| {
            LogContext::start(LogLevel::Error, "7");
        });
        assert!(out.contains("logger started"), "got: {out}");
        assert!(out.contains("CONT #7: sbus"));
        assert!(out.contains("ERROR"));
    }

    #[test]
    fn critical_threshold_hides_start_line() {
        let out = capture(|| {
            LogContext::start(LogLevel::Critical, "7");
        });
        assert!(!out.contains("logger started"));
    }

    #[test]
    fn level_names_parse_by_prefix() {
        assert_eq!(LogLevel::from_name("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_name("info"), LogLevel::Info);
        assert_eq!(LogLevel::from_name("WARNING"), LogLevel::Warning);
        assert_eq!(LogLevel::from_name("CRITICAL"), LogLevel::Critical);
        assert_eq!(LogLevel::from_name("OFF"), LogLevel::Off);
        assert_eq!(LogLevel::from_name("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_name("bogus"), LogLevel::Error);
    }

    #[test]
    fn threshold_filters_lower_severities() {
        let ctx = LogContext::start(LogLevel::Warning, "abc");
        assert!(!ctx.enabled(LogLevel::Debug));
        assert!(!ctx.enabled(LogLevel::Info));
        assert!(ctx.enabled(LogLevel::Warning));
        assert!(ctx.enabled(LogLevel::Error));
        assert!(ctx.enabled(LogLevel::Critical));
    }

    #[test]
    fn critical_threshold_drops_errors() {
        let ctx = LogContext::start(LogLevel::Critical, "abc");
        assert!(!ctx.enabled(LogLevel::Error));
        assert!(ctx.enabled(LogLevel::Critical));
    }

    #[test]
    fn off_and_disabled_emit_nothing() {
        let off = LogContext::start(LogLevel::Off, "abc");
        assert!(!off.enabled(LogLevel::Critical));
        assert!(!LogContext::disabled().enabled(LogLevel::Critical));
    }

    #[test]
    fn label_is_per_context() {
        let a = LogContext::start(LogLevel::Debug, "one");
        let b = LogContext::start(LogLevel::Debug, "two");
        assert_eq!(a.label(), "CONT #one: sbus");
        assert_eq!(b.label(), "CONT #two: sbus");
    }

    #[test]
    fn stop_silences_all_clones() {
        let ctx = LogContext::start(LogLevel::Debug, "abc");
        let clone = ctx.clone();
        assert!(clone.enabled(LogLevel::Debug));

        ctx.stop();
        assert!(clone.is_stopped());
        assert!(!clone.enabled(LogLevel::Critical));

        // A second stop is a no-op.
        clone.stop();
    }
}
