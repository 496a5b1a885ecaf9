/// Structured logging for the classification service
///
/// Wraps `tracing-subscriber` setup: a console layer, an optional
/// append-only file layer, and a level filter that `RUST_LOG` overrides.
/// Pipeline stages log through the `tracing` macros with metric and
/// station/zone identifiers as fields.

use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tracing_fmt};

use crate::model::MetricKind;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Initialize the global subscriber.
///
/// Console output goes to stderr; stdout is reserved for the map report.
/// `RUST_LOG`, when set, takes precedence over `min_level`. A log file that
/// cannot be opened is reported on stderr and skipped. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let ansi = std::io::stderr().is_terminal();
    let mut layers = vec![console_layer(std::io::stderr, console_timestamps, ansi)];

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => layers.push(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Human-readable console layer writing to `writer`.
fn console_layer<W>(writer: W, timestamps: bool, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_fmt::layer()
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer);
    if timestamps {
        layer.boxed()
    } else {
        layer.without_time().boxed()
    }
}

/// Test subscriber writing through the test harness capture.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log a per-metric classification summary.
///
/// Info when every station classified, warn when some were dropped for
/// insufficient data.
pub fn log_classification_summary(metric: MetricKind, total: usize, classified: usize, dropped: usize) {
    if dropped == 0 {
        info!(%metric, total, classified, "classification complete");
    } else {
        warn!(
            %metric,
            total,
            classified,
            dropped,
            "classification complete, stations dropped for insufficient data"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Arc;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Warning.to_string(), "WARN");
    }

    #[derive(Clone, Default)]
    struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl CapturedOutput {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
        }
    }

    impl Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedOutput {
        type Writer = CapturedOutput;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture<F: FnOnce()>(level: LogLevel, f: F) -> Vec<String> {
        let output = CapturedOutput::default();
        let subscriber = tracing_subscriber::registry()
            .with(vec![console_layer(output.clone(), false, false)])
            .with(EnvFilter::new(level.directive()));
        tracing::subscriber::with_default(subscriber, f);
        output.lines()
    }

    #[test]
    fn test_summary_logs_info_when_nothing_dropped() {
        let lines = capture(LogLevel::Debug, || {
            log_classification_summary(MetricKind::Annual, 3, 3, 0);
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("INFO"), "got: {}", lines[0]);
        assert!(lines[0].contains("classification complete"));
        assert!(lines[0].contains("metric=annual"));
    }

    #[test]
    fn test_summary_logs_warn_when_stations_dropped() {
        let lines = capture(LogLevel::Debug, || {
            log_classification_summary(MetricKind::OneHour, 3, 2, 1);
        });
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("WARN"), "got: {}", lines[0]);
        assert!(lines[0].contains("dropped=1"));
    }

    #[test]
    fn test_console_output_stays_on_its_writer() {
        let lines = capture(LogLevel::Warning, || {
            log_classification_summary(MetricKind::Annual, 3, 3, 0);
            log_classification_summary(MetricKind::OneHour, 3, 2, 1);
        });
        assert_eq!(lines.len(), 1, "info summary should be filtered out");
        assert!(!lines[0].contains('\u{1b}'), "no ANSI codes when disabled");
    }
}
