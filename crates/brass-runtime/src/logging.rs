//! Tracing subscriber setup.
//!
//! Brass logs through `tracing`. This module installs the global subscriber:
//! an [`EnvFilter`] (where `RUST_LOG` beats the configured level), a single
//! `fmt` layer and a writer. The writer is stdout, stderr or a log file
//! rolled by `tracing-appender`.
//!
//! Most bots never call this directly since [`BrassRuntime`] runs
//! [`init_from_config`] with the `[logging]` table. To configure by hand:
//!
//! ```rust,ignore
//! use brass_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("brass_framework::gate=trace")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```
//!
//! Every dispatch opens a `dispatch` span, so [`SpanEvents::LIFECYCLE`]
//! prints one open/close pair per handled message or interaction.
//!
//! [`BrassRuntime`]: crate::BrassRuntime

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Span lifecycle events to print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Opening and closing only.
    pub const LIFECYCLE: Self = Self {
        close: true,
        new: true,
        ..Self::NONE
    };

    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn as_fmt(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .fold(FmtSpan::NONE, |acc, kind| acc | kind)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(cfg: &SpanEventConfig) -> Self {
        let SpanEventConfig {
            new,
            enter,
            exit,
            close,
        } = *cfg;
        Self {
            new,
            enter,
            exit,
            close,
        }
    }
}

/// Installs the subscriber described by the `[logging]` table.
///
/// A no-op when the process already has a global subscriber, which is the
/// normal case in tests.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Assembles a subscriber piece by piece.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    level: Option<tracing::Level>,
    filters: Vec<String>,
    spans: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    rotation: LogRotation,
    log_file: Option<PathBuf>,
    show_target: bool,
    show_thread_ids: bool,
    show_location: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            show_target: true,
            ..Default::default()
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let filters = config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .collect();

        Self {
            level: Some(config.level.to_tracing_level()),
            filters,
            spans: (&config.span_events).into(),
            format: config.format,
            output: config.output,
            rotation: config.rotation,
            log_file: config.file_path.clone(),
            show_thread_ids: config.thread_ids,
            show_location: config.file_location,
            ..Self::new()
        }
    }

    /// Level used when `RUST_LOG` is unset. Defaults to `info`.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a directive such as `brass_framework::gate=trace`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.filters.push(directive.to_owned());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.spans = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.show_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.show_thread_ids = enabled;
        self
    }

    /// Prints the source file and line of each event.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.show_location = enabled;
        self
    }

    /// Log file used by [`LogOutput::File`].
    pub fn file_path(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Installs the subscriber; an existing global subscriber is left alone.
    pub fn init(self) {
        let _ = self.try_init();
    }

    pub fn try_init(self) -> Result<(), TryInitError> {
        let mut notes = Vec::new();
        let writer = self.writer(&mut notes);
        let layer = self.fmt_layer(writer, &mut notes);

        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()?;

        for note in notes {
            warn!("{note}");
        }
        Ok(())
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = self
            .level
            .unwrap_or(tracing::Level::INFO)
            .as_str()
            .to_ascii_lowercase();

        self.filters.iter().fold(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
            |filter, raw| match raw.parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(err) => {
                    eprintln!("Ignoring invalid log directive {raw:?}: {err}");
                    filter
                }
            },
        )
    }

    fn writer(&self, notes: &mut Vec<&'static str>) -> BoxMakeWriter {
        match (self.output, self.log_file.as_deref()) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(self.appender(path)),
            (LogOutput::File, None) => {
                notes.push("Log output is `file` but no file_path is set, writing to stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn appender(&self, path: &Path) -> RollingFileAppender {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| OsStr::new("brass.log"));
        match self.rotation {
            LogRotation::Never => rolling::never(dir, name),
            LogRotation::Hourly => rolling::hourly(dir, name),
            LogRotation::Daily => rolling::daily(dir, name),
        }
    }

    #[cfg_attr(feature = "json-log", allow(unused_variables))]
    fn fmt_layer(&self, writer: BoxMakeWriter, notes: &mut Vec<&'static str>) -> BoxedLayer {
        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.spans.as_fmt())
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_location)
            .with_line_number(self.show_location);

        match self.format {
            #[cfg(feature = "json-log")]
            LogFormat::Json => base.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => {
                notes.push("Log format `json` needs the `json-log` feature, using compact");
                base.compact().boxed()
            }
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Full => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            rotation: LogRotation::Daily,
            file_location: true,
            ..LoggingConfig::default()
        };
        config.span_events.close = true;
        config.filters.insert("brass_framework".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(tracing::Level::DEBUG));
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.output, LogOutput::Stderr);
        assert_eq!(builder.rotation, LogRotation::Daily);
        assert!(builder.show_location);
        assert_eq!(
            builder.spans,
            SpanEvents {
                close: true,
                ..SpanEvents::NONE
            }
        );
        assert_eq!(builder.filters, vec!["brass_framework=trace".to_string()]);
    }

    #[test]
    fn test_span_event_flags() {
        assert_eq!(SpanEvents::NONE.as_fmt(), FmtSpan::NONE);
        assert_eq!(SpanEvents::LIFECYCLE.as_fmt(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(SpanEvents::FULL.as_fmt(), FmtSpan::FULL);
    }
}
