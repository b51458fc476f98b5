/// Shortens a frame payload for log fields, marking how much was cut.
pub fn preview(payload: &str, max_chars: usize) -> String {
    let mut chars = payload.char_indices();
    match chars.nth(max_chars) {
        None => payload.escape_debug().to_string(),
        Some((cut, _)) => {
            let omitted = payload[cut..].chars().count();
            format!("{}… (+{omitted} chars)", payload[..cut].escape_debug())
        }
    }
}

/// Subscriber setup for the `playground` binary.
///
/// The client logs under two families of targets: the crate itself
/// (`playground_client`, `playground`) and the per-frame channels
/// `playground::session` and `playground::transport`. At `trace` the frame
/// channels log every frame sent and received, which drowns everything else,
/// so they stay at `debug` unless wire tracing is asked for. Wire tracing also
/// opens up the websocket and HTTP crates underneath.
pub mod logging {
    use std::fmt;
    use std::fs::OpenOptions;
    use std::io::{self, IsTerminal};
    use std::path::{Path, PathBuf};
    use std::sync::OnceLock;

    use clap::ValueEnum;
    use thiserror::Error;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    /// Full `EnvFilter` directive string; replaces the computed one.
    pub const FILTER_ENV: &str = "PLAYGROUND_LOG_FILTER";

    const APP_TARGETS: &[&str] = &["playground_client", "playground"];
    const FRAME_TARGETS: &[&str] = &["playground::session", "playground::transport"];
    const WIRE_CRATES: &[&str] = &["tokio_tungstenite", "tungstenite", "hyper", "reqwest"];

    #[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
    pub enum LogLevel {
        Error,
        #[default]
        Warn,
        Info,
        Debug,
        Trace,
    }

    impl fmt::Display for LogLevel {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                LogLevel::Error => "error",
                LogLevel::Warn => "warn",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            })
        }
    }

    #[derive(Clone, Debug, Default)]
    pub struct LogConfig {
        pub level: LogLevel,
        pub file: Option<PathBuf>,
        /// Keep per-frame trace output and dependency traces.
        pub wire_trace: bool,
    }

    #[derive(Debug, Error)]
    pub enum InitError {
        #[error("cannot open log file {path:?}: {source}")]
        OpenFile { path: PathBuf, source: io::Error },
        #[error("invalid {FILTER_ENV}: {0}")]
        Filter(#[from] tracing_subscriber::filter::ParseError),
        #[error("cannot install subscriber: {0}")]
        Install(String),
    }

    // Holding the guard keeps the background writer alive until exit.
    static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    /// Installs the global subscriber. Only the first call has any effect.
    pub fn init(config: &LogConfig) -> Result<(), InitError> {
        if GUARD.get().is_some() {
            return Ok(());
        }
        let filter = env_filter(config, std::env::var(FILTER_ENV).ok())?;

        let (writer, guard) = match &config.file {
            Some(path) => tracing_appender::non_blocking(open_append(path)?),
            None => tracing_appender::non_blocking(io::stderr()),
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(config.file.is_none() && io::stderr().is_terminal())
            .with_target(config.level >= LogLevel::Debug)
            .try_init()
            .map_err(|err| InitError::Install(err.to_string()))?;

        let _ = GUARD.set(guard);
        tracing::debug!(level = %config.level, wire = config.wire_trace, "logging ready");
        Ok(())
    }

    fn env_filter(config: &LogConfig, custom: Option<String>) -> Result<EnvFilter, InitError> {
        let directives = match custom.filter(|value| !value.trim().is_empty()) {
            Some(custom) => custom,
            None => directives(config.level, config.wire_trace),
        };
        Ok(EnvFilter::try_new(directives)?)
    }

    /// Directive string for `level`.
    ///
    /// Other crates never log above `info`. Frame targets are capped at
    /// `debug` unless `wire` is set.
    pub(crate) fn directives(level: LogLevel, wire: bool) -> String {
        let mut parts = vec![level.min(LogLevel::Info).to_string()];
        parts.extend(APP_TARGETS.iter().map(|target| format!("{target}={level}")));
        if level == LogLevel::Trace {
            if wire {
                parts.extend(WIRE_CRATES.iter().map(|target| format!("{target}=trace")));
            } else {
                parts.extend(FRAME_TARGETS.iter().map(|target| format!("{target}=debug")));
            }
        }
        parts.join(",")
    }

    fn open_append(path: &Path) -> Result<std::fs::File, InitError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| InitError::OpenFile {
                path: path.to_path_buf(),
                source,
            })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn quiet_levels_apply_everywhere() {
            assert_eq!(
                directives(LogLevel::Warn, false),
                "warn,playground_client=warn,playground=warn"
            );
            assert_eq!(
                directives(LogLevel::Error, true),
                "error,playground_client=error,playground=error"
            );
        }

        #[test]
        fn debug_raises_only_the_client() {
            assert_eq!(
                directives(LogLevel::Debug, false),
                "info,playground_client=debug,playground=debug"
            );
        }

        #[test]
        fn trace_keeps_frames_at_debug_without_wire_tracing() {
            let filter = directives(LogLevel::Trace, false);
            assert!(filter.starts_with("info,playground_client=trace,playground=trace"));
            assert!(filter.contains("playground::session=debug"));
            assert!(filter.contains("playground::transport=debug"));
            assert!(!filter.contains("tungstenite"));
        }

        #[test]
        fn wire_tracing_opens_frames_and_socket_crates() {
            let filter = directives(LogLevel::Trace, true);
            assert!(!filter.contains("playground::session=debug"));
            assert!(filter.contains("tokio_tungstenite=trace"));
            assert!(filter.contains("reqwest=trace"));
        }

        #[test]
        fn custom_filter_wins_and_is_validated() {
            let config = LogConfig::default();
            assert!(env_filter(&config, Some("playground::session=trace".into())).is_ok());
            assert!(env_filter(&config, Some("   ".into())).is_ok());
            assert!(matches!(
                env_filter(&config, Some("playground=loud".into())),
                Err(InitError::Filter(_))
            ));
        }

        #[test]
        fn levels_are_ordered_by_verbosity() {
            assert!(LogLevel::Trace > LogLevel::Debug);
            assert!(LogLevel::Warn > LogLevel::Error);
            assert_eq!(LogLevel::default().to_string(), "warn");
        }
    }
}
