use std::{fs::OpenOptions, sync::Arc};

use tracing::Level;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::LoggingConfig;

/// Crates that are noisy at debug level
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=info", "tower_http=info"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_config(format: &str) -> Self {
        if format.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. Output goes to
/// `logging.file_path` when set, otherwise to stdout.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(level)?,
    };

    let layer = fmt_layer(LogFormat::from_config(&config.format), config.file_path.as_deref())?;
    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    Ok(())
}

fn build_filter(level: Level) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::new(level.as_str().to_lowercase());
    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn fmt_layer(
    format: LogFormat,
    file_path: Option<&str>,
) -> anyhow::Result<Box<dyn Layer<Registry> + Send + Sync>> {
    let base = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_line_number(true);

    let layer = match (format, file_path) {
        (LogFormat::Json, None) => base.json().with_current_span(true).boxed(),
        (LogFormat::Json, Some(path)) => base
            .json()
            .with_current_span(true)
            .with_ansi(false)
            .with_writer(open_append(path)?)
            .boxed(),
        (LogFormat::Pretty, None) => base.pretty().with_file(false).boxed(),
        (LogFormat::Pretty, Some(path)) => base
            .with_ansi(false)
            .with_writer(open_append(path)?)
            .boxed(),
    };
    Ok(layer)
}

fn open_append(path: &str) -> anyhow::Result<Arc<std::fs::File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Arc::new(file))
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    let parsed = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        other => anyhow::bail!("Unknown log level '{other}'"),
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_log_level(" warning ").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(LogFormat::from_config("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_config("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_filter_quiets_dependencies() {
        let filter = build_filter(Level::DEBUG).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx=warn"));
        assert!(rendered.contains("debug"));
    }

    #[test]
    fn test_init_rejects_bad_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
