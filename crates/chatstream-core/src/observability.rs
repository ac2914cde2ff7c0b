use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "chatstream.logs.jsonl";

/// Where log lines go. stdout is reserved for the rendered answer.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogSink {
    Off,
    Stderr { json: bool },
    File(PathBuf),
}

impl LogSink {
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("CHATSTREAM_OBSERVABILITY_ENABLED")
            .map(|value| parse_bool_env(&value).unwrap_or(true))
            .unwrap_or(true);
        if !enabled {
            return LogSink::Off;
        }
        if let Some(path) = lookup("CHATSTREAM_JSON_LOG_PATH").filter(|p| !p.trim().is_empty()) {
            return LogSink::File(PathBuf::from(path.trim()));
        }
        let json = lookup("CHATSTREAM_LOG_FORMAT")
            .is_some_and(|format| format.trim().eq_ignore_ascii_case("json"));
        LogSink::Stderr { json }
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn env_filter(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    lookup("CHATSTREAM_LOG_LEVEL")
        .or_else(|| lookup("RUST_LOG"))
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn split_log_path(path: &Path) -> (&Path, &str) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    (dir, file_name)
}

/// Installs the global `tracing` subscriber. Later calls are no-ops.
///
/// - `CHATSTREAM_OBSERVABILITY_ENABLED=false` turns logging off.
/// - `CHATSTREAM_LOG_LEVEL`, then `RUST_LOG`, set the filter (default `warn`).
/// - `CHATSTREAM_JSON_LOG_PATH` appends JSON lines to that file.
/// - Otherwise logs go to stderr, compact unless `CHATSTREAM_LOG_FORMAT=json`.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let lookup = |key: &str| std::env::var(key).ok();
        let filter = env_filter(lookup);
        match LogSink::resolve(lookup) {
            LogSink::Off => {}
            LogSink::File(path) => {
                let (dir, file_name) = split_log_path(&path);
                let _ = std::fs::create_dir_all(dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::Stderr { json: true } => {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::Stderr { json: false } => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn bool_env_values() {
        assert_eq!(parse_bool_env(" YES "), Some(true));
        assert_eq!(parse_bool_env("off"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn sink_defaults_to_compact_stderr() {
        assert_eq!(LogSink::resolve(env(&[])), LogSink::Stderr { json: false });
        assert_eq!(
            LogSink::resolve(env(&[("CHATSTREAM_LOG_FORMAT", "JSON")])),
            LogSink::Stderr { json: true }
        );
    }

    #[test]
    fn file_path_wins_over_format_and_disable_wins_over_all() {
        let file = env(&[
            ("CHATSTREAM_JSON_LOG_PATH", "logs/chat.jsonl"),
            ("CHATSTREAM_LOG_FORMAT", "json"),
        ]);
        assert_eq!(
            LogSink::resolve(file),
            LogSink::File(PathBuf::from("logs/chat.jsonl"))
        );

        let off = env(&[
            ("CHATSTREAM_OBSERVABILITY_ENABLED", "no"),
            ("CHATSTREAM_JSON_LOG_PATH", "logs/chat.jsonl"),
        ]);
        assert_eq!(LogSink::resolve(off), LogSink::Off);
    }

    #[test]
    fn bare_file_name_logs_to_current_dir() {
        assert_eq!(
            split_log_path(Path::new("chat.jsonl")),
            (Path::new("."), "chat.jsonl")
        );
        assert_eq!(
            split_log_path(Path::new("/var/log/chat.jsonl")),
            (Path::new("/var/log"), "chat.jsonl")
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
        assert!(INIT.get().is_some());
    }
}
