//! Provides the list of errors for `livenessprobe`.

use crate::config::Mode;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum Error {
    #[snafu(display("Usage error."))]
    Usage { message: Option<String> },

    #[snafu(display("Invalid log level '{}': {}", level, source))]
    LogLevel {
        level: String,
        source: log::ParseLevelError,
    },

    #[snafu(display(
        "Unexpected number of arguments for '{}': expected {}, got {}",
        mode,
        expected,
        got
    ))]
    Arity {
        mode: Mode,
        expected: &'static str,
        got: usize,
    },

    #[snafu(display("Failed to read config file {}: {}", path.display(), source))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse config file {}: {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Unable to snapshot the process table at {}: {}", path.display(), source))]
    ProcessTable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to run '{} {}': {}", command, args.join(" "), source))]
    Command {
        command: &'static str,
        args: Vec<String>,
        source: std::io::Error,
    },

    #[snafu(display(
        "Unable to query status of service '{}', systemctl exited with {}: {}",
        service,
        exit,
        stderr
    ))]
    ServiceQuery {
        service: String,
        exit: i32,
        stderr: String,
    },

    #[snafu(display("Unable to open service '{}': service not found", service))]
    ServiceNotFound { service: String },

    #[snafu(display("Unable to find ActiveState of service '{}' in systemctl output", service))]
    ServiceStatusParse { service: String },

    #[snafu(display("Unable to check whether {} exists: {}", path.display(), source))]
    FileStat {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
