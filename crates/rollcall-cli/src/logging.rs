// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("create log directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("log file path {} has no file name; set [logging].file to a file", .0.display())]
    InvalidPath(PathBuf),
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter { filter: String, message: String },
    #[error("tracing subscriber already initialized")]
    SubscriberAlreadySet,
}

/// Where log lines go. The interactive screen owns the terminal, so it
/// always logs to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// `RUST_LOG` wins over the configured level.
pub fn env_filter(configured: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(configured).map_err(|error| LoggingError::InvalidFilter {
        filter: configured.to_owned(),
        message: error.to_string(),
    })
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((directory, file_name.to_owned()))
}

pub fn init(target: &LogTarget, level: &str) -> Result<(), LoggingError> {
    let filter = env_filter(level)?;
    match target {
        LogTarget::File(path) => {
            let (directory, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&directory).map_err(|source| {
                LoggingError::DirectoryCreation {
                    path: directory.clone(),
                    source,
                }
            })?;
            let appender = tracing_appender::rolling::never(&directory, file_name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .try_init()
                .map_err(|_| LoggingError::SubscriberAlreadySet)
        }
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|_| LoggingError::SubscriberAlreadySet),
    }
}
