// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rollcall_app::FailureKind;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "request failed";

/// Why a request did not produce a usable response. `Display` is the text a
/// user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Transport { message: String },
    #[error("{message}")]
    Application { code: Option<i64>, message: String },
    #[error("unexpected response shape: {detail}")]
    Shape { detail: String },
    #[error("a request is already in flight; wait for it to finish")]
    Busy,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Blank or missing server messages fall back to the generic text.
    pub fn application(code: Option<i64>, message: Option<&str>) -> Self {
        let message = message
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(GENERIC_FAILURE)
            .to_owned();
        Self::Application { code, message }
    }

    pub fn shape(detail: impl Into<String>) -> Self {
        Self::Shape {
            detail: detail.into(),
        }
    }

    /// `None` for `Busy`, which is a caller error rather than a request outcome.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Transport { .. } => Some(FailureKind::Transport),
            Self::Application { .. } => Some(FailureKind::Application),
            Self::Shape { .. } => Some(FailureKind::Shape),
            Self::Busy => None,
        }
    }
}
