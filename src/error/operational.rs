//! Operational error context propagation with `anyhow`.
//!
//! This module provides the context extension trait used by the binary
//! and the central reporter that turns session failures into log records
//! and user-facing messages.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Error, Result as AnyhowResult},
    tracing::{debug, error, info, warn},
};

use crate::error::domain::SessionError;

/// Extension trait for enhanced error context.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Severity assigned to a reported session error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Internal bookkeeping, never shown to the user.
    Debug,
    /// Expected user mistake.
    Info,
    /// The engine refused a transport command.
    Warn,
    /// A track could not be prepared.
    Error,
}

/// Centralized error reporting and logging.
///
/// The `ErrorReporter` logs failures at a consistent level and produces
/// the message the front end shows.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Classifies a session error.
    #[must_use]
    pub fn severity(error: &SessionError) -> Severity {
        match error {
            SessionError::Superseded { .. } => Severity::Debug,
            SessionError::OutOfRange { .. }
            | SessionError::UnknownTrack { .. }
            | SessionError::NoActiveTrack => Severity::Info,
            SessionError::PlayError { .. }
            | SessionError::PauseError { .. }
            | SessionError::LoopError { .. } => Severity::Warn,
            SessionError::LoadError { .. } => Severity::Error,
        }
    }

    /// Logs a session error and returns the message to display.
    ///
    /// # Arguments
    ///
    /// * `error` - The failed operation's error.
    /// * `context` - Short name of the operation, e.g. `"select"`.
    ///
    /// # Returns
    ///
    /// `None` for errors the user should not see (superseded requests).
    pub fn report_session(error: &SessionError, context: &str) -> Option<String> {
        match Self::severity(error) {
            Severity::Debug => {
                debug!(context = context, error = %error, "Session request dropped");
                return None;
            }
            Severity::Info => info!(context = context, error = %error, "Session request refused"),
            Severity::Warn => warn!(context = context, error = %error, "Transport command failed"),
            Severity::Error => error!(context = context, error = %error, "Track load failed"),
        }
        Some(error.to_string())
    }

    /// Reports an operational error at warning level.
    pub fn warn(error: &Error, context: &str) {
        warn!(context = context, error = %error, "Operational error");
    }

    /// Reports an operational error at error level.
    pub fn error(error: &Error, context: &str) {
        error!(context = context, error = %error, "Operational error");
    }

    /// Converts an error chain to a single user-friendly line.
    ///
    /// The top-level context is followed by the root cause when they differ.
    #[must_use]
    pub fn to_user_message(error: &Error) -> String {
        let top = error.to_string();
        let root = error.root_cause().to_string();
        if root == top {
            top
        } else {
            format!("{top}: {root}")
        }
    }
}
