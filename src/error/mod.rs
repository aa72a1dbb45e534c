//! Error handling built on `thiserror` and `anyhow`.
//!
//! Domain-specific error types give precise handling at the session seam,
//! while the operational helpers add context and report failures to the user.

pub mod domain;
pub mod operational;

pub use {
    domain::{EngineError, PlaylistError, Result, SessionError},
    operational::{ErrorReporter, ResultExt},
};
