//! Playback session control.
//!
//! The `SessionController` turns user intents (select, skip, toggle) and
//! engine notifications into a consistent session state.

pub mod controller;

pub use controller::{SessionConfig, SessionController};
