//! Songdeck - Playlist Playback Session
//!
//! A small music player core: an ordered playlist, a session controller
//! that keeps exactly one engine handle alive and advances through the
//! playlist, and a console front end that renders the session state.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod playback;
pub mod state;
pub mod ui;

// Re-export key types for convenience
pub use {
    audio::{AudioEngine, PlaybackStatus, SimulatedEngine},
    config::{SettingsManager, UserSettings},
    error::{EngineError, PlaylistError, SessionError},
    library::{MediaRef, Playlist, Track},
    playback::{SessionConfig, SessionController},
    state::{SessionEvent, SessionPhase, SessionSnapshot, SessionState},
    ui::{ConsoleCommand, PlayerView},
};
