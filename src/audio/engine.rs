//! Audio engine seam.
//!
//! The session controller drives playback through the `AudioEngine` trait.
//! An engine hands out owned handles for loaded tracks, executes transport
//! commands against them and streams `PlaybackStatus` updates for each
//! handle until it is released.

use {
    async_channel::Receiver,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::{error::EngineError, library::MediaRef};

/// Status update emitted by an engine for one handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    /// Whether the handle is producing audio.
    pub is_playing: bool,
    /// Whether the handle restarts at the end instead of stopping.
    pub is_looping: bool,
    /// Set on the update that reports reaching the end of the track.
    pub did_just_finish: bool,
    /// Playback position in milliseconds.
    pub position_ms: u64,
    /// Track duration in milliseconds (if known).
    pub duration_ms: Option<u64>,
}

impl PlaybackStatus {
    /// Whether this update reports a natural end that should advance the session.
    #[must_use]
    pub fn is_natural_finish(&self) -> bool {
        self.did_just_finish && !self.is_looping
    }
}

/// Audio playback engine.
///
/// Handles are owned values: the only way to dispose of one is to pass it
/// back through [`AudioEngine::release`], which also closes every status
/// stream obtained for it.
#[async_trait]
pub trait AudioEngine: Send + Sync + 'static {
    /// Loaded, playable track instance.
    type Handle: Send + Sync + 'static;

    /// Prepares the asset behind `media` for playback, paused at the start.
    async fn load(&self, media: &MediaRef) -> Result<Self::Handle, EngineError>;

    /// Starts or resumes playback.
    async fn play(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Pauses playback, keeping the position.
    async fn pause(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Turns looping on or off.
    async fn set_looping(&self, handle: &Self::Handle, looping: bool) -> Result<(), EngineError>;

    /// Stops playback and frees the handle.
    async fn release(&self, handle: Self::Handle) -> Result<(), EngineError>;

    /// Opens a status stream for `handle`.
    ///
    /// The stream closes when the handle is released.
    fn subscribe(&self, handle: &Self::Handle) -> Receiver<PlaybackStatus>;
}
