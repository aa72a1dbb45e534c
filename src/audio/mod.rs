//! Audio playback system.
//!
//! Defines the engine seam the session controller drives, asset resolution
//! for media references, and a timer-driven engine used when no audio
//! device backend is plugged in.

pub mod assets;
pub mod engine;
#[cfg(test)]
pub mod scripted;
pub mod simulated;

pub use {
    assets::{AssetSource, DirectoryAssets, UncheckedAssets},
    engine::{AudioEngine, PlaybackStatus},
    simulated::{SimHandle, SimulatedEngine},
};
