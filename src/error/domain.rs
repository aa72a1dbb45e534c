//! Domain-specific error types using `thiserror`.
//!
//! This module defines the main error enums for the different domains
//! within Songdeck: the audio engine, the playlist store and the playback
//! session controller.

use std::{io::Error as IoError, result::Result as StdResult};

use {serde_json::Error as SerdeJsonError, thiserror::Error};

/// Errors reported by an audio engine implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The asset behind a media reference could not be resolved.
    #[error("Asset not found: {media}")]
    AssetNotFound { media: String },
    /// The handle is not (or no longer) known to the engine.
    #[error("Unknown handle: {id}")]
    UnknownHandle { id: u64 },
    /// The engine refused to carry out a command.
    #[error("Engine rejected command: {reason}")]
    Rejected { reason: String },
}

impl EngineError {
    /// Creates a new `Rejected` error.
    ///
    /// # Arguments
    ///
    /// * `reason` - Why the engine refused the command.
    ///
    /// # Returns
    ///
    /// A new `EngineError::Rejected`.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Playlist store errors.
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// Index outside the playlist bounds.
    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    OutOfRange { index: usize, len: usize },
    /// Two tracks share the same id.
    #[error("Duplicate track id: {id}")]
    DuplicateTrackId { id: i64 },
    /// Failed to read a playlist file.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    /// Failed to parse a playlist file.
    #[error("Parse error: {0}")]
    Parse(#[from] SerdeJsonError),
}

/// Playback session errors.
///
/// Every variant is recoverable at the session level.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Requested index is not a valid playlist position.
    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    OutOfRange { index: usize, len: usize },
    /// No playlist track carries this id.
    #[error("No track with id {id}")]
    UnknownTrack { id: i64 },
    /// The engine failed to prepare the track.
    #[error("Failed to load track {index}: {source}")]
    LoadError {
        index: usize,
        #[source]
        source: EngineError,
    },
    /// The engine rejected a play command.
    #[error("Failed to start playback: {source}")]
    PlayError {
        #[source]
        source: EngineError,
    },
    /// The engine rejected a pause command.
    #[error("Failed to pause playback: {source}")]
    PauseError {
        #[source]
        source: EngineError,
    },
    /// The engine refused to change looping.
    #[error("Failed to change looping: {source}")]
    LoopError {
        #[source]
        source: EngineError,
    },
    /// A transport command was issued with no loaded track.
    #[error("No active track")]
    NoActiveTrack,
    /// A newer request overtook this one before it took effect.
    #[error("Request for track {index} was superseded")]
    Superseded { index: usize },
}

/// Result alias for session operations.
pub type Result<T> = StdResult<T, SessionError>;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::error::domain::{EngineError, PlaylistError, SessionError};

    #[test]
    fn test_session_error_display() {
        assert_eq!(SessionError::NoActiveTrack.to_string(), "No active track");

        let out_of_range = SessionError::OutOfRange { index: 2, len: 2 };
        assert_eq!(
            out_of_range.to_string(),
            "Track index 2 out of range (playlist has 2 tracks)"
        );

        let unknown = SessionError::UnknownTrack { id: 42 };
        assert_eq!(unknown.to_string(), "No track with id 42");

        let superseded = SessionError::Superseded { index: 0 };
        assert_eq!(superseded.to_string(), "Request for track 0 was superseded");
    }

    #[test]
    fn test_load_error_keeps_source() {
        let load_error = SessionError::LoadError {
            index: 1,
            source: EngineError::AssetNotFound {
                media: "missing.mp3".to_string(),
            },
        };
        assert_eq!(
            load_error.to_string(),
            "Failed to load track 1: Asset not found: missing.mp3"
        );
        assert!(load_error.source().is_some());
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(
            EngineError::rejected("device busy").to_string(),
            "Engine rejected command: device busy"
        );
        assert_eq!(
            EngineError::UnknownHandle { id: 7 }.to_string(),
            "Unknown handle: 7"
        );
    }

    #[test]
    fn test_playlist_error_display() {
        let duplicate = PlaylistError::DuplicateTrackId { id: 3 };
        assert_eq!(duplicate.to_string(), "Duplicate track id: 3");

        let out_of_range = PlaylistError::OutOfRange { index: 4, len: 0 };
        assert_eq!(
            out_of_range.to_string(),
            "Track index 4 out of range (playlist has 0 tracks)"
        );
    }
}
