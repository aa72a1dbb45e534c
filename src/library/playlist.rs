//! Immutable playlist store.
//!
//! The playlist is populated once at startup, either from the built-in
//! track list or from a JSON file, and is read-only afterwards.

use std::{collections::HashSet, fs::read_to_string, path::Path, slice::Iter};

use {serde_json::from_str, tracing::debug};

use crate::{error::PlaylistError, library::models::Track};

/// Ordered, read-only sequence of tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    /// Creates a playlist from a list of tracks.
    ///
    /// # Arguments
    ///
    /// * `tracks` - Tracks in playback order.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Playlist` or a `PlaylistError`.
    ///
    /// # Errors
    ///
    /// Returns `PlaylistError::DuplicateTrackId` if two tracks share an id.
    pub fn new(tracks: Vec<Track>) -> Result<Self, PlaylistError> {
        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id) {
                return Err(PlaylistError::DuplicateTrackId { id: track.id });
            }
        }
        Ok(Self { tracks })
    }

    /// The playlist bundled with the application.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            tracks: vec![
                Track::new(1, "Grease", "Artist A", "assets/grease.mp3")
                    .with_duration_ms(193_000),
                Track::new(2, "Lisa", "Artist B", "assets/lisa.mp3").with_duration_ms(168_000),
            ],
        }
    }

    /// Loads a playlist from a JSON array of tracks.
    ///
    /// # Errors
    ///
    /// Returns `PlaylistError` if the file cannot be read, parsed or
    /// contains duplicate ids.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlaylistError> {
        let path = path.as_ref();
        debug!("Loading playlist from {:?}", path);
        let contents = read_to_string(path)?;
        let tracks: Vec<Track> = from_str(&contents)?;
        Self::new(tracks)
    }

    /// Gets the track at `index`.
    ///
    /// # Errors
    ///
    /// Returns `PlaylistError::OutOfRange` if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&Track, PlaylistError> {
        self.tracks.get(index).ok_or(PlaylistError::OutOfRange {
            index,
            len: self.tracks.len(),
        })
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist has no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterates over tracks in order.
    pub fn iter(&self) -> Iter<'_, Track> {
        self.tracks.iter()
    }

    /// Finds the position of a track by id.
    #[must_use]
    pub fn position_of(&self, track_id: i64) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == track_id)
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Track;
    type IntoIter = Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
