//! Data models for playlist entries.
//!
//! This module defines the `Track` record and the opaque `MediaRef`
//! pointing at its audio asset, with serde support for playlist files.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Opaque reference to an audio asset.
///
/// The controller never interprets it; only the engine's asset source does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Creates a media reference from any string-like value.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the raw reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MediaRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaRef {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

impl From<String> for MediaRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

/// Represents a track in the playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID.
    pub id: i64,
    /// Track title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Audio asset reference.
    #[serde(rename = "media")]
    pub media_ref: MediaRef,
    /// Duration in milliseconds (if known).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Creates a track without a duration hint.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        artist: impl Into<String>,
        media_ref: impl Into<MediaRef>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            artist: artist.into(),
            media_ref: media_ref.into(),
            duration_ms: None,
        }
    }

    /// Sets the duration hint.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{from_str, json, to_value};

    use crate::library::models::{MediaRef, Track};

    #[test]
    fn test_track_json_layout() {
        let track = Track::new(1, "Grease", "Artist A", "grease.mp3");
        let value = to_value(&track).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "title": "Grease", "artist": "Artist A", "media": "grease.mp3"})
        );
    }

    #[test]
    fn test_track_duration_is_optional() {
        let track: Track = from_str(
            r#"{"id": 2, "title": "Lisa", "artist": "Artist B", "media": "lisa.mp3", "duration_ms": 1500}"#,
        )
        .unwrap();
        assert_eq!(track.duration_ms, Some(1500));
        assert_eq!(track.media_ref, MediaRef::new("lisa.mp3"));
    }

    #[test]
    fn test_media_ref_display() {
        assert_eq!(MediaRef::from("a/b.mp3").to_string(), "a/b.mp3");
    }
}
