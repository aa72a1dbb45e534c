//! Text projection of the session for the console front end.
//!
//! `PlayerView` is a pure function of the playlist and a session snapshot;
//! it holds everything a renderer needs to draw one frame.

use std::fmt::Write;

use crate::{
    library::Playlist,
    state::{SessionPhase, SessionSnapshot},
};

/// One playlist row as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    /// 1-based position shown on screen.
    pub number: usize,
    pub title: String,
    pub artist: String,
    /// Whether this row is the selected track.
    pub highlighted: bool,
}

/// Action offered by the transport button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportIcon {
    /// Nothing is playing; the button starts playback.
    Play,
    /// A track is playing; the button pauses it.
    Pause,
}

impl TransportIcon {
    /// Glyph used in the status line.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Play => "[>]",
            Self::Pause => "[||]",
        }
    }
}

/// Everything needed to draw one frame of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub rows: Vec<TrackRow>,
    pub now_playing: String,
    pub transport: TransportIcon,
    pub progress: String,
    pub is_looping: bool,
}

impl PlayerView {
    /// Projects the session onto the playlist.
    ///
    /// # Arguments
    ///
    /// * `playlist` - Tracks to list.
    /// * `snapshot` - Session state to reflect.
    ///
    /// # Returns
    ///
    /// The view for `snapshot`. The function has no side effects.
    #[must_use]
    pub fn project(playlist: &Playlist, snapshot: &SessionSnapshot) -> Self {
        let rows = playlist
            .iter()
            .enumerate()
            .map(|(index, track)| TrackRow {
                number: index + 1,
                title: track.title.clone(),
                artist: track.artist.clone(),
                highlighted: snapshot.current_index == Some(index),
            })
            .collect();

        let current = snapshot
            .current_index
            .and_then(|index| playlist.get(index).ok());
        let now_playing = match (snapshot.phase, current) {
            (_, None) => "Nothing selected".to_string(),
            (SessionPhase::Loading, Some(track)) => format!("Loading {}", track.title),
            (SessionPhase::ReadyPaused, Some(track)) => {
                format!("Paused: {} - {}", track.title, track.artist)
            }
            (_, Some(track)) => format!("Now playing: {} - {}", track.title, track.artist),
        };

        let transport = if snapshot.is_playing {
            TransportIcon::Pause
        } else {
            TransportIcon::Play
        };

        let total = snapshot
            .duration_ms
            .map_or_else(|| "--:--".to_string(), format_time);
        let progress = format!("{} / {total}", format_time(snapshot.position_ms));

        Self {
            rows,
            now_playing,
            transport,
            progress,
            is_looping: snapshot.is_looping,
        }
    }

    /// Single-line transport status.
    #[must_use]
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} {}  {}",
            self.transport.glyph(),
            self.now_playing,
            self.progress
        );
        if self.is_looping {
            line.push_str("  (loop)");
        }
        line
    }

    /// Formats the whole view: playlist rows followed by the status line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut output = String::new();
        for row in &self.rows {
            let marker = if row.highlighted { '>' } else { ' ' };
            let _ = writeln!(
                output,
                "{marker} {:>2}. {} - {}",
                row.number, row.title, row.artist
            );
        }
        output.push_str(&self.status_line());
        output
    }
}

/// Formats milliseconds as `MM:SS`.
#[must_use]
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    format!("{minutes:02}:{remaining:02}")
}
