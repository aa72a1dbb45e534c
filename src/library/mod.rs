//! Playlist store.
//!
//! Track records and the ordered, read-only playlist the session plays from.

pub mod models;
pub mod playlist;

pub use {
    models::{MediaRef, Track},
    playlist::Playlist,
};
