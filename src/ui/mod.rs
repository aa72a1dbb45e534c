//! Console front end.
//!
//! A text projection of the session plus the command parser and renderer
//! the binary wires to stdin and stdout.

pub mod console;
pub mod view;

pub use {
    console::{CommandError, ConsoleCommand, ConsoleRenderer, HELP},
    view::{PlayerView, TrackRow, TransportIcon},
};
