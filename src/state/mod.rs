//! Published session state with reactive updates to renderers.
//!
//! This module provides the snapshot renderers read and the event channel
//! they subscribe to.

pub mod session_state;

pub use session_state::{
    SessionEvent, SessionPhase, SessionSnapshot, SessionState, StateObserver, spawn_observer,
};
