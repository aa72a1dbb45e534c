//! Published session state with reactive update mechanisms.
//!
//! The controller owns the authoritative session; after every change it
//! publishes a `SessionSnapshot` here. Renderers read the snapshot and
//! subscribe to `SessionEvent`s to know when to redraw.

use std::sync::Arc;

use {
    async_trait::async_trait,
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    tokio::{
        sync::broadcast::{Receiver, Sender, channel, error::RecvError},
        task::JoinHandle,
    },
    tracing::{trace, warn},
};

use crate::audio::PlaybackStatus;

/// Phase of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No track selected.
    #[default]
    Idle,
    /// A handle was requested and is not ready yet.
    Loading,
    /// Track loaded, not playing.
    ReadyPaused,
    /// Track loaded and playing.
    ReadyPlaying,
}

/// Read-only copy of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Selected playlist position (target position while loading).
    pub current_index: Option<usize>,
    /// Whether the engine confirmed playback.
    pub is_playing: bool,
    /// Identifier of the active engine handle, if any.
    pub handle_lease: Option<u64>,
    /// Whether looping is enabled.
    pub is_looping: bool,
    /// Last reported playback position.
    pub position_ms: u64,
    /// Duration of the current track (if known).
    pub duration_ms: Option<u64>,
}

impl SessionSnapshot {
    /// Whether an engine handle is held.
    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.handle_lease.is_some()
    }
}

/// Session change events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Phase changed.
    PhaseChanged(SessionPhase),
    /// Selected track changed.
    TrackChanged(Option<usize>),
    /// Playing flag changed.
    PlayingChanged(bool),
    /// Looping flag changed.
    LoopingChanged(bool),
    /// Playback position advanced.
    Progress {
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// A background transition failed.
    Error(String),
}

/// Published session state with change notifications.
#[derive(Debug, Clone)]
pub struct SessionState {
    snapshot: Arc<RwLock<SessionSnapshot>>,
    state_tx: Sender<SessionEvent>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Creates an idle session state.
    #[must_use]
    pub fn new() -> Self {
        let (state_tx, _) = channel(64);
        Self {
            snapshot: Arc::new(RwLock::new(SessionSnapshot::default())),
            state_tx,
        }
    }

    /// Gets the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.read().clone()
    }

    /// Subscribes to session changes.
    ///
    /// # Returns
    ///
    /// A broadcast receiver for change events.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.state_tx.subscribe()
    }

    /// Applies `update` to the snapshot and notifies subscribers of every
    /// field that changed.
    pub fn update(&self, update: impl FnOnce(&mut SessionSnapshot)) {
        let events = {
            let mut snapshot = self.snapshot.write();
            let before = snapshot.clone();
            update(&mut snapshot);
            diff(&before, &snapshot)
        };
        for event in events {
            self.send(event);
        }
    }

    /// Records a status update for the handle identified by `lease`.
    ///
    /// Updates for any other handle are ignored.
    pub fn update_progress(&self, lease: u64, status: &PlaybackStatus) {
        let changed = {
            let mut snapshot = self.snapshot.write();
            if snapshot.handle_lease != Some(lease) {
                trace!(lease, "Dropping progress from inactive handle");
                return;
            }
            let duration_ms = status.duration_ms.or(snapshot.duration_ms);
            let changed =
                snapshot.position_ms != status.position_ms || snapshot.duration_ms != duration_ms;
            snapshot.position_ms = status.position_ms;
            snapshot.duration_ms = duration_ms;
            changed.then_some((status.position_ms, duration_ms))
        };
        if let Some((position_ms, duration_ms)) = changed {
            self.send(SessionEvent::Progress {
                position_ms,
                duration_ms,
            });
        }
    }

    /// Publishes an error message for observers to display.
    pub fn report_error(&self, message: impl Into<String>) {
        self.send(SessionEvent::Error(message.into()));
    }

    fn send(&self, event: SessionEvent) {
        // No receivers is not an error.
        let _ = self.state_tx.send(event);
    }
}

fn diff(before: &SessionSnapshot, after: &SessionSnapshot) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    if before.current_index != after.current_index {
        events.push(SessionEvent::TrackChanged(after.current_index));
    }
    if before.phase != after.phase {
        events.push(SessionEvent::PhaseChanged(after.phase));
    }
    if before.is_playing != after.is_playing {
        events.push(SessionEvent::PlayingChanged(after.is_playing));
    }
    if before.is_looping != after.is_looping {
        events.push(SessionEvent::LoopingChanged(after.is_looping));
    }
    if before.position_ms != after.position_ms || before.duration_ms != after.duration_ms {
        events.push(SessionEvent::Progress {
            position_ms: after.position_ms,
            duration_ms: after.duration_ms,
        });
    }
    events
}

/// Trait for renderers that react to session changes.
#[async_trait]
pub trait StateObserver: Send + 'static {
    /// Handles a session change event.
    ///
    /// # Arguments
    ///
    /// * `event` - The change that happened.
    /// * `snapshot` - Session state after the change.
    async fn handle_state_change(&mut self, event: SessionEvent, snapshot: SessionSnapshot);
}

/// Spawns a task feeding session events to `observer`.
///
/// The task ends when the state's sender side is gone and returns the
/// observer. Lagging observers skip the missed events and continue from the
/// latest snapshot.
pub fn spawn_observer<O: StateObserver>(state: &SessionState, mut observer: O) -> JoinHandle<O> {
    let mut receiver = state.subscribe();
    // Only the snapshot is shared; the sender stays with the state so the
    // channel closes once the state is dropped.
    let snapshot = Arc::clone(&state.snapshot);

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let current = snapshot.read().clone();
                    observer.handle_state_change(event, current).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Session observer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        observer
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {async_trait::async_trait, parking_lot::Mutex};

    use crate::{
        audio::PlaybackStatus,
        state::session_state::{
            SessionEvent, SessionPhase, SessionSnapshot, SessionState, StateObserver,
            spawn_observer,
        },
    };

    #[test]
    fn test_session_state_starts_idle() {
        let state = SessionState::new();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert!(snapshot.current_index.is_none());
        assert!(!snapshot.has_handle());
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn test_update_emits_changed_fields_only() {
        let state = SessionState::new();
        let mut events = state.subscribe();

        state.update(|snapshot| {
            snapshot.phase = SessionPhase::Loading;
            snapshot.current_index = Some(1);
        });

        assert_eq!(events.try_recv().unwrap(), SessionEvent::TrackChanged(Some(1)));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::PhaseChanged(SessionPhase::Loading)
        );
        assert!(events.try_recv().is_err());

        state.update(|snapshot| snapshot.phase = SessionPhase::Loading);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_progress_only_for_active_lease() {
        let state = SessionState::new();
        state.update(|snapshot| snapshot.handle_lease = Some(3));
        let mut events = state.subscribe();

        let status = PlaybackStatus {
            is_playing: true,
            position_ms: 750,
            duration_ms: Some(2_000),
            ..PlaybackStatus::default()
        };
        state.update_progress(2, &status);
        assert!(events.try_recv().is_err());
        assert_eq!(state.snapshot().position_ms, 0);

        state.update_progress(3, &status);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Progress {
                position_ms: 750,
                duration_ms: Some(2_000)
            }
        );
        assert_eq!(state.snapshot().position_ms, 750);
    }

    struct Recorder {
        seen: Arc<Mutex<Vec<(SessionEvent, SessionSnapshot)>>>,
    }

    #[async_trait]
    impl StateObserver for Recorder {
        async fn handle_state_change(&mut self, event: SessionEvent, snapshot: SessionSnapshot) {
            self.seen.lock().push((event, snapshot));
        }
    }

    #[tokio::test]
    async fn test_observer_receives_events_with_snapshot() {
        let state = SessionState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let task = spawn_observer(
            &state,
            Recorder {
                seen: Arc::clone(&seen),
            },
        );

        state.update(|snapshot| {
            snapshot.is_looping = true;
        });
        state.report_error("boom");
        drop(state);

        let _observer = task.await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, SessionEvent::LoopingChanged(true));
        assert_eq!(seen[1].0, SessionEvent::Error("boom".to_string()));
    }
}
