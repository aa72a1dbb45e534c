//! Playback session controller.
//!
//! The `SessionController` owns the single active engine handle and keeps
//! the published session state in step with it. Transitions (select, next,
//! previous, auto-advance) are serialized through an async mutex guarding
//! the session; each request takes a ticket when issued, and a transition
//! whose ticket has been overtaken releases whatever it loaded without
//! playing it.

use std::sync::Arc;

use {
    parking_lot::Mutex as SyncMutex,
    tokio::{runtime::Handle as RuntimeHandle, sync::Mutex, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    audio::AudioEngine,
    config::UserSettings,
    error::{ErrorReporter, Result, SessionError},
    library::Playlist,
    state::{SessionEvent, SessionPhase, SessionSnapshot, SessionState},
};

/// Behavior switches for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Start playback as soon as a selected track is loaded.
    pub play_on_select: bool,
    /// Always play after next/previous; otherwise keep the previous intent.
    pub autoplay_on_skip: bool,
    /// Advance to the next track when one finishes naturally.
    pub auto_advance: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            play_on_select: true,
            autoplay_on_skip: true,
            auto_advance: true,
        }
    }
}

impl From<&UserSettings> for SessionConfig {
    fn from(settings: &UserSettings) -> Self {
        Self {
            play_on_select: settings.play_on_select,
            autoplay_on_skip: settings.autoplay_on_skip,
            auto_advance: settings.auto_advance,
        }
    }
}

/// Which track a transition should move to.
#[derive(Debug, Clone, Copy)]
enum Target {
    Select(usize),
    Next,
    Previous,
    /// Advance after a natural finish, valid only while the ledger still
    /// holds ticket `after`.
    AutoAdvance { after: u64 },
}

/// A ticketed transition request.
#[derive(Debug, Clone, Copy)]
struct Request {
    ticket: u64,
    index: usize,
    play: bool,
}

/// Latest request issued, updated synchronously at call time.
#[derive(Debug, Default)]
struct RequestLedger {
    ticket: u64,
    index: Option<usize>,
    playing: bool,
}

/// The loaded handle together with its status watcher.
struct ActiveTrack<H> {
    handle: H,
    lease: u64,
    watcher: JoinHandle<()>,
}

/// Authoritative session state.
struct Session<H> {
    phase: SessionPhase,
    current_index: Option<usize>,
    is_playing: bool,
    is_looping: bool,
    active: Option<ActiveTrack<H>>,
    /// Ticket of the last transition that started executing.
    applied: u64,
}

impl<H> Session<H> {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            current_index: None,
            is_playing: false,
            is_looping: false,
            active: None,
            applied: 0,
        }
    }

    /// Returns to `Idle`. The handle must already be released.
    fn reset(&mut self) {
        debug_assert!(self.active.is_none());
        self.phase = SessionPhase::Idle;
        self.current_index = None;
        self.is_playing = false;
    }

    fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        self.phase = if playing {
            SessionPhase::ReadyPlaying
        } else {
            SessionPhase::ReadyPaused
        };
    }
}

struct Inner<E: AudioEngine> {
    engine: Arc<E>,
    playlist: Arc<Playlist>,
    config: SessionConfig,
    state: SessionState,
    session: Mutex<Session<E::Handle>>,
    requests: SyncMutex<RequestLedger>,
}

impl<E: AudioEngine> Drop for Inner<E> {
    fn drop(&mut self) {
        let Some(active) = self.session.get_mut().active.take() else {
            return;
        };
        active.watcher.abort();

        let engine = Arc::clone(&self.engine);
        let lease = active.lease;
        match RuntimeHandle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(error) = engine.release(active.handle).await {
                        warn!(lease, error = %error, "Failed to release handle on drop");
                    }
                });
            }
            Err(_) => warn!(lease, "No runtime to release handle on drop"),
        }
    }
}

/// Playback session controller.
///
/// Cloning yields another view of the same session.
pub struct SessionController<E: AudioEngine> {
    inner: Arc<Inner<E>>,
}

impl<E: AudioEngine> Clone for SessionController<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: AudioEngine> SessionController<E> {
    /// Creates an idle session over `playlist`.
    ///
    /// # Arguments
    ///
    /// * `engine` - Audio engine the session drives.
    /// * `playlist` - Tracks available for selection.
    /// * `config` - Behavior switches.
    #[must_use]
    pub fn new(engine: Arc<E>, playlist: Arc<Playlist>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                playlist,
                config,
                state: SessionState::new(),
                session: Mutex::new(Session::new()),
                requests: SyncMutex::new(RequestLedger::default()),
            }),
        }
    }

    /// The playlist the session plays from.
    #[must_use]
    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.inner.playlist
    }

    /// Published session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.inner.state
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.snapshot()
    }

    /// Subscribes to session change events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.inner.state.subscribe()
    }

    /// Loads the track at `index` and, per configuration, starts playback.
    ///
    /// # Errors
    ///
    /// * `OutOfRange` - `index` is not a playlist position; nothing changes.
    /// * `LoadError` / `PlayError` - the engine failed; the session is idle.
    /// * `Superseded` - a newer request overtook this one.
    pub async fn select(&self, index: usize) -> Result<()> {
        self.transition_to(Target::Select(index)).await
    }

    /// Selects the track whose id is `track_id`.
    ///
    /// # Errors
    ///
    /// `UnknownTrack` when no track has that id, otherwise as
    /// [`SessionController::select`].
    pub async fn select_track(&self, track_id: i64) -> Result<()> {
        let index = self
            .inner
            .playlist
            .position_of(track_id)
            .ok_or(SessionError::UnknownTrack { id: track_id })?;
        self.select(index).await
    }

    /// Moves to the next track, wrapping at the end.
    ///
    /// # Errors
    ///
    /// `NoActiveTrack` when nothing is selected or the playlist is empty,
    /// otherwise as [`SessionController::select`].
    pub async fn next(&self) -> Result<()> {
        self.transition_to(Target::Next).await
    }

    /// Moves to the previous track, wrapping at the start.
    ///
    /// # Errors
    ///
    /// As [`SessionController::next`].
    pub async fn previous(&self) -> Result<()> {
        self.transition_to(Target::Previous).await
    }

    /// Pauses a playing track or resumes a paused one.
    ///
    /// The playing flag changes only once the engine confirms the command.
    ///
    /// # Errors
    ///
    /// * `NoActiveTrack` - no handle is loaded.
    /// * `PauseError` / `PlayError` - the engine refused; nothing changes.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        let Some(active) = session.active.as_ref() else {
            return Err(SessionError::NoActiveTrack);
        };

        let playing = if session.is_playing {
            self.inner
                .engine
                .pause(&active.handle)
                .await
                .map_err(|source| SessionError::PauseError { source })?;
            false
        } else {
            self.inner
                .engine
                .play(&active.handle)
                .await
                .map_err(|source| SessionError::PlayError { source })?;
            true
        };

        debug!(playing, "Transport toggled");
        session.set_playing(playing);
        self.sync_intent(&session);
        self.publish(&session);
        Ok(())
    }

    /// Turns looping on or off for the current and following tracks.
    ///
    /// # Errors
    ///
    /// `LoopError` if the engine refuses; the flag is left unchanged.
    pub async fn set_looping(&self, looping: bool) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        if let Some(active) = session.active.as_ref() {
            self.inner
                .engine
                .set_looping(&active.handle, looping)
                .await
                .map_err(|source| SessionError::LoopError { source })?;
        }

        debug!(looping, "Looping changed");
        session.is_looping = looping;
        self.publish(&session);
        Ok(())
    }

    /// Tears the session down, releasing the active handle.
    ///
    /// Pending transitions are superseded. The controller stays usable.
    pub async fn shutdown(&self) {
        {
            let mut ledger = self.inner.requests.lock();
            ledger.ticket += 1;
            ledger.index = None;
            ledger.playing = false;
        }

        let mut session = self.inner.session.lock().await;
        self.release_active(&mut session).await;
        session.reset();
        self.publish(&session);
        info!("Playback session shut down");
    }

    async fn transition_to(&self, target: Target) -> Result<()> {
        let request = self.request(target)?;
        debug!(?target, index = request.index, ticket = request.ticket, "Transition requested");
        let mut session = self.inner.session.lock().await;
        self.run_transition(&mut session, request).await
    }

    /// Validates `target` and records it as the latest request.
    fn request(&self, target: Target) -> Result<Request> {
        let len = self.inner.playlist.len();
        let config = self.inner.config;
        let mut ledger = self.inner.requests.lock();

        if let Target::AutoAdvance { after } = target
            && ledger.ticket != after
        {
            let index = ledger.index.map_or(0, |current| (current + 1) % len.max(1));
            return Err(SessionError::Superseded { index });
        }

        let (index, play) = match target {
            Target::Select(index) => {
                if index >= len {
                    return Err(SessionError::OutOfRange { index, len });
                }
                (index, config.play_on_select)
            }
            Target::Next | Target::Previous | Target::AutoAdvance { .. } => {
                let current = ledger
                    .index
                    .filter(|_| len > 0)
                    .ok_or(SessionError::NoActiveTrack)?;
                let index = match target {
                    Target::Previous => (current + len - 1) % len,
                    _ => (current + 1) % len,
                };
                let play = match target {
                    Target::AutoAdvance { .. } => true,
                    _ => config.autoplay_on_skip || ledger.playing,
                };
                (index, play)
            }
        };

        ledger.ticket += 1;
        ledger.index = Some(index);
        ledger.playing = play;
        Ok(Request {
            ticket: ledger.ticket,
            index,
            play,
        })
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.inner.requests.lock().ticket != ticket
    }

    /// Clears the ledger after a failed transition unless a newer request
    /// already replaced it.
    fn forget_request(&self, ticket: u64) {
        let mut ledger = self.inner.requests.lock();
        if ledger.ticket == ticket {
            ledger.index = None;
            ledger.playing = false;
        }
    }

    fn sync_intent(&self, session: &Session<E::Handle>) {
        let mut ledger = self.inner.requests.lock();
        if ledger.ticket == session.applied {
            ledger.playing = session.is_playing;
        }
    }

    async fn run_transition(
        &self,
        session: &mut Session<E::Handle>,
        request: Request,
    ) -> Result<()> {
        let Request {
            ticket,
            index,
            play,
        } = request;

        if self.is_superseded(ticket) {
            debug!(index, ticket, "Transition superseded before it started");
            return Err(SessionError::Superseded { index });
        }
        session.applied = ticket;

        let track = self
            .inner
            .playlist
            .get(index)
            .map_err(|_| SessionError::OutOfRange {
                index,
                len: self.inner.playlist.len(),
            })?
            .clone();

        self.release_active(session).await;
        session.current_index = Some(index);
        session.phase = SessionPhase::Loading;
        self.publish(session);
        info!(index, title = %track.title, artist = %track.artist, "Loading track");

        let handle = match self.inner.engine.load(&track.media_ref).await {
            Ok(handle) => handle,
            Err(source) => {
                session.reset();
                self.forget_request(ticket);
                self.publish(session);
                return Err(SessionError::LoadError { index, source });
            }
        };

        if self.is_superseded(ticket) {
            debug!(index, ticket, "Releasing handle of superseded transition");
            self.release_handle(handle, ticket).await;
            session.reset();
            self.publish(session);
            return Err(SessionError::Superseded { index });
        }

        if session.is_looping
            && let Err(error) = self.inner.engine.set_looping(&handle, true).await
        {
            warn!(index, error = %error, "Failed to carry looping over to new track");
        }

        let watcher = self.spawn_watcher(&handle, ticket);
        let started = if play {
            self.inner.engine.play(&handle).await
        } else {
            Ok(())
        };
        if let Err(source) = started {
            watcher.abort();
            self.release_handle(handle, ticket).await;
            session.reset();
            self.forget_request(ticket);
            self.publish(session);
            return Err(SessionError::PlayError { source });
        }

        session.active = Some(ActiveTrack {
            handle,
            lease: ticket,
            watcher,
        });
        session.set_playing(play);
        self.sync_intent(session);
        self.publish(session);
        info!(index, playing = play, "Track ready");
        Ok(())
    }

    /// Releases the active handle, if any, and stops its watcher.
    async fn release_active(&self, session: &mut Session<E::Handle>) {
        if let Some(active) = session.active.take() {
            active.watcher.abort();
            session.is_playing = false;
            self.release_handle(active.handle, active.lease).await;
        }
    }

    async fn release_handle(&self, handle: E::Handle, lease: u64) {
        debug!(lease, "Releasing handle");
        if let Err(error) = self.inner.engine.release(handle).await {
            warn!(lease, error = %error, "Engine failed to release handle");
        }
    }

    /// Subscribes once to the handle's status stream.
    ///
    /// The watcher forwards progress to the published state and schedules
    /// the finish handling on its own task, so aborting the watcher from
    /// that handling never cancels it midway.
    fn spawn_watcher(&self, handle: &E::Handle, lease: u64) -> JoinHandle<()> {
        let statuses = self.inner.engine.subscribe(handle);
        let inner = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            while let Ok(status) = statuses.recv().await {
                let Some(strong) = inner.upgrade() else {
                    break;
                };
                strong.state.update_progress(lease, &status);
                if status.is_natural_finish() {
                    debug!(lease, "Track finished naturally");
                    let controller = SessionController { inner: strong };
                    tokio::spawn(async move { controller.finish_naturally(lease).await });
                }
            }
        })
    }

    async fn finish_naturally(&self, lease: u64) {
        let mut session = self.inner.session.lock().await;
        if session.active.as_ref().map(|active| active.lease) != Some(lease) {
            debug!(lease, "Ignoring finish from a released handle");
            return;
        }

        if !self.inner.config.auto_advance {
            session.set_playing(false);
            self.sync_intent(&session);
            self.publish(&session);
            return;
        }

        let target = Target::AutoAdvance {
            after: session.applied,
        };
        let outcome = match self.request(target) {
            Ok(request) => {
                info!(from = ?session.current_index, to = request.index, "Auto-advancing");
                self.run_transition(&mut session, request).await
            }
            Err(error) => Err(error),
        };

        if let Err(error) = outcome
            && let Some(message) = ErrorReporter::report_session(&error, "auto-advance")
        {
            self.inner.state.report_error(message);
        }
    }

    /// Publishes the session to the shared state.
    fn publish(&self, session: &Session<E::Handle>) {
        let lease = session.active.as_ref().map(|active| active.lease);
        let duration_hint = session
            .current_index
            .and_then(|index| self.inner.playlist.get(index).ok())
            .and_then(|track| track.duration_ms);

        self.inner.state.update(|snapshot| {
            if snapshot.current_index != session.current_index || snapshot.handle_lease != lease {
                snapshot.position_ms = 0;
                snapshot.duration_ms = duration_hint;
            }
            snapshot.phase = session.phase;
            snapshot.current_index = session.current_index;
            snapshot.is_playing = session.is_playing;
            snapshot.handle_lease = lease;
            snapshot.is_looping = session.is_looping;
        });
    }
}
