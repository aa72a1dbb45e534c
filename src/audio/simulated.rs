//! Timer-driven audio engine.
//!
//! `SimulatedEngine` models playback without an audio device: each loaded
//! voice has a duration, its position advances on a `tokio` interval while
//! playing, and reaching the end emits a `did_just_finish` status. It backs
//! the console front end and exercises the session controller end to end.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering::SeqCst},
    },
    time::Duration,
};

use {
    async_channel::{Receiver, Sender, unbounded},
    async_trait::async_trait,
    parking_lot::Mutex,
    tokio::{
        task::JoinHandle,
        time::{MissedTickBehavior, interval},
    },
    tracing::{debug, trace, warn},
};

use crate::{
    audio::{
        assets::AssetSource,
        engine::{AudioEngine, PlaybackStatus},
    },
    config::UserSettings,
    error::EngineError,
    library::{MediaRef, Playlist},
};

/// Handle to a simulated voice.
#[derive(Debug, PartialEq, Eq)]
pub struct SimHandle {
    id: u64,
}

impl SimHandle {
    /// Engine-wide identifier of the voice.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Playback state of one loaded track.
struct Voice {
    duration_ms: u64,
    position_ms: u64,
    playing: bool,
    looping: bool,
    ticker: Option<JoinHandle<()>>,
    subscribers: Vec<Sender<PlaybackStatus>>,
}

impl Voice {
    fn status(&self, did_just_finish: bool) -> PlaybackStatus {
        PlaybackStatus {
            is_playing: self.playing,
            is_looping: self.looping,
            did_just_finish,
            position_ms: self.position_ms,
            duration_ms: Some(self.duration_ms),
        }
    }

    /// Sends `status` to every open subscription, dropping closed ones.
    fn broadcast(&mut self, status: PlaybackStatus) {
        self.subscribers.retain(|tx| tx.try_send(status).is_ok());
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

type Voices = Arc<Mutex<HashMap<u64, Voice>>>;

/// Audio engine that simulates playback with timers.
#[derive(Clone)]
pub struct SimulatedEngine {
    voices: Voices,
    next_id: Arc<AtomicU64>,
    assets: Arc<dyn AssetSource>,
    durations: Arc<HashMap<MediaRef, u64>>,
    default_duration_ms: u64,
    tick: Duration,
}

impl SimulatedEngine {
    /// Creates an engine.
    ///
    /// # Arguments
    ///
    /// * `assets` - Resolver consulted on every load.
    /// * `tick` - Interval between status updates while playing.
    /// * `default_duration_ms` - Duration of tracks with no catalogue entry.
    #[must_use]
    pub fn new(assets: Arc<dyn AssetSource>, tick: Duration, default_duration_ms: u64) -> Self {
        Self {
            voices: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            assets,
            durations: Arc::new(HashMap::new()),
            default_duration_ms,
            tick,
        }
    }

    /// Creates an engine configured from user settings.
    #[must_use]
    pub fn from_settings(assets: Arc<dyn AssetSource>, settings: &UserSettings) -> Self {
        Self::new(
            assets,
            Duration::from_millis(settings.status_interval_ms),
            settings.default_track_ms,
        )
    }

    /// Takes track durations from the playlist's duration hints.
    #[must_use]
    pub fn with_catalogue(mut self, playlist: &Playlist) -> Self {
        let durations = playlist
            .iter()
            .filter_map(|track| Some((track.media_ref.clone(), track.duration_ms?)))
            .collect();
        self.durations = Arc::new(durations);
        self
    }

    /// Number of voices currently loaded.
    #[must_use]
    pub fn loaded_voices(&self) -> usize {
        self.voices.lock().len()
    }

    /// Runs `f` against the voice behind `handle`.
    fn with_voice<T>(
        &self,
        handle: &SimHandle,
        f: impl FnOnce(&mut Voice) -> T,
    ) -> Result<T, EngineError> {
        let mut voices = self.voices.lock();
        let voice = voices
            .get_mut(&handle.id)
            .ok_or(EngineError::UnknownHandle { id: handle.id })?;
        Ok(f(voice))
    }

    fn spawn_ticker(&self, id: u64) -> JoinHandle<()> {
        let voices = Arc::clone(&self.voices);
        let tick = self.tick;
        let step_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);

        tokio::spawn(async move {
            let mut ticks = interval(tick);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if !advance_voice(&voices, id, step_ms) {
                    break;
                }
            }
        })
    }
}

/// Advances a playing voice by one tick.
///
/// Returns `false` once the voice stopped or disappeared.
fn advance_voice(voices: &Voices, id: u64, step_ms: u64) -> bool {
    let mut voices = voices.lock();
    let Some(voice) = voices.get_mut(&id) else {
        return false;
    };
    if !voice.playing {
        return false;
    }

    voice.position_ms = voice.position_ms.saturating_add(step_ms).min(voice.duration_ms);
    if voice.position_ms < voice.duration_ms {
        let status = voice.status(false);
        voice.broadcast(status);
        return true;
    }

    if voice.looping {
        trace!(id, "Voice looped");
        let status = voice.status(true);
        voice.broadcast(status);
        voice.position_ms = 0;
        true
    } else {
        debug!(id, "Voice reached the end");
        voice.playing = false;
        voice.ticker = None;
        let status = voice.status(true);
        voice.broadcast(status);
        false
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    type Handle = SimHandle;

    async fn load(&self, media: &MediaRef) -> Result<SimHandle, EngineError> {
        let path = self.assets.resolve(media)?;
        let duration_ms = self
            .durations
            .get(media)
            .copied()
            .unwrap_or(self.default_duration_ms);
        let id = self.next_id.fetch_add(1, SeqCst);

        self.voices.lock().insert(
            id,
            Voice {
                duration_ms,
                position_ms: 0,
                playing: false,
                looping: false,
                ticker: None,
                subscribers: Vec::new(),
            },
        );
        debug!(id, duration_ms, "Loaded voice from {:?}", path);

        Ok(SimHandle { id })
    }

    async fn play(&self, handle: &SimHandle) -> Result<(), EngineError> {
        let start_ticker = self.with_voice(handle, |voice| {
            if voice.playing {
                return false;
            }
            if voice.position_ms >= voice.duration_ms {
                voice.position_ms = 0;
            }
            voice.playing = true;
            let status = voice.status(false);
            voice.broadcast(status);
            true
        })?;

        if start_ticker {
            let ticker = self.spawn_ticker(handle.id);
            self.with_voice(handle, |voice| voice.ticker = Some(ticker))?;
        }
        Ok(())
    }

    async fn pause(&self, handle: &SimHandle) -> Result<(), EngineError> {
        self.with_voice(handle, |voice| {
            voice.playing = false;
            voice.stop_ticker();
            let status = voice.status(false);
            voice.broadcast(status);
        })
    }

    async fn set_looping(&self, handle: &SimHandle, looping: bool) -> Result<(), EngineError> {
        self.with_voice(handle, |voice| {
            voice.looping = looping;
            let status = voice.status(false);
            voice.broadcast(status);
        })
    }

    async fn release(&self, handle: SimHandle) -> Result<(), EngineError> {
        let mut voice = self
            .voices
            .lock()
            .remove(&handle.id)
            .ok_or(EngineError::UnknownHandle { id: handle.id })?;
        voice.stop_ticker();
        voice.subscribers.clear();
        debug!(id = handle.id, "Released voice");
        Ok(())
    }

    fn subscribe(&self, handle: &SimHandle) -> Receiver<PlaybackStatus> {
        let (tx, rx) = unbounded();
        let subscribed = self.with_voice(handle, |voice| {
            let _ = tx.try_send(voice.status(false));
            voice.subscribers.push(tx);
        });
        if let Err(error) = subscribed {
            warn!(id = handle.id, error = %error, "Subscription to an unknown voice is closed");
        }
        rx
    }
}
