//! Scripted engine used by the session tests.
//!
//! Every call is recorded, loads can be made to fail or to block until
//! released, transport commands can be rejected, and status updates are
//! pushed by hand.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering::SeqCst},
    },
};

use {
    async_channel::{Receiver, Sender, unbounded},
    async_trait::async_trait,
    parking_lot::Mutex,
    tokio::sync::{Notify, Semaphore},
};

use crate::{
    audio::engine::{AudioEngine, PlaybackStatus},
    error::EngineError,
    library::MediaRef,
};

/// Handle issued by the scripted engine.
#[derive(Debug)]
pub struct ScriptedHandle {
    id: u64,
}

/// Recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load { media: String, id: u64 },
    Play(u64),
    Pause(u64),
    SetLooping(u64, bool),
    Release(u64),
}

#[derive(Default)]
pub struct ScriptedEngine {
    next_id: AtomicU64,
    calls: Mutex<Vec<EngineCall>>,
    failing_loads: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    reject_play: AtomicBool,
    reject_pause: AtomicBool,
    subscribers: Mutex<HashMap<u64, Vec<Sender<PlaybackStatus>>>>,
    load_started: Notify,
    loads_started: AtomicU64,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_loads_of(&self, media: &str) {
        self.failing_loads.lock().insert(media.to_string());
    }

    /// Makes loads of `media` wait until [`ScriptedEngine::open_gate`].
    pub fn gate_loads_of(&self, media: &str) {
        self.gates
            .lock()
            .insert(media.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn open_gate(&self, media: &str) {
        if let Some(gate) = self.gates.lock().get(media) {
            gate.add_permits(1);
        }
    }

    pub fn reject_play(&self, reject: bool) {
        self.reject_play.store(reject, SeqCst);
    }

    pub fn reject_pause(&self, reject: bool) {
        self.reject_pause.store(reject, SeqCst);
    }

    /// Waits until at least `count` loads have started.
    pub async fn wait_for_loads(&self, count: u64) {
        loop {
            let notified = self.load_started.notified();
            if self.loads_started.load(SeqCst) >= count {
                return;
            }
            notified.await;
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Ids of handles loaded and not yet released.
    pub fn live_handles(&self) -> Vec<u64> {
        let calls = self.calls.lock();
        let released: HashSet<u64> = calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Release(id) => Some(*id),
                _ => None,
            })
            .collect();
        calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Load { id, .. } if !released.contains(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Id of the handle loaded for `media` most recently.
    pub fn handle_for(&self, media: &str) -> Option<u64> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            EngineCall::Load { media: loaded, id } if loaded == media => Some(*id),
            _ => None,
        })
    }

    pub fn was_played(&self, id: u64) -> bool {
        self.calls.lock().contains(&EngineCall::Play(id))
    }

    /// Pushes a status update to every subscriber of `id`.
    pub fn emit(&self, id: u64, status: PlaybackStatus) {
        if let Some(subscribers) = self.subscribers.lock().get_mut(&id) {
            subscribers.retain(|tx| tx.try_send(status).is_ok());
        }
    }

    /// Reports a natural end of the track behind `id`.
    pub fn finish(&self, id: u64) {
        self.emit(
            id,
            PlaybackStatus {
                did_just_finish: true,
                position_ms: 1_000,
                duration_ms: Some(1_000),
                ..PlaybackStatus::default()
            },
        );
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AudioEngine for ScriptedEngine {
    type Handle = ScriptedHandle;

    async fn load(&self, media: &MediaRef) -> Result<ScriptedHandle, EngineError> {
        let id = self.next_id.fetch_add(1, SeqCst) + 1;
        self.loads_started.fetch_add(1, SeqCst);
        self.load_started.notify_waiters();

        let gate = self.gates.lock().get(media.as_str()).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.failing_loads.lock().contains(media.as_str()) {
            return Err(EngineError::AssetNotFound {
                media: media.to_string(),
            });
        }

        self.record(EngineCall::Load {
            media: media.to_string(),
            id,
        });
        self.subscribers.lock().insert(id, Vec::new());
        Ok(ScriptedHandle { id })
    }

    async fn play(&self, handle: &ScriptedHandle) -> Result<(), EngineError> {
        if self.reject_play.load(SeqCst) {
            return Err(EngineError::rejected("play refused"));
        }
        self.record(EngineCall::Play(handle.id));
        Ok(())
    }

    async fn pause(&self, handle: &ScriptedHandle) -> Result<(), EngineError> {
        if self.reject_pause.load(SeqCst) {
            return Err(EngineError::rejected("pause refused"));
        }
        self.record(EngineCall::Pause(handle.id));
        Ok(())
    }

    async fn set_looping(&self, handle: &ScriptedHandle, looping: bool) -> Result<(), EngineError> {
        self.record(EngineCall::SetLooping(handle.id, looping));
        Ok(())
    }

    async fn release(&self, handle: ScriptedHandle) -> Result<(), EngineError> {
        self.subscribers.lock().remove(&handle.id);
        self.record(EngineCall::Release(handle.id));
        Ok(())
    }

    fn subscribe(&self, handle: &ScriptedHandle) -> Receiver<PlaybackStatus> {
        let (tx, rx) = unbounded();
        if let Some(subscribers) = self.subscribers.lock().get_mut(&handle.id) {
            subscribers.push(tx);
        }
        rx
    }
}
