//! Typed change events published by the core components.
//!
//! Components publish; the orchestrator and the UI collaborator
//! subscribe. Delivery is fan-out over unbounded channels: every
//! subscriber sees every event published after it subscribed. A dropped
//! receiver is pruned on the next publish.

use crossbeam_channel::{unbounded, Receiver, Sender};
use pvr_api::ConnectionState;
use std::sync::Mutex;

/// Change events flowing between the core components and the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PvrEvent {
    /// The channel list of one kind changed (reconcile, hide, move,
    /// virtual add/delete).
    ChannelListChanged { radio: bool },
    /// One channel's guide table was updated.
    GuideUpdated { channel_id: i64 },
    TimerAdded { client_id: i64, index: i32 },
    TimerRemoved { client_id: i64, index: i32 },
    /// A timer began recording.
    TimerFired { client_id: i64, index: i32 },
    /// A backend started recording one of its channels.
    RecordingStarted { client_id: i64, channel_number: u32 },
    /// A previously recording timer finished or disappeared.
    RecordingStopped { client_id: i64, channel_number: u32 },
    PlaybackStarted { channel_id: Option<i64> },
    PlaybackStopped,
    ClientStateChanged { client_id: i64, state: ConnectionState },
}

/// Fan-out publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<PvrEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events published before this call are
    /// not replayed.
    pub fn subscribe(&self) -> Receiver<PvrEvent> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Publish an event to all live subscribers.
    pub fn publish(&self, event: PvrEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}
