//! Overlay fan-out.
//!
//! Each subscriber owns a bounded queue. A publish serialises the event once and `try_send`s
//! it to every queue; a subscriber whose queue is full or closed is dropped on the spot, so a
//! slow overlay can never hold up the engine or other overlays.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chatcollect_types::OverlayEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug)]
enum SendError {
    Closed,
    Full,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, mpsc::Sender<String>>,
}

#[derive(Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Mutex<Subscribers>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a subscriber with a queue of `capacity` payloads.
    pub fn subscribe(&self, capacity: usize) -> (u64, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let mut subscribers = self.lock();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.senders.insert(id, sender);
        debug!(id, "overlay subscribed");
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: u64) {
        if self.lock().senders.remove(&id).is_some() {
            debug!(id, "overlay unsubscribed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Deliver `event` to every subscriber. Returns how many received it.
    pub fn publish(&self, event: &OverlayEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(?err, "failed to serialize overlay event");
                return 0;
            }
        };

        let mut subscribers = self.lock();
        let mut dropped = Vec::new();
        for (id, sender) in subscribers.senders.iter() {
            let result = match sender.try_send(payload.clone()) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => Err(SendError::Full),
                Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
            };
            if let Err(reason) = result {
                warn!(id, ?reason, "dropping overlay subscriber");
                dropped.push(*id);
            }
        }
        for id in &dropped {
            subscribers.senders.remove(id);
        }
        subscribers.senders.len()
    }
}
