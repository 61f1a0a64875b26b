//! Live fan-out of tally changes, one topic per poll.
//!
//! Topics are created on first subscribe and removed when the last
//! [`Subscription`] for the poll is dropped. Publishing never waits on
//! subscribers: a subscriber that falls more than `capacity` events behind
//! misses the oldest ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use shared::models::{PollId, TallyEvent};

pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug)]
struct Topics {
    channels: Mutex<HashMap<PollId, broadcast::Sender<TallyEvent>>>,
    capacity: usize,
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    topics: Arc<Topics>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Topics {
                channels: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn subscribe(&self, poll_id: PollId) -> Subscription {
        let receiver = match self.topics.channels.lock() {
            Ok(mut channels) => channels
                .entry(poll_id)
                .or_insert_with(|| broadcast::channel(self.topics.capacity).0)
                .subscribe(),
            Err(e) => {
                warn!("Failed to acquire topic lock for poll {}: {}", poll_id, e);
                broadcast::channel(1).1
            }
        };

        Subscription {
            poll_id,
            receiver: Some(receiver),
            topics: Arc::clone(&self.topics),
        }
    }

    /// Fire-and-forget. Polls without live subscribers are skipped silently.
    pub fn publish(&self, event: TallyEvent) {
        let Ok(channels) = self.topics.channels.lock() else {
            warn!("Dropping tally event for poll {}: topic lock poisoned", event.poll_id);
            return;
        };

        if let Some(sender) = channels.get(&event.poll_id) {
            match sender.send(event) {
                Ok(delivered) => debug!("Published tally event for poll {} to {} subscribers", event.poll_id, delivered),
                Err(_) => debug!("No live subscribers for poll {}", event.poll_id),
            }
        }
    }

    pub fn subscriber_count(&self, poll_id: PollId) -> usize {
        self.topics
            .channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(&poll_id).map(broadcast::Sender::receiver_count))
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.channels.lock().map(|channels| channels.len()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Subscription {
    poll_id: PollId,
    receiver: Option<broadcast::Receiver<TallyEvent>>,
    topics: Arc<Topics>,
}

impl Subscription {
    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }

    /// Next event for this poll, or `None` once the topic is gone.
    pub async fn recv(&mut self) -> Option<TallyEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber on poll {} lagged, skipped {} events", self.poll_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.receiver.take());

        if let Ok(mut channels) = self.topics.channels.lock() {
            let idle = channels
                .get(&self.poll_id)
                .is_some_and(|sender| sender.receiver_count() == 0);
            if idle {
                channels.remove(&self.poll_id);
                debug!("Closed idle topic for poll {}", self.poll_id);
            }
        }
    }
}
