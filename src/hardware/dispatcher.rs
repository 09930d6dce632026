//! Routes hardware events to the card session and the keypad subscribers.

use tokio::sync::{broadcast, mpsc};

use crate::{card_session::CardSession, hardware::HardwareEvent};

const KEY_BUFFER: usize = 32;

/// Fans key presses out to every connected subscriber.
///
/// Delivery is best-effort: a subscriber that falls behind loses the oldest
/// presses, and presses made while nobody is subscribed are not replayed.
#[derive(Debug, Clone)]
pub struct KeyBroadcaster {
    sender: broadcast::Sender<char>,
}

impl KeyBroadcaster {
    /// Create a broadcaster that buffers up to `capacity` presses per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every key pressed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<char> {
        self.sender.subscribe()
    }

    /// Send `key` to the current subscribers, returning how many there are.
    pub fn publish(&self, key: char) -> usize {
        self.sender.send(key).unwrap_or_else(|_| {
            tracing::debug!("No keypad subscribers for key {key:?}");
            0
        })
    }
}

impl Default for KeyBroadcaster {
    fn default() -> Self {
        Self::new(KEY_BUFFER)
    }
}

/// Apply hardware events until every sender for `events` is dropped.
pub async fn run_event_dispatcher(
    mut events: mpsc::Receiver<HardwareEvent>,
    keys: KeyBroadcaster,
    card_session: CardSession,
) {
    while let Some(event) = events.recv().await {
        tracing::debug!("Hardware event: {event:?}");

        match event {
            HardwareEvent::TagScanned(tag) => card_session.insert(&tag),
            HardwareEvent::TagRemoved => {
                card_session.remove();
            }
            HardwareEvent::KeyPressed(key) => {
                keys.publish(key);
            }
        }
    }

    tracing::debug!("Hardware event channel closed, dispatcher stopped");
}
