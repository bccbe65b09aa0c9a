use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::ReservationEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Per-hotel broadcast of reservation changes.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<ReservationEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes for a hotel. Creates the channel if needed.
    pub fn subscribe(&self, hotel_id: &str) -> broadcast::Receiver<ReservationEvent> {
        let sender = self
            .channels
            .entry(hotel_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, hotel_id: &str, event: &ReservationEvent) {
        if let Some(sender) = self.channels.get(hotel_id) {
            let _ = sender.send(event.clone());
        }
    }

    pub fn subscriber_count(&self, hotel_id: &str) -> usize {
        self.channels
            .get(hotel_id)
            .map_or(0, |s| s.receiver_count())
    }
}
