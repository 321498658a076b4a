//! The ordered list of tracks waiting to be played in a guild.

use std::collections::VecDeque;

use delegate::delegate;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tokio::sync::Notify;

use super::PlaybackItem;
use crate::error::QueueError;

/// Tracks waiting to be played, in play order.
///
/// Every operation locks the list once, so readers never see a half applied mutation.
/// Only the session's drain loop should call [TrackQueue::pop_front_blocking].
#[derive(Debug, Default)]
pub struct TrackQueue {
    #[allow(clippy::missing_docs_in_private_items)]
    items: Mutex<VecDeque<PlaybackItem>>,
    /// Wakes the consumer after a push.
    available: Notify,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the back of the queue.
    pub async fn push_back(&self, item: PlaybackItem) {
        self.items.lock().await.push_back(item);
        self.available.notify_one();
    }

    /// Wait until there is a track and take it from the front.
    pub async fn pop_front_blocking(&self) -> PlaybackItem {
        loop {
            if let Some(item) = self.items.lock().await.pop_front() {
                return item;
            }
            // A push that lands between the check above and this wait leaves a permit behind.
            self.available.notified().await;
        }
    }

    /// Remove the track at `index` (0-based), shifting the ones after it forward.
    pub async fn remove_at(&self, index: usize) -> Result<PlaybackItem, QueueError> {
        let mut items = self.items.lock().await;
        let len = items.len();
        items
            .remove(index)
            .ok_or(QueueError::IndexOutOfRange { index, len })
    }

    /// Randomly reorder the remaining tracks.
    pub async fn shuffle(&self) {
        let mut items = self.items.lock().await;
        items.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    /// Copy of the tracks in `start..end`, clamped to the queue's length.
    pub async fn slice(&self, start: usize, end: usize) -> Vec<PlaybackItem> {
        let items = self.items.lock().await;
        let end = end.min(items.len());
        if start >= end {
            return Vec::new();
        }
        items.range(start..end).cloned().collect()
    }

    /// Clone the element at the front.
    pub async fn front(&self) -> Option<PlaybackItem> {
        self.items.lock().await.front().cloned()
    }

    delegate! {
        to self.items.lock().await {
            /// Remove every track.
            #[await(false)]
            pub async fn clear(&self);
            /// Number of tracks waiting.
            #[await(false)]
            pub async fn len(&self) -> usize;
            /// Whether no track is waiting.
            #[await(false)]
            pub async fn is_empty(&self) -> bool;
        }
    }
}
