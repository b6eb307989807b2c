use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use smartmarks_core::{ChangeEvent, ChangeFeed, FeedMessage, Subscription, UserId};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

struct HubInner {
    channels: RwLock<HashMap<UserId, broadcast::Sender<ChangeEvent>>>,
    capacity: usize,
}

/// Fans bookmark changes out to every live subscription of the same owner.
///
/// Each owner gets its own broadcast channel, so events never cross users.
/// A channel is dropped once its last subscription is released.
#[derive(Clone)]
pub struct FeedHub {
    inner: Arc<HubInner>,
}

impl FeedHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: RwLock::new(HashMap::new()),
                capacity,
            }),
        }
    }

    /// Send an event to `owner`'s subscribers, returning how many received it
    pub fn publish(&self, owner: &UserId, event: ChangeEvent) -> usize {
        let channels = self
            .inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match channels.get(owner) {
            // No receivers is fine; nobody has the list open
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Get or create the owner's channel and add a receiver to it
    fn open(&self, owner: &UserId) -> broadcast::Receiver<ChangeEvent> {
        // First try the existing channel
        {
            let channels = self
                .inner
                .channels
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(sender) = channels.get(owner) {
                return sender.subscribe();
            }
        }

        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(owner.clone())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe()
    }

    fn prune(&self, owner: &UserId) {
        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if channels
            .get(owner)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(owner);
            tracing::debug!("Closed change feed channel for {}", owner);
        }
    }

    /// Live subscriptions for one owner
    pub fn subscriber_count(&self, owner: &UserId) -> usize {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Owners with at least one open channel
    pub fn channel_count(&self) -> usize {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ChangeFeed for FeedHub {
    async fn subscribe(&self, owner: &UserId) -> smartmarks_core::error::Result<Subscription> {
        let receiver = self.open(owner);
        let stream = BroadcastStream::new(receiver).map(|item| match item {
            Ok(event) => FeedMessage::Change(event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => FeedMessage::Gap { missed },
        });

        let hub = self.clone();
        let released_owner = owner.clone();
        tracing::debug!("Opened change feed subscription for {}", owner);

        Ok(Subscription::new(owner.clone(), stream)
            .on_release(move || hub.prune(&released_owner)))
    }
}
