//! Fan-out of server descriptions to independent subscribers.
//!
//! Each subscriber owns a latest-wins mailbox (a [`watch`] channel). Publishing
//! overwrites every mailbox without waiting, so a slow or absent consumer can
//! never stall the monitor or other subscribers; it simply skips to the most
//! recent description when it next reads.
//!
//! The broadcaster keeps the most recent description as durable state and
//! hands it to every new subscriber immediately. Dropping a mailbox's sender
//! closes it: the subscriber drains any unread description and then sees
//! `None`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures_util::stream::{self, Stream};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::{ServerDescription, SubscriptionId};
use crate::error::{Error, Result};

/// Cheaply cloneable handle to one server's broadcaster.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<BroadcastState>,
}

struct BroadcastState {
    subscribers: HashMap<SubscriptionId, watch::Sender<ServerDescription>>,
    latest: ServerDescription,
    next_id: u64,
    closed: bool,
}

impl Broadcaster {
    /// Create a broadcaster whose current description is `initial`.
    #[must_use]
    pub fn new(initial: ServerDescription) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BroadcastState {
                    subscribers: HashMap::new(),
                    latest: initial,
                    next_id: 0,
                    closed: false,
                }),
            }),
        }
    }

    /// Register a new subscriber.
    ///
    /// The current description is waiting in the new mailbox, so the first
    /// [`Subscription::recv`] returns immediately.
    ///
    /// # Errors
    ///
    /// [`Error::SubscribeAfterClosed`] once [`shutdown`](Self::shutdown) ran.
    pub fn subscribe(&self) -> Result<Subscription> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(Error::SubscribeAfterClosed);
        }

        state.next_id += 1;
        let id = SubscriptionId::new(state.next_id);
        let (tx, mut rx) = watch::channel(state.latest.clone());
        rx.mark_changed();
        state.subscribers.insert(id, tx);

        debug!(
            subscription = %id,
            subscribers = state.subscribers.len(),
            "Subscribed"
        );
        Ok(Subscription {
            id,
            rx,
            broadcaster: Arc::downgrade(&self.inner),
        })
    }

    /// Deliver `desc` to every subscriber and remember it as the latest.
    ///
    /// Never waits. Subscribers whose receiving side is gone are pruned.
    /// Ignored after shutdown.
    pub fn publish(&self, desc: ServerDescription) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.latest = desc;

        let BroadcastState {
            subscribers,
            latest,
            ..
        } = &mut *state;
        subscribers.retain(|id, tx| {
            let delivered = tx.send(latest.clone()).is_ok();
            if !delivered {
                debug!(subscription = %id, "Pruned subscriber with dropped receiver");
            }
            delivered
        });
    }

    /// Remove a subscriber and close its mailbox.
    ///
    /// Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Close every mailbox and reject future subscriptions. Idempotent.
    pub fn shutdown(&self) {
        let closed = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.subscribers)
        };
        info!(subscribers = closed.len(), "Broadcaster shut down");
        drop(closed);
    }

    /// The most recently published description.
    #[must_use]
    pub fn latest(&self) -> ServerDescription {
        self.inner.state.lock().latest.clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

impl Inner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.state.lock().subscribers.remove(&id);
        let found = removed.is_some();
        drop(removed);
        if found {
            debug!(subscription = %id, "Unsubscribed");
        }
        found
    }
}

/// A consumer's live feed of server descriptions.
///
/// Dropping a subscription unsubscribes it.
pub struct Subscription {
    id: SubscriptionId,
    rx: watch::Receiver<ServerDescription>,
    broadcaster: Weak<Inner>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next unread description.
    ///
    /// Returns `None` once the mailbox is closed (by unsubscribe or shutdown)
    /// and everything published before the close has been read.
    pub async fn recv(&mut self) -> Option<ServerDescription> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Take the unread description without waiting.
    ///
    /// Returns `None` if nothing is unread or the mailbox is closed.
    pub fn try_recv(&mut self) -> Option<ServerDescription> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Stop receiving. The mailbox closes; any unread description can
    /// still be read before `recv` returns `None`.
    pub fn unsubscribe(&mut self) {
        if let Some(inner) = self.broadcaster.upgrade() {
            inner.remove(self.id);
        }
    }

    /// Convert into a [`Stream`] of descriptions ending when the mailbox
    /// closes.
    pub fn into_stream(self) -> impl Stream<Item = ServerDescription> {
        stream::unfold(self, |mut sub| async move {
            let desc = sub.recv().await?;
            Some((desc, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
