//! Cancellable push subscriptions.
//!
//! A publisher keeps a [`Watchers`] registry keyed by topic (a document path,
//! or a single key for auth state). Each call to [`Watchers::watch`] hands out
//! a [`Subscription`] that owns the receiving half of a channel plus a detach
//! guard. Releasing the subscription (explicitly with
//! [`Subscription::unsubscribe`] or by dropping it) removes its sender from
//! the registry, so no further events are queued for it.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;

type Senders<T> = HashMap<String, Vec<(u64, mpsc::UnboundedSender<T>)>>;

pub struct Watchers<T> {
    next_id: AtomicU64,
    senders: Arc<Mutex<Senders<T>>>,
}

impl<T> Default for Watchers<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            senders: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> fmt::Debug for Watchers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchers")
            .field("active", &self.active())
            .finish()
    }
}

fn lock<T>(senders: &Mutex<Senders<T>>) -> MutexGuard<'_, Senders<T>> {
    senders.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Watchers<T> {
    /// Registers a new subscriber on `topic`, queueing `initial` first.
    pub fn watch(&self, topic: &str, initial: T) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(initial);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.senders)
            .entry(topic.to_string())
            .or_default()
            .push((id, tx));

        let senders = Arc::clone(&self.senders);
        let topic = topic.to_string();
        Subscription::new(rx, move || {
            let mut senders = lock(&senders);
            if let Some(list) = senders.get_mut(&topic) {
                list.retain(|(sender_id, _)| *sender_id != id);
                if list.is_empty() {
                    senders.remove(&topic);
                }
            }
        })
    }

    /// Queues `event` for every live subscriber of `topic`.
    pub fn notify(&self, topic: &str, event: T) {
        let mut senders = lock(&self.senders);
        if let Some(list) = senders.get_mut(topic) {
            list.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        }
    }
}

impl<T> Watchers<T> {
    /// Number of live subscribers across all topics.
    pub fn active(&self) -> usize {
        lock(&self.senders).values().map(Vec::len).sum()
    }
}

/// Receiving end of a push subscription.
///
/// The handle must be released on teardown; dropping it does so as well.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl<T> Subscription<T> {
    pub fn new(
        rx: mpsc::UnboundedReceiver<T>,
        detach: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            rx,
            detach: Some(Box::new(detach)),
        }
    }

    /// Waits for the next event. `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Detaches from the publisher. Queued events are discarded.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
        self.rx.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
