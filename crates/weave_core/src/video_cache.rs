//! crates/weave_core/src/video_cache.rs
//!
//! Hands a freshly recorded video from the recording flow to anything else
//! showing the same group, without a server round trip.
//!
//! One entry per group id, last write wins. Every mutation fans the full
//! current map out to all subscribers synchronously. Nothing is persisted.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A locally recorded video that has not necessarily been uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVideo {
    pub uri: String,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocalVideo {
    pub fn new(uri: impl Into<String>, duration: f64) -> Self {
        Self {
            uri: uri.into(),
            duration,
            timestamp: Utc::now(),
        }
    }
}

/// Snapshot handed to listeners: group id to its latest local video.
pub type VideoMap = HashMap<String, LocalVideo>;

type Listener = Arc<dyn Fn(&VideoMap) + Send + Sync>;

#[derive(Default)]
struct Registry {
    videos: Mutex<VideoMap>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

impl Registry {
    fn is_registered(&self, id: u64) -> bool {
        self.listeners.lock().iter().any(|(l, _)| *l == id)
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.lock().retain(|(l, _)| *l != id);
    }
}

/// Shared handle to the cache. Clones observe the same entries and listeners.
#[derive(Clone, Default)]
pub struct VideoCache {
    registry: Arc<Registry>,
}

impl VideoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `video` for `group_id`, replacing any earlier one.
    pub fn add(&self, group_id: impl Into<String>, video: LocalVideo) {
        self.registry.videos.lock().insert(group_id.into(), video);
        self.notify();
    }

    pub fn get(&self, group_id: &str) -> Option<LocalVideo> {
        self.registry.videos.lock().get(group_id).cloned()
    }

    /// A copy of every entry; later mutations do not show through it.
    pub fn get_all(&self) -> VideoMap {
        self.registry.videos.lock().clone()
    }

    pub fn remove(&self, group_id: &str) {
        self.registry.videos.lock().remove(group_id);
        self.notify();
    }

    pub fn clear(&self) {
        self.registry.videos.lock().clear();
        self.notify();
    }

    /// Registers `listener`, called with the full map after every mutation.
    ///
    /// The returned [`Subscription`] removes the listener when
    /// [`Subscription::unsubscribe`] is called. Listeners may unsubscribe
    /// themselves, or each other, from inside a notification.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&VideoMap) + Send + Sync + 'static,
    {
        let id = self.registry.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }

    fn notify(&self) {
        // No lock is held while listeners run, so they can call back into the cache.
        let snapshot = self.get_all();
        let listeners: Vec<(u64, Listener)> = self.registry.listeners.lock().clone();

        for (id, listener) in listeners {
            if self.registry.is_registered(id) {
                listener(&snapshot);
            }
        }
    }
}

/// Handle returned by [`VideoCache::subscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Removes the listener. A no-op once the cache itself is gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(self.id);
        }
    }
}
