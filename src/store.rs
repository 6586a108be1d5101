// Shared player-rating store with explicit change notification.
//
// Seeding reads ratings from here. External refreshes (the tracker polls the
// registry) write through this handle and bump a watch channel, so bracket
// owners can reconcile on their own schedule instead of reacting to ambient
// global events.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

/// Thread-safe name → rating map. Cloning the handle shares the store.
#[derive(Debug, Clone)]
pub struct RatingStore {
    inner: Arc<RwLock<HashMap<String, i32>>>,
    version: Arc<watch::Sender<u64>>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::with_ratings(HashMap::new())
    }

    pub fn with_ratings(ratings: HashMap<String, i32>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(ratings)),
            version: Arc::new(version),
        }
    }

    pub fn rating(&self, name: &str) -> Option<i32> {
        self.inner.read().unwrap().get(name).copied()
    }

    /// A point-in-time copy of every rating, for seeding.
    pub fn snapshot(&self) -> HashMap<String, i32> {
        self.inner.read().unwrap().clone()
    }

    /// Insert or update one player's rating.
    pub fn upsert(&self, name: &str, rating: i32) {
        self.inner
            .write()
            .unwrap()
            .insert(name.to_string(), rating);
        self.bump();
    }

    /// Replace the whole map, as a periodic registry refresh does.
    pub fn replace_all(&self, ratings: HashMap<String, i32>) {
        *self.inner.write().unwrap() = ratings;
        self.bump();
    }

    /// Subscribe to change notifications. The value is a version counter;
    /// any bump means ratings may have changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new()
    }
}
