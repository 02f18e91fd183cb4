//! In-memory pending selections, keyed by user id.
//!
//! A selection lives from the first select-menu change until the order is
//! submitted or cancelled. Entries older than the TTL are treated as absent
//! and removed by the periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct PendingSelection {
    pub product_keys: Vec<String>,
    pub created_at: Instant,
}

pub struct SelectionCache {
    entries: Mutex<HashMap<String, PendingSelection>>,
    ttl: Duration,
}

impl SelectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store a selection, replacing any previous one for the user.
    pub fn select(&self, user_id: &str, product_keys: Vec<String>) {
        self.select_at(user_id, product_keys, Instant::now());
    }

    pub fn select_at(&self, user_id: &str, product_keys: Vec<String>, now: Instant) {
        self.entries.lock().insert(
            user_id.to_string(),
            PendingSelection {
                product_keys,
                created_at: now,
            },
        );
    }

    /// Current selection, or `None` when absent or expired.
    pub fn get(&self, user_id: &str) -> Option<Vec<String>> {
        self.get_at(user_id, Instant::now())
    }

    pub fn get_at(&self, user_id: &str, now: Instant) -> Option<Vec<String>> {
        let mut entries = self.entries.lock();
        let live = entries
            .get(user_id)
            .map(|sel| self.is_live(sel, now).then(|| sel.product_keys.clone()));
        match live {
            Some(Some(keys)) => Some(keys),
            Some(None) => {
                entries.remove(user_id);
                None
            }
            None => None,
        }
    }

    /// Remove and return the selection (order submitted).
    pub fn take(&self, user_id: &str) -> Option<Vec<String>> {
        self.take_at(user_id, Instant::now())
    }

    pub fn take_at(&self, user_id: &str, now: Instant) -> Option<Vec<String>> {
        self.entries
            .lock()
            .remove(user_id)
            .filter(|sel| self.is_live(sel, now))
            .map(|sel| sel.product_keys)
    }

    /// Drop the selection (order cancelled). Returns whether one existed.
    pub fn clear(&self, user_id: &str) -> bool {
        self.entries.lock().remove(user_id).is_some()
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, sel| now.saturating_duration_since(sel.created_at) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, sel: &PendingSelection, now: Instant) -> bool {
        now.saturating_duration_since(sel.created_at) < self.ttl
    }

    /// Sweep every `interval` until the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let dropped = self.sweep();
                if dropped > 0 {
                    tracing::debug!(dropped, remaining = self.len(), "Swept expired selections");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reselect_replaces() {
        let cache = SelectionCache::new(Duration::from_secs(60));
        cache.select("u1", keys(&["riesling"]));
        cache.select("u1", keys(&["rose", "gruender"]));
        cache.select("u2", keys(&["riesling"]));
        assert_eq!(cache.get("u1"), Some(keys(&["rose", "gruender"])));
        assert_eq!(cache.get("u2"), Some(keys(&["riesling"])));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn take_and_clear_remove() {
        let cache = SelectionCache::new(Duration::from_secs(60));
        cache.select("u1", keys(&["riesling"]));
        assert_eq!(cache.take("u1"), Some(keys(&["riesling"])));
        assert_eq!(cache.get("u1"), None);

        cache.select("u1", keys(&["rose"]));
        assert!(cache.clear("u1"));
        assert!(!cache.clear("u1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_are_invisible_and_swept() {
        let cache = SelectionCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.select_at("old", keys(&["riesling"]), t0);
        cache.select_at("new", keys(&["rose"]), t0 + Duration::from_secs(50));

        let later = t0 + Duration::from_secs(61);
        assert_eq!(cache.get_at("old", later), None);
        assert_eq!(cache.take_at("old", later), None);

        cache.select_at("old", keys(&["riesling"]), t0);
        assert_eq!(cache.sweep_at(later), 1);
        assert_eq!(cache.get_at("new", later), Some(keys(&["rose"])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn sweeper_task_drops_expired() {
        let cache = Arc::new(SelectionCache::new(Duration::from_millis(10)));
        cache.select("u1", keys(&["riesling"]));
        let handle = cache.clone().spawn_sweeper(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.is_empty());
        handle.abort();
    }
}
