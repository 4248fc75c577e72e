//! Event state store
//!
//! Latest event per type plus a bounded history of everything received.
//! One listener writes; any number of readers may query concurrently.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use seelink_core::constants::HISTORY_CAPACITY;
use seelink_types::{EventKind, EventRecord};

/// Shared event state
///
/// # Examples
///
/// ```
/// use seelink::EventStore;
/// use seelink_types::{classify, EventKind};
///
/// let store = EventStore::new();
/// let record = classify(r#"{"Event":"DiskSpace","used_percent":12}"#).unwrap().unwrap();
/// store.record(record);
///
/// assert_eq!(store.latest(&EventKind::DiskSpace).unwrap().get("used_percent").unwrap(), 12);
/// assert_eq!(store.history().len(), 1);
/// ```
#[derive(Debug)]
pub struct EventStore {
    latest: RwLock<HashMap<EventKind, Arc<EventRecord>>>,
    history: Mutex<VecDeque<Arc<EventRecord>>>,
    capacity: usize,
}

impl EventStore {
    /// Store with the default history capacity (500)
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            latest: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record an event; replaces the latest of its kind and appends to
    /// history, evicting the oldest entry when full
    pub fn record(&self, record: EventRecord) -> Arc<EventRecord> {
        let record = Arc::new(record);

        self.latest
            .write()
            .insert(record.kind.clone(), Arc::clone(&record));

        if self.capacity > 0 {
            let mut history = self.history.lock();
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(Arc::clone(&record));
        }

        record
    }

    /// Most recent event of `kind`
    pub fn latest(&self, kind: &EventKind) -> Option<Arc<EventRecord>> {
        self.latest.read().get(kind).cloned()
    }

    /// Most recent event by wire tag, else the response to method `tag`
    pub fn latest_by_tag(&self, tag: &str) -> Option<Arc<EventRecord>> {
        let latest = self.latest.read();

        latest
            .get(&EventKind::from_tag(tag))
            .or_else(|| latest.get(&EventKind::Response(tag.to_string())))
            .cloned()
    }

    /// Copy of the latest-event map
    pub fn snapshot(&self) -> HashMap<EventKind, Arc<EventRecord>> {
        self.latest.read().clone()
    }

    /// History, oldest first
    pub fn history(&self) -> Vec<Arc<EventRecord>> {
        self.history.lock().iter().cloned().collect()
    }

    /// Number of distinct event kinds seen
    pub fn len(&self) -> usize {
        self.latest.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget everything
    pub fn clear(&self) {
        self.latest.write().clear();
        self.history.lock().clear();
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seelink_types::classify;
    use std::thread;

    fn event(line: &str) -> EventRecord {
        classify(line).unwrap().unwrap()
    }

    #[test]
    fn test_last_writer_wins() {
        let store = EventStore::new();
        store.record(event(r#"{"Event":"Stack","stacked_frame":1}"#));
        store.record(event(r#"{"Event":"PiStatus","temp":40.0}"#));
        store.record(event(r#"{"Event":"Stack","stacked_frame":2}"#));

        let stack = store.latest(&EventKind::Stack).unwrap();
        assert_eq!(stack.get("stacked_frame").unwrap(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.history().len(), 3);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let store = EventStore::new();
        for i in 0..510 {
            store.record(event(&format!(r#"{{"Event":"Stack","i":{}}}"#, i)));
        }

        let history = store.history();
        assert_eq!(history.len(), 500);
        assert_eq!(history[0].get("i").unwrap(), 10);
        assert_eq!(history[499].get("i").unwrap(), 509);
    }

    #[test]
    fn test_latest_by_tag() {
        let store = EventStore::new();
        store.record(event(r#"{"method":"scope_get_equ_coord","result":{"ra":5.5,"dec":-5.4}}"#));

        assert!(store.latest_by_tag("scope_get_equ_coord").is_some());
        assert!(store.latest_by_tag("Stack").is_none());
    }

    #[test]
    fn test_latest_by_tag_prefers_event_over_response() {
        let store = EventStore::new();
        store.record(event(r#"{"Event":"Stack","stacked_frame":7}"#));
        store.record(event(r#"{"method":"Stack","result":0}"#));

        let stack = store.latest_by_tag("Stack").unwrap();
        assert_eq!(stack.kind, EventKind::Stack);
        assert_eq!(stack.get("stacked_frame").unwrap(), 7);

        store.record(event(r#"{"method":"Custom","result":1}"#));
        assert_eq!(
            store.latest_by_tag("Custom").unwrap().kind,
            EventKind::Response("Custom".to_string())
        );
    }

    #[test]
    fn test_zero_capacity_keeps_latest_only() {
        let store = EventStore::with_capacity(0);
        store.record(event(r#"{"Event":"View","state":"working"}"#));

        assert!(store.history().is_empty());
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let store = Arc::new(EventStore::with_capacity(64));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..1000 {
                    store.record(event(&format!(r#"{{"Event":"Stack","i":{}}}"#, i)));
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(store.history().len() <= 64);
                        let _ = store.snapshot();
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(store.history().len(), 64);
        assert_eq!(store.latest(&EventKind::Stack).unwrap().get("i").unwrap(), 999);
    }
}
