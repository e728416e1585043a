//! Tracks in-flight client commands so their eventual events can echo a
//! `correlation_id`, with a bounded TTL so a client that never reads its
//! events doesn't leak memory.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const ENTRY_TTL: Duration = Duration::from_secs(60);

struct Entry {
    command_name: String,
    t_ms: u64,
    inserted_at: Instant,
}

/// A correlation id to `(commandName, tMs)` map, guarded by a plain mutex
/// since lookups and inserts are never held across an `.await`.
pub struct CorrelationMap {
    entries: Mutex<HashMap<String, Entry>>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, correlation_id: impl Into<String>, command_name: impl Into<String>, t_ms: u64) {
        let mut entries = self.entries.lock();
        Self::evict_expired(&mut entries);
        entries.insert(
            correlation_id.into(),
            Entry {
                command_name: command_name.into(),
                t_ms,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn lookup(&self, correlation_id: &str) -> Option<(String, u64)> {
        let entries = self.entries.lock();
        entries.get(correlation_id).map(|e| (e.command_name.clone(), e.t_ms))
    }

    pub fn remove(&self, correlation_id: &str) {
        self.entries.lock().remove(correlation_id);
    }

    fn evict_expired(entries: &mut HashMap<String, Entry>) {
        entries.retain(|_, e| e.inserted_at.elapsed() < ENTRY_TTL);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CorrelationMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_roundtrips() {
        let map = CorrelationMap::new();
        map.insert("c1", "start_session", 10);
        let (name, t_ms) = map.lookup("c1").unwrap();
        assert_eq!(name, "start_session");
        assert_eq!(t_ms, 10);
    }

    #[test]
    fn remove_drops_entry() {
        let map = CorrelationMap::new();
        map.insert("c1", "start_session", 10);
        map.remove("c1");
        assert!(map.lookup("c1").is_none());
    }
}
