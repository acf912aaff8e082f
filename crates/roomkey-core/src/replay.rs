//! Bounded record of which event decrypted at each message index.
//!
//! Each session keeps its highest `window` indices. Sessions are evicted in
//! least recently used order once `max_sessions` are tracked. Indices that
//! have fallen out of the record are no longer checked.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::types::SessionKeyId;

pub(crate) struct ReplayTable {
    windows: HashMap<SessionKeyId, BTreeMap<u32, String>>,
    /// Most recent at back
    lru_order: VecDeque<SessionKeyId>,
    max_sessions: usize,
    window: usize,
}

impl ReplayTable {
    pub(crate) fn new(max_sessions: usize, window: usize) -> Self {
        Self {
            windows: HashMap::new(),
            lru_order: VecDeque::new(),
            max_sessions: max_sessions.max(1),
            window: window.max(1),
        }
    }

    /// Record `event_id` at `index`.
    ///
    /// Returns the earlier event id when a different event already used
    /// this index.
    pub(crate) fn record(&mut self, key: &SessionKeyId, index: u32, event_id: &str) -> Option<String> {
        if self.windows.contains_key(key) {
            self.lru_order.retain(|tracked| tracked != key);
        } else if self.windows.len() >= self.max_sessions
            && let Some(oldest) = self.lru_order.pop_front()
        {
            self.windows.remove(&oldest);
        }
        self.lru_order.push_back(key.clone());

        let window = self.windows.entry(key.clone()).or_default();
        if let Some(first) = window.get(&index) {
            return (first != event_id).then(|| first.clone());
        }

        window.insert(index, event_id.to_owned());
        while window.len() > self.window {
            window.pop_first();
        }
        None
    }

    /// Remembered indices across all sessions.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.windows.values().map(BTreeMap::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn session_count(&self) -> usize {
        self.windows.len()
    }
}
