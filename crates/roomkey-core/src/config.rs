//! Core configuration.

/// Configuration threaded into the components at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// Honor the sender's shared-history flag on incoming room keys.
    ///
    /// When `false` every installed session gets `shared_history = false`.
    pub honor_shared_history_hints: bool,
    /// Number of lock shards serializing work per session key.
    pub lock_shards: usize,
    /// Most recent message indices remembered per session for replay
    /// detection.
    pub replay_window: usize,
    /// Sessions tracked for replay detection before the least recently
    /// used one is forgotten.
    pub replay_sessions: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            honor_shared_history_hints: false,
            lock_shards: 64,
            replay_window: 1024,
            replay_sessions: 4096,
        }
    }
}

impl CoreConfig {
    /// Default configuration with shared-history hints honored.
    pub fn honoring_shared_history() -> Self {
        Self { honor_shared_history_hints: true, ..Self::default() }
    }
}
