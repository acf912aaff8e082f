//! Per-session-key lock table.
//!
//! Imports take a shard's write lock around their lookup-then-insert, so the
//! same key delivered twice concurrently installs one session. Decryption
//! and shared-history queries take the read lock and therefore wait for an
//! in-flight import of the same key.

#![allow(clippy::disallowed_types, reason = "Locks guard no data, only ordering")]

use std::{
    hash::{BuildHasher, RandomState},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::types::SessionKeyId;

/// Sharded reader/writer locks keyed by [`SessionKeyId`].
///
/// Clones share the same shards. Keys that hash to the same shard serialize
/// with each other; unrelated keys usually proceed in parallel.
#[derive(Clone)]
pub struct SessionLocks {
    shards: Arc<[RwLock<()>]>,
    hasher: RandomState,
}

impl SessionLocks {
    /// Create a table with `shards` locks (at least one).
    pub fn new(shards: usize) -> Self {
        let shards: Vec<RwLock<()>> = (0..shards.max(1)).map(|_| RwLock::new(())).collect();
        Self { shards: shards.into(), hasher: RandomState::new() }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Exclusive access for an import of `key`.
    pub fn write(&self, key: &SessionKeyId) -> RwLockWriteGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        self.shard(key).write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared access for reads of `key`.
    pub fn read(&self, key: &SessionKeyId) -> RwLockReadGuard<'_, ()> {
        self.shard(key).read().unwrap_or_else(PoisonError::into_inner)
    }

    fn shard(&self, key: &SessionKeyId) -> &RwLock<()> {
        let index = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

impl std::fmt::Debug for SessionLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLocks").field("shards", &self.shards.len()).finish()
    }
}
