//! Chaotic store wrapper for fault injection testing
//!
//! Randomly fails operations so tests can check that a failed insert leaves
//! no state behind and that a retried key event still installs exactly one
//! session.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{SessionStore, StoreError};
use crate::{
    session::InboundGroupSession,
    types::{Curve25519Key, SessionId},
};

/// Store wrapper that randomly injects `StoreError::Io` failures
///
/// Failures are decided by a seeded LCG so chaos runs are reproducible.
#[derive(Clone)]
pub struct ChaoticSessionStore<S: SessionStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
}

struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: SessionStore> ChaoticSessionStore<S> {
    /// Wrap `inner` with a fixed default seed.
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed. `failure_rate` is clamped to
    /// [0.0, 1.0].
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of store operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    fn inject(&self) -> Result<(), StoreError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let fail = match self.rng.lock() {
            Ok(mut rng) => rng.next() < self.failure_rate,
            Err(_) => true,
        };

        if fail { Err(StoreError::Io("chaotic failure injection".to_owned())) } else { Ok(()) }
    }
}

impl<S: SessionStore> SessionStore for ChaoticSessionStore<S> {
    fn get(
        &self,
        session_id: &SessionId,
        sender_key: &Curve25519Key,
    ) -> Result<Option<InboundGroupSession>, StoreError> {
        self.inject()?;
        self.inner.get(session_id, sender_key)
    }

    fn put(&self, session: &InboundGroupSession) -> Result<(), StoreError> {
        self.inject()?;
        self.inner.put(session)
    }
}
