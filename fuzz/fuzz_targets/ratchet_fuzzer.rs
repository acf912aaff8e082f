//! Fuzz target for the symmetric ratchet
//!
//! # Invariants
//!
//! - Ratchet operations never panic
//! - `advance_to(n)` yields the same key as stepping with `advance()`
//! - Indices below the current position are unavailable
//! - Only skip-limit violations fail going forward

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomkey_crypto::{SenderKeyError, SymmetricRatchet};

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    Advance,
    AdvanceTo { target: u16 },
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: [u8; 32],
    operations: Vec<Operation>,
}

fuzz_target!(|scenario: Scenario| {
    let mut ratchet = SymmetricRatchet::new(&scenario.seed);

    for op in scenario.operations {
        let before = ratchet.index();
        match op {
            Operation::Advance => {
                let key = ratchet.advance().unwrap();
                assert_eq!(key.index(), before);
            },
            Operation::AdvanceTo { target } => {
                let target = u32::from(target);
                match ratchet.advance_to(target) {
                    Ok(key) => {
                        assert!(target >= before);
                        assert_eq!(key.index(), target);

                        let mut stepper = SymmetricRatchet::new(&scenario.seed);
                        let mut stepped = stepper.advance().unwrap();
                        while stepped.index() < target {
                            stepped = stepper.advance().unwrap();
                        }
                        assert_eq!(stepped.key(), key.key());
                    },
                    Err(SenderKeyError::IndexUnavailable { .. }) => assert!(target < before),
                    Err(SenderKeyError::IndexTooFarAhead { .. }) => assert!(target > before),
                    Err(e) => panic!("unexpected ratchet error: {e}"),
                }
            },
        }
    }
});
