use crate::context::{Context, Environment};
use anyhow::Result;
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::{Digest, Sha256},
    Hasher, Signer,
};
use std::sync::{Mutex, PoisonError};

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let private = PrivateKey::from_seed(seed);
    let public = private.public_key();
    (private, public)
}

/// Creates a deterministic entropy seed
pub fn create_seed(index: u64) -> Digest {
    Sha256::hash(&index.to_be_bytes())
}

/// Creates an execution context at `slot` and `unix_timestamp`
pub fn create_context(slot: u64, unix_timestamp: i64) -> Context {
    Context {
        slot,
        unix_timestamp,
        seed: create_seed(slot),
    }
}

/// Environment with a manually driven clock.
///
/// Each call to [Environment::context] advances the slot; time only moves when told to.
pub struct ManualEnvironment {
    state: Mutex<(u64, i64)>,
}

impl ManualEnvironment {
    pub fn new(unix_timestamp: i64) -> Self {
        Self {
            state: Mutex::new((0, unix_timestamp)),
        }
    }

    pub fn advance(&self, secs: i64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.1 = state.1.saturating_add(secs);
    }

    pub fn now(&self) -> i64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

impl Environment for ManualEnvironment {
    fn context(&self) -> Result<Context> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0 = state.0.saturating_add(1);
        Ok(create_context(state.0, state.1))
    }
}
