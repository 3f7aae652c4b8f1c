use anyhow::{Context as _, Result};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use rand::RngCore;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Execution-environment data supplied at commit time.
///
/// Instructions never take time or entropy from the caller: both come from here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    /// Monotonic execution counter.
    pub slot: u64,
    /// Unix seconds observed when the instruction was scheduled.
    pub unix_timestamp: i64,
    /// Entropy no single party controls.
    pub seed: Digest,
}

/// Source of [Context] for each executed instruction.
pub trait Environment {
    fn context(&self) -> Result<Context>;
}

/// Environment backed by the system clock and a per-process random genesis.
///
/// The seed of each slot chains the genesis with the slot number so that seeds never repeat
/// within a process.
pub struct SystemEnvironment {
    genesis: [u8; 32],
    slot: AtomicU64,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        let mut genesis = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut genesis);
        Self {
            genesis,
            slot: AtomicU64::new(0),
        }
    }
}

impl Default for SystemEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SystemEnvironment {
    fn context(&self) -> Result<Context> {
        let slot = self.slot.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the unix epoch")?;
        let unix_timestamp =
            i64::try_from(elapsed.as_secs()).context("system clock out of range")?;

        let mut hasher = Sha256::new();
        hasher.update(&self.genesis);
        hasher.update(&slot.to_be_bytes());
        Ok(Context {
            slot,
            unix_timestamp,
            seed: hasher.finalize(),
        })
    }
}
