//! League execution layer.
//!
//! This crate contains the transaction execution logic ([`Layer`]), the per-instruction
//! validators, battle resolution and the [`Ledger`] that serializes concurrent submissions
//! over a shared [`State`].
//!
//! ## Determinism requirements
//! - Execution reads time and entropy only from the [`Context`] it is given.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Atomicity
//! A transaction either commits every account it touches plus the payer's nonce, or nothing.
//! Rejections leave state untouched and do not consume the nonce.
//!
//! ## Minimal submission pipeline (example)
//! ```rust,ignore
//! use league_execution::{Ledger, Memory, SystemEnvironment};
//! use league_types::{Instruction, Transaction};
//!
//! # async fn example(authority: commonware_cryptography::ed25519::PrivateKey,
//! #     game: commonware_cryptography::ed25519::PrivateKey) -> anyhow::Result<()> {
//! use commonware_cryptography::Signer;
//! let ledger = Ledger::new(Memory::default(), SystemEnvironment::default());
//! let tx = Transaction::new(
//!     0,
//!     &Instruction::Initialize,
//!     vec![game.public_key(), authority.public_key()],
//! )
//! .sign(&authority)
//! .sign(&game);
//! let receipt = ledger.submit(tx).await?;
//! assert!(receipt.is_committed());
//! # Ok(())
//! # }
//! ```

pub mod battle;
pub mod context;
pub mod ledger;
pub mod store;
pub mod validate;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

mod state;

pub use context::{Context, Environment, SystemEnvironment};
pub use layer::Layer;
pub use ledger::Ledger;
pub use state::{nonce, Memory, PrepareError, State, Status};
pub use store::Sqlite;
