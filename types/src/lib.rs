//! Shared types for the esports league ledger.
//!
//! `league` holds the account records and program errors, `execution` the instruction and
//! transaction wire format plus the keys, values, events and receipts exchanged with the
//! execution layer.

pub mod execution;
pub mod league;

pub use execution::{
    transaction_namespace, Event, Instruction, Key, Output, Receipt, Transaction,
    TransactionSignature, Value, NAMESPACE,
};
pub use league::{GameState, Player, ProgramError};
