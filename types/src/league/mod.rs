//! League domain types.
//!
//! Defines the game and player account records, their invariants and the program error set
//! shared by the execution layer and clients.

mod codec;
mod constants;
mod error;
mod game;
mod player;

pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use error::*;
pub use game::*;
pub use player::*;

#[cfg(test)]
mod tests;
