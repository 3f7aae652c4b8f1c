use super::*;

/// Outcome of a handler: the accounts it wrote and the events it emitted, or the precondition
/// that stopped it.
pub(super) type Handled = Result<(Vec<PublicKey>, Vec<Event>), ProgramError>;

pub(super) fn invalid_accounts(expected: usize, got: usize) -> ProgramError {
    ProgramError::InvalidAccounts {
        expected: u32::try_from(expected).unwrap_or(u32::MAX),
        got: u32::try_from(got).unwrap_or(u32::MAX),
    }
}

mod battle;
mod check_in;
mod game;
