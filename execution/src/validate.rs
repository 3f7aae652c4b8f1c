//! Instruction validators.
//!
//! Each validator is a pure function over the loaded account records, the verified signer set
//! and the instruction arguments. It returns the records the transition should write, or the
//! first violated precondition. Validators never touch the store.

use commonware_cryptography::ed25519::PublicKey;
use league_types::{
    execution::{Transaction, Value},
    league::{validate_name, CheckInStatus, GameState, Player, ProgramError, SignerRole},
};
use std::collections::BTreeSet;

/// Identities whose signatures verified over the transaction payload.
#[derive(Clone, Debug, Default)]
pub struct Signers {
    keys: BTreeSet<PublicKey>,
}

impl Signers {
    pub fn new(keys: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Collects the signers of a transaction. Callers must have verified the signatures.
    pub fn from_transaction(transaction: &Transaction) -> Self {
        Self::new(transaction.signers().cloned())
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.contains(key)
    }

    fn require(&self, key: &PublicKey, role: SignerRole) -> Result<(), ProgramError> {
        if !self.contains(key) {
            return Err(ProgramError::MissingSignature { role });
        }
        Ok(())
    }
}

fn load_player(account: Option<&Value>, missing: ProgramError) -> Result<Player, ProgramError> {
    match account {
        Some(Value::Player(player)) => Ok(player.clone()),
        _ => Err(missing),
    }
}

/// Checks `initialize` and returns the game record to create.
///
/// Order: authority signature, game account signature, then that nothing lives at the game
/// address.
pub fn initialize(
    signers: &Signers,
    game: &PublicKey,
    authority: &PublicKey,
    game_account: Option<&Value>,
) -> Result<GameState, ProgramError> {
    signers.require(authority, SignerRole::Authority)?;
    signers.require(game, SignerRole::GameState)?;
    if game_account.is_some() {
        return Err(ProgramError::AccountAlreadyInitialized);
    }
    Ok(GameState::new(authority.clone()))
}

/// Checks `mintPlayer` and returns the player record to create.
///
/// Order: user signature, player account signature, game exists, player address unused, name.
pub fn mint_player(
    signers: &Signers,
    player: &PublicKey,
    user: &PublicKey,
    game: &PublicKey,
    game_account: Option<&Value>,
    player_account: Option<&Value>,
    player_name: &str,
) -> Result<Player, ProgramError> {
    signers.require(user, SignerRole::User)?;
    signers.require(player, SignerRole::Player)?;
    if !matches!(game_account, Some(Value::GameState(_))) {
        return Err(ProgramError::GameStateNotFound);
    }
    if player_account.is_some() {
        return Err(ProgramError::AccountAlreadyInitialized);
    }
    validate_name(player_name).map_err(|_| ProgramError::InvalidName)?;
    Ok(Player::new(user.clone(), game.clone(), player_name.to_string()))
}

/// Checks `battle` and returns both participants as loaded.
///
/// A self battle is refused before anything else so that `battle(A, A)` fails the same way
/// whether or not `A` exists. Players from different games may battle.
pub fn battle(
    signers: &Signers,
    player: &PublicKey,
    opponent: &PublicKey,
    authority: &PublicKey,
    player_account: Option<&Value>,
    opponent_account: Option<&Value>,
) -> Result<(Player, Player), ProgramError> {
    if player == opponent {
        return Err(ProgramError::SelfBattleNotAllowed);
    }
    let player = load_player(player_account, ProgramError::PlayerNotFound)?;
    let opponent = load_player(opponent_account, ProgramError::OpponentNotFound)?;
    signers.require(authority, SignerRole::Authority)?;
    if &player.owner != authority {
        return Err(ProgramError::Unauthorized);
    }
    Ok((player, opponent))
}

/// Checks `dailyCheckIn` at time `now` and returns the player as loaded.
pub fn daily_check_in(
    signers: &Signers,
    authority: &PublicKey,
    player_account: Option<&Value>,
    now: i64,
) -> Result<Player, ProgramError> {
    let player = load_player(player_account, ProgramError::PlayerNotFound)?;
    signers.require(authority, SignerRole::Authority)?;
    if &player.owner != authority {
        return Err(ProgramError::Unauthorized);
    }
    if let CheckInStatus::Cooling { remaining_secs } = player.check_in_status(now) {
        return Err(ProgramError::CheckInTooEarly { remaining_secs });
    }
    Ok(player)
}
