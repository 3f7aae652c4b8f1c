use crate::{Error, Result};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use commonware_math::algebra::Random;
use league_execution::{Environment, Ledger, Sqlite, State, SystemEnvironment};
use league_types::{
    execution::{Event, Instruction, Receipt, Transaction, Value},
    league::{GameState, Player, ProgramError},
};
use rand::{rngs::OsRng, Rng};
use std::path::Path;
use tracing::warn;

/// Generates a fresh ed25519 keypair from the OS entropy source.
pub fn generate_keypair() -> (PrivateKey, PublicKey) {
    let private = PrivateKey::random(&mut OsRng);
    let public = private.public_key();
    (private, public)
}

/// Name given to players minted without one.
pub fn default_player_name() -> String {
    format!("Player {}", OsRng.gen_range(0..1000u32))
}

/// Outcome of a committed battle, from the challenger's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleReport {
    pub winner: PublicKey,
    pub player_strength: u64,
    pub opponent_strength: u64,
    pub roll: u64,
    pub player: Player,
    pub opponent: Player,
}

impl BattleReport {
    pub fn player_won(&self, player: &PublicKey) -> bool {
        &self.winner == player
    }
}

/// High-level access to a [Ledger]: builds, signs and submits instructions and turns
/// receipts into typed results.
pub struct Client<S: State, E: Environment> {
    ledger: Ledger<S, E>,
}

impl Client<Sqlite, SystemEnvironment> {
    /// Opens (or creates) a SQLite-backed ledger driven by the system clock.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Sqlite::open(path)?;
        Ok(Self::new(Ledger::new(store, SystemEnvironment::default())))
    }
}

impl<S: State, E: Environment> Client<S, E> {
    pub fn new(ledger: Ledger<S, E>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger<S, E> {
        &self.ledger
    }

    /// Submits a pre-built transaction as is.
    pub async fn submit(&self, transaction: Transaction) -> Result<Receipt> {
        Ok(self.ledger.submit(transaction).await?)
    }

    /// Submits `build(nonce)` with the payer's current nonce.
    ///
    /// A concurrent submission from the same payer can consume the nonce between the read and
    /// the submit; that case is retried once with the nonce the ledger expects.
    async fn send(&self, payer: &PublicKey, build: impl Fn(u64) -> Transaction) -> Result<Receipt> {
        let nonce = self.ledger.nonce(payer).await?;
        match self.ledger.submit(build(nonce)).await? {
            Receipt::Rejected(ProgramError::NonceMismatch { expected, got }) => {
                warn!(expected, got, "nonce consumed concurrently, retrying");
                Ok(self.ledger.submit(build(expected)).await?)
            }
            receipt => Ok(receipt),
        }
    }

    /// Creates the game state account at `game`, recording `authority` as its authority.
    pub async fn initialize_game(
        &self,
        authority: &PrivateKey,
        game: &PrivateKey,
    ) -> Result<GameState> {
        let authority_address = authority.public_key();
        let game_address = game.public_key();
        let accounts = vec![game_address.clone(), authority_address.clone()];
        let receipt = committed(
            self.send(&authority_address, |nonce| {
                Transaction::new(nonce, &Instruction::Initialize, accounts.clone())
                    .sign(authority)
                    .sign(game)
            })
            .await?,
        )?;
        match receipt.account(&game_address) {
            Some(Value::GameState(state)) => Ok(state.clone()),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Mints a player at the address of `player`, owned by `user`. Without a name the player
    /// is called `Player N` for a random `N` below 1000.
    pub async fn mint_player(
        &self,
        user: &PrivateKey,
        game: &PublicKey,
        player: &PrivateKey,
        name: Option<String>,
    ) -> Result<Player> {
        let user_address = user.public_key();
        let player_address = player.public_key();
        let instruction = Instruction::MintPlayer {
            player_name: name.unwrap_or_else(default_player_name),
        };
        let accounts = vec![game.clone(), player_address.clone(), user_address.clone()];
        let receipt = committed(
            self.send(&user_address, |nonce| {
                Transaction::new(nonce, &instruction, accounts.clone())
                    .sign(user)
                    .sign(player)
            })
            .await?,
        )?;
        receipt
            .player(&player_address)
            .cloned()
            .ok_or(Error::UnexpectedResponse)
    }

    /// Battles `opponent` with `player`, signed by the player's owner.
    pub async fn battle(
        &self,
        owner: &PrivateKey,
        player: &PublicKey,
        opponent: &PublicKey,
    ) -> Result<BattleReport> {
        let owner_address = owner.public_key();
        let instruction = Instruction::Battle {
            opponent: opponent.clone(),
        };
        let accounts = vec![player.clone(), opponent.clone(), owner_address.clone()];
        let receipt = committed(
            self.send(&owner_address, |nonce| {
                Transaction::new(nonce, &instruction, accounts.clone()).sign(owner)
            })
            .await?,
        )?;

        let (winner, player_strength, opponent_strength, roll) = receipt
            .events()
            .iter()
            .find_map(|event| match event {
                Event::BattleResolved {
                    winner,
                    player_strength,
                    opponent_strength,
                    roll,
                    ..
                } => Some((winner.clone(), *player_strength, *opponent_strength, *roll)),
                _ => None,
            })
            .ok_or(Error::UnexpectedResponse)?;
        let player_record = receipt.player(player).ok_or(Error::UnexpectedResponse)?;
        let opponent_record = receipt.player(opponent).ok_or(Error::UnexpectedResponse)?;
        Ok(BattleReport {
            winner,
            player_strength,
            opponent_strength,
            roll,
            player: player_record.clone(),
            opponent: opponent_record.clone(),
        })
    }

    /// Claims the daily check-in reward for `player`, signed by its owner.
    pub async fn daily_check_in(&self, owner: &PrivateKey, player: &PublicKey) -> Result<Player> {
        let owner_address = owner.public_key();
        let accounts = vec![player.clone(), owner_address.clone()];
        let receipt = committed(
            self.send(&owner_address, |nonce| {
                Transaction::new(nonce, &Instruction::DailyCheckIn, accounts.clone()).sign(owner)
            })
            .await?,
        )?;
        receipt
            .player(player)
            .cloned()
            .ok_or(Error::UnexpectedResponse)
    }

    pub async fn account(&self, address: &PublicKey) -> Result<Value> {
        self.ledger
            .account(address)
            .await?
            .ok_or(Error::AccountNotFound)
    }

    pub async fn player(&self, address: &PublicKey) -> Result<Player> {
        self.ledger
            .player(address)
            .await?
            .ok_or(Error::AccountNotFound)
    }

    pub async fn game_state(&self, address: &PublicKey) -> Result<GameState> {
        self.ledger
            .game_state(address)
            .await?
            .ok_or(Error::AccountNotFound)
    }

    pub async fn nonce(&self, address: &PublicKey) -> Result<u64> {
        Ok(self.ledger.nonce(address).await?)
    }
}

fn committed(receipt: Receipt) -> Result<Receipt> {
    match receipt {
        Receipt::Rejected(error) => Err(Error::Rejected(error)),
        receipt => Ok(receipt),
    }
}
