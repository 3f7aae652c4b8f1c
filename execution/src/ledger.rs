use anyhow::{Context as _, Result};
use commonware_cryptography::ed25519::PublicKey;
use league_types::{
    execution::{Key, Receipt, Transaction, Value},
    league::{GameState, Player},
};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::{context::Environment, state::nonce, Layer, State};

/// Per-key exclusive locks, created on demand and dropped once nobody holds or awaits them.
#[derive(Default)]
struct AccountLocks {
    table: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    /// Acquires every key in ascending order. Waiters on a key are served in FIFO order.
    async fn acquire(&self, keys: BTreeSet<Key>) -> AccountGuard<'_> {
        let mut guard = AccountGuard {
            locks: self,
            keys: BTreeSet::new(),
            guards: Vec::with_capacity(keys.len()),
        };
        for key in keys {
            let lock = {
                let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
                table.entry(key.clone()).or_default().clone()
            };
            // Registered before waiting, so a cancelled acquire still prunes the entry.
            guard.keys.insert(key);
            guard.guards.push(lock.lock_owned().await);
        }
        guard
    }

    fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    keys: BTreeSet<Key>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        let mut table = self
            .locks
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            // The table holds one reference; any other is a holder or waiter.
            if table
                .get(key)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                table.remove(key);
            }
        }
    }
}

/// Keys a transaction may read or write: its declared accounts and its payer nonce.
fn lock_keys(transaction: &Transaction) -> BTreeSet<Key> {
    let mut keys: BTreeSet<Key> = transaction
        .accounts
        .iter()
        .cloned()
        .map(Key::Account)
        .collect();
    if let Some(payer) = transaction.payer() {
        keys.insert(Key::Nonce(payer.clone()));
    }
    keys
}

/// Concurrent entry point over a [State].
///
/// Transactions over disjoint accounts execute concurrently. Transactions sharing an account
/// are serialized in arrival order, so none observes another's partial effect and no update
/// is lost.
pub struct Ledger<S: State, E: Environment> {
    state: RwLock<S>,
    environment: E,
    locks: AccountLocks,
}

impl<S: State, E: Environment> Ledger<S, E> {
    pub fn new(state: S, environment: E) -> Self {
        Self {
            state: RwLock::new(state),
            environment,
            locks: AccountLocks::default(),
        }
    }

    /// Executes one transaction and commits its effect atomically.
    ///
    /// `Ok(Receipt::Rejected(..))` means the store is unchanged. `Err` is an environment or
    /// storage failure; the store is unchanged as well, so resubmitting is safe.
    pub async fn submit(&self, transaction: Transaction) -> Result<Receipt> {
        let _guard = self.locks.acquire(lock_keys(&transaction)).await;
        let context = self
            .environment
            .context()
            .context("read execution context")?;
        let slot = context.slot;

        let (receipt, changes) = {
            let state = self.state.read().await;
            let mut layer = Layer::new(&*state, context);
            let receipt = layer.process(&transaction).await?;
            (receipt, layer.commit())
        };

        match &receipt {
            Receipt::Committed { accounts, .. } => {
                self.state
                    .write()
                    .await
                    .apply(changes)
                    .await
                    .context("apply committed changes")?;
                info!(
                    slot,
                    payer = ?transaction.payer(),
                    nonce = transaction.nonce,
                    opcode = transaction.opcode,
                    accounts = accounts.len(),
                    "transaction committed"
                );
            }
            Receipt::Rejected(error) => {
                debug!(
                    slot,
                    payer = ?transaction.payer(),
                    code = error.code(),
                    kind = ?error.kind(),
                    "transaction rejected"
                );
            }
        }
        Ok(receipt)
    }

    pub async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.state.read().await.get(key).await
    }

    pub async fn account(&self, address: &PublicKey) -> Result<Option<Value>> {
        self.get(&Key::Account(address.clone())).await
    }

    pub async fn player(&self, address: &PublicKey) -> Result<Option<Player>> {
        Ok(match self.account(address).await? {
            Some(Value::Player(player)) => Some(player),
            _ => None,
        })
    }

    pub async fn game_state(&self, address: &PublicKey) -> Result<Option<GameState>> {
        Ok(match self.account(address).await? {
            Some(Value::GameState(game)) => Some(game),
            _ => None,
        })
    }

    pub async fn nonce(&self, address: &PublicKey) -> Result<u64> {
        nonce(&*self.state.read().await, address).await
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn into_inner(self) -> S {
        self.state.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mocks::{create_account_keypair, ManualEnvironment},
        state::Memory,
    };
    use commonware_cryptography::{ed25519::PrivateKey, Signer};
    use futures::future::join_all;
    use league_types::{
        execution::Instruction,
        league::{ProgramError, CHECK_IN_COOLDOWN_SECS},
    };

    const START: i64 = 1_700_000_000;

    /// Store that yields on every read so concurrent submissions interleave.
    #[derive(Default)]
    struct Yielding(Memory);

    impl State for Yielding {
        async fn get(&self, key: &Key) -> Result<Option<Value>> {
            tokio::task::yield_now().await;
            self.0.get(key).await
        }

        async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
            self.0.insert(key, value).await
        }

        async fn delete(&mut self, key: &Key) -> Result<()> {
            self.0.delete(key).await
        }
    }

    type TestLedger = Ledger<Yielding, ManualEnvironment>;

    async fn setup() -> (TestLedger, PublicKey) {
        let ledger = Ledger::new(Yielding::default(), ManualEnvironment::new(START));
        let (game_key, game) = create_account_keypair(100);
        let (authority_key, authority) = create_account_keypair(101);
        let init = Transaction::new(0, &Instruction::Initialize, vec![game.clone(), authority])
            .sign(&authority_key)
            .sign(&game_key);
        assert!(ledger.submit(init).await.unwrap().is_committed());
        (ledger, game)
    }

    async fn mint(
        ledger: &TestLedger,
        game: &PublicKey,
        owner_seed: u64,
        player_seed: u64,
    ) -> (PrivateKey, PublicKey) {
        let (owner_key, owner) = create_account_keypair(owner_seed);
        let (player_key, player) = create_account_keypair(player_seed);
        let tx = Transaction::new(
            ledger.nonce(&owner).await.unwrap(),
            &Instruction::MintPlayer {
                player_name: format!("Player {player_seed:03}"),
            },
            vec![game.clone(), player.clone(), owner],
        )
        .sign(&owner_key)
        .sign(&player_key);
        assert!(ledger.submit(tx).await.unwrap().is_committed());
        (owner_key, player)
    }

    fn battle_tx(
        owner: &PrivateKey,
        nonce: u64,
        player: &PublicKey,
        opponent: &PublicKey,
    ) -> Transaction {
        Transaction::new(
            nonce,
            &Instruction::Battle {
                opponent: opponent.clone(),
            },
            vec![player.clone(), opponent.clone(), owner.public_key()],
        )
        .sign(owner)
    }

    #[tokio::test]
    async fn test_concurrent_battles_on_shared_account_serialize() {
        let (ledger, game) = setup().await;
        let (alice, a) = mint(&ledger, &game, 1, 2).await;
        let (_, b) = mint(&ledger, &game, 3, 4).await;
        let (carol, c) = mint(&ledger, &game, 5, 6).await;

        // Alice battles Bob while Carol battles Alice: both touch `a`.
        let receipts = join_all([
            ledger.submit(battle_tx(&alice, 1, &a, &b)),
            ledger.submit(battle_tx(&carol, 1, &c, &a)),
        ])
        .await;
        for receipt in receipts {
            assert!(receipt.unwrap().is_committed());
        }

        let a_after = ledger.player(&a).await.unwrap().unwrap();
        let b_after = ledger.player(&b).await.unwrap().unwrap();
        let c_after = ledger.player(&c).await.unwrap().unwrap();
        assert_eq!(a_after.battles_played(), 2);
        assert_eq!(b_after.battles_played(), 1);
        assert_eq!(c_after.battles_played(), 1);
        let wins = a_after.battles_won + b_after.battles_won + c_after.battles_won;
        let losses = a_after.battles_lost + b_after.battles_lost + c_after.battles_lost;
        assert_eq!((wins, losses), (2, 2));
        assert_eq!(ledger.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_many_concurrent_battles_lose_no_updates() {
        let (ledger, game) = setup().await;
        let (_, target) = mint(&ledger, &game, 1, 2).await;

        let mut challengers = Vec::new();
        for i in 0..8u64 {
            challengers.push(mint(&ledger, &game, 10 + i * 2, 11 + i * 2).await);
        }

        let receipts = join_all(
            challengers
                .iter()
                .map(|(owner, player)| ledger.submit(battle_tx(owner, 1, player, &target))),
        )
        .await;
        assert!(receipts
            .into_iter()
            .all(|receipt| receipt.unwrap().is_committed()));

        let target_after = ledger.player(&target).await.unwrap().unwrap();
        assert_eq!(target_after.battles_played(), 8);
        let mut challenger_wins = 0;
        for (_, player) in &challengers {
            let record = ledger.player(player).await.unwrap().unwrap();
            assert_eq!(record.battles_played(), 1);
            challenger_wins += record.battles_won;
        }
        assert_eq!(challenger_wins + target_after.battles_won, 8);
    }

    #[tokio::test]
    async fn test_same_payer_nonce_is_serialized() {
        let (ledger, game) = setup().await;
        let (alice, a) = mint(&ledger, &game, 1, 2).await;
        let (_, b) = mint(&ledger, &game, 3, 4).await;

        // Two transactions with the same nonce: exactly one commits.
        let receipts = join_all([
            ledger.submit(battle_tx(&alice, 1, &a, &b)),
            ledger.submit(battle_tx(&alice, 1, &a, &b)),
        ])
        .await;
        let committed = receipts
            .iter()
            .filter(|receipt| receipt.as_ref().unwrap().is_committed())
            .count();
        assert_eq!(committed, 1);
        assert!(receipts.iter().any(|receipt| matches!(
            receipt.as_ref().unwrap(),
            Receipt::Rejected(ProgramError::NonceMismatch { expected: 2, got: 1 })
        )));
        assert_eq!(ledger.player(&a).await.unwrap().unwrap().battles_played(), 1);
    }

    #[tokio::test]
    async fn test_check_in_uses_environment_clock() {
        let (ledger, game) = setup().await;
        let (alice, a) = mint(&ledger, &game, 1, 2).await;
        let check_in = |nonce| {
            Transaction::new(
                nonce,
                &Instruction::DailyCheckIn,
                vec![a.clone(), alice.public_key()],
            )
            .sign(&alice)
        };

        assert!(ledger.submit(check_in(1)).await.unwrap().is_committed());
        assert_eq!(
            ledger.player(&a).await.unwrap().unwrap().daily_check_in,
            START
        );

        ledger.environment().advance(CHECK_IN_COOLDOWN_SECS - 1);
        let receipt = ledger.submit(check_in(2)).await.unwrap();
        assert_eq!(
            receipt,
            Receipt::Rejected(ProgramError::CheckInTooEarly { remaining_secs: 1 })
        );
        assert_eq!(ledger.nonce(&alice.public_key()).await.unwrap(), 2);

        ledger.environment().advance(1);
        assert!(ledger.submit(check_in(2)).await.unwrap().is_committed());
        assert_eq!(
            ledger.player(&a).await.unwrap().unwrap().daily_check_in,
            START + CHECK_IN_COOLDOWN_SECS
        );
    }

    #[tokio::test]
    async fn test_check_in_at_epoch_fails_without_writing() {
        let (ledger, game) = setup().await;
        let (alice, a) = mint(&ledger, &game, 1, 2).await;
        let check_in = |nonce| {
            Transaction::new(
                nonce,
                &Instruction::DailyCheckIn,
                vec![a.clone(), alice.public_key()],
            )
            .sign(&alice)
        };

        ledger.environment().advance(-START);
        assert_eq!(ledger.environment().now(), 0);
        for _ in 0..3 {
            assert!(ledger.submit(check_in(1)).await.is_err());
        }
        let record = ledger.player(&a).await.unwrap().unwrap();
        assert_eq!((record.daily_check_in, record.xp), (0, 0));
        assert_eq!(ledger.nonce(&alice.public_key()).await.unwrap(), 1);
        assert_eq!(ledger.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_submit_releases_lock_entries() {
        let (ledger, game) = setup().await;
        let (alice, a) = mint(&ledger, &game, 1, 2).await;
        let tx = Transaction::new(
            1,
            &Instruction::DailyCheckIn,
            vec![a.clone(), alice.public_key()],
        )
        .sign(&alice);

        // Nonce keys sort after account keys, so the submit holds its account locks while
        // it waits here.
        let held = ledger
            .locks
            .acquire(BTreeSet::from([Key::Nonce(alice.public_key())]))
            .await;
        let blocked =
            tokio::time::timeout(std::time::Duration::from_millis(50), ledger.submit(tx)).await;
        assert!(blocked.is_err());
        drop(held);

        assert_eq!(ledger.locks.len(), 0);
        assert_eq!(ledger.nonce(&alice.public_key()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queries() {
        let (ledger, game) = setup().await;
        let (_, authority) = create_account_keypair(101);
        assert_eq!(
            ledger.game_state(&game).await.unwrap(),
            Some(GameState::new(authority))
        );
        assert!(ledger.player(&game).await.unwrap().is_none());
        let (_, a) = mint(&ledger, &game, 1, 2).await;
        assert!(ledger.game_state(&a).await.unwrap().is_none());
        assert!(ledger.account(&a).await.unwrap().is_some());

        let memory = ledger.into_inner();
        assert_eq!(memory.0.len(), 4);
    }
}
