use anyhow::{Context as _, Result};
use commonware_codec::{DecodeExt, Encode};
use league_types::execution::{Key, Value};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    sync::{Mutex, PoisonError},
};

use crate::state::{State, Status};

/// SQLite-backed [State]. Keys and values are stored as their codec encodings.
pub struct Sqlite {
    conn: Mutex<Connection>,
}

impl Sqlite {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("open league database")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory league database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        init_schema_sqlite(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn init_schema_sqlite(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS accounts (
             key BLOB PRIMARY KEY,
             value BLOB NOT NULL
         );",
    )
    .context("init league schema")?;
    Ok(())
}

fn decode_value(bytes: Vec<u8>) -> Result<Value> {
    Value::decode(bytes.as_slice()).context("decode stored value")
}

impl State for Sqlite {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let bytes = self
            .conn()
            .query_row(
                "SELECT value FROM accounts WHERE key = ?",
                params![key.encode().to_vec()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
            .context("read account")?;
        bytes.map(decode_value).transpose()
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO accounts (key, value) VALUES (?, ?)",
                params![key.encode().to_vec(), value.encode().to_vec()],
            )
            .context("write account")?;
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.conn()
            .execute(
                "DELETE FROM accounts WHERE key = ?",
                params![key.encode().to_vec()],
            )
            .context("delete account")?;
        Ok(())
    }

    /// Applies the whole change set in one SQLite transaction.
    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("begin apply")?;
        for (key, status) in changes {
            match status {
                Status::Update(value) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO accounts (key, value) VALUES (?, ?)",
                        params![key.encode().to_vec(), value.encode().to_vec()],
                    )
                    .context("write account")?;
                }
                Status::Delete => {
                    tx.execute(
                        "DELETE FROM accounts WHERE key = ?",
                        params![key.encode().to_vec()],
                    )
                    .context("delete account")?;
                }
            }
        }
        tx.commit().context("commit apply")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::create_account_keypair;
    use commonware_runtime::{deterministic::Runner, Runner as _};
    use league_types::league::{GameState, Player};

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("league.db");
            let (_, owner) = create_account_keypair(1);
            let (_, game) = create_account_keypair(2);
            let player = Player::new(owner.clone(), game.clone(), "Rookie".to_string());

            {
                let mut store = Sqlite::open(&path).unwrap();
                store
                    .apply(vec![
                        (
                            Key::Account(game.clone()),
                            Status::Update(Value::GameState(GameState::new(owner.clone()))),
                        ),
                        (
                            Key::Account(owner.clone()),
                            Status::Update(Value::Player(player.clone())),
                        ),
                        (Key::Nonce(owner.clone()), Status::Update(Value::Nonce(3))),
                    ])
                    .await
                    .unwrap();
            }

            let mut store = Sqlite::open(&path).unwrap();
            assert_eq!(
                store.get(&Key::Account(owner.clone())).await.unwrap(),
                Some(Value::Player(player))
            );
            assert_eq!(
                store.get(&Key::Nonce(owner.clone())).await.unwrap(),
                Some(Value::Nonce(3))
            );

            store.delete(&Key::Nonce(owner.clone())).await.unwrap();
            assert_eq!(store.get(&Key::Nonce(owner)).await.unwrap(), None);
        });
    }

    #[test]
    fn test_sqlite_rejects_corrupt_rows() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let store = Sqlite::open_in_memory().unwrap();
            let (_, owner) = create_account_keypair(1);
            let key = Key::Account(owner);
            store
                .conn()
                .execute(
                    "INSERT INTO accounts (key, value) VALUES (?, ?)",
                    params![key.encode().to_vec(), vec![9u8, 9, 9]],
                )
                .unwrap();
            assert!(store.get(&key).await.is_err());
        });
    }

    #[tokio::test]
    async fn test_ledger_over_sqlite_survives_restart() {
        use crate::{mocks::ManualEnvironment, Ledger};
        use commonware_cryptography::Signer;
        use league_types::execution::{Instruction, Transaction};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("league.db");
        let (game_key, game) = create_account_keypair(10);
        let (authority_key, authority) = create_account_keypair(11);
        let (player_key, player) = create_account_keypair(12);

        {
            let ledger = Ledger::new(
                Sqlite::open(&path).unwrap(),
                ManualEnvironment::new(1_700_000_000),
            );
            let init = Transaction::new(
                0,
                &Instruction::Initialize,
                vec![game.clone(), authority.clone()],
            )
            .sign(&authority_key)
            .sign(&game_key);
            assert!(ledger.submit(init).await.unwrap().is_committed());

            let mint = Transaction::new(
                1,
                &Instruction::MintPlayer {
                    player_name: "Persistent".to_string(),
                },
                vec![game.clone(), player.clone(), authority_key.public_key()],
            )
            .sign(&authority_key)
            .sign(&player_key);
            assert!(ledger.submit(mint).await.unwrap().is_committed());
        }

        let ledger = Ledger::new(
            Sqlite::open(&path).unwrap(),
            ManualEnvironment::new(1_700_000_000),
        );
        assert_eq!(ledger.nonce(&authority).await.unwrap(), 2);
        assert_eq!(
            ledger.game_state(&game).await.unwrap(),
            Some(GameState::new(authority.clone()))
        );
        let stored = ledger.player(&player).await.unwrap().unwrap();
        assert_eq!(stored.name, "Persistent");
        assert_eq!(stored.owner, authority);
    }
}
