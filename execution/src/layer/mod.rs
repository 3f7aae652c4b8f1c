use anyhow::{Context as _, Result};
use commonware_cryptography::{ed25519::PublicKey, sha256::Digest, Digestible};
use league_types::{
    execution::{
        Event, Instruction, Key, Output, Receipt, Transaction, Value, MAX_BATCH_TRANSACTIONS,
    },
    league::{ProgramError, SignerRole},
};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::context::Context;
use crate::state::{nonce, validate_and_increment_nonce, PrepareError, State, Status};
use crate::validate::{self, Signers};

mod handlers;

use handlers::Handled;

/// Executes transactions against a pending overlay of a [State].
///
/// Nothing reaches the underlying store until the caller applies [Layer::commit]. A transaction
/// that is rejected leaves the overlay exactly as it found it.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    context: Context,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, context: Context) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            context,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    async fn account(&self, address: &PublicKey) -> Result<Option<Value>> {
        self.get(&Key::Account(address.clone())).await
    }

    async fn prepare(&mut self, payer: &PublicKey, provided: u64) -> Result<(), PrepareError> {
        let mut current = nonce(&*self, payer).await.map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut current, provided)?;
        self.insert(Key::Nonce(payer.clone()), Value::Nonce(current));

        Ok(())
    }

    async fn apply(
        &mut self,
        transaction: &Transaction,
        instruction: &Instruction,
    ) -> Result<Handled> {
        let signers = Signers::from_transaction(transaction);
        let accounts = transaction.accounts.as_slice();

        match instruction {
            Instruction::Initialize => self.handle_initialize(&signers, accounts).await,
            Instruction::MintPlayer { player_name } => {
                self.handle_mint_player(&signers, accounts, player_name)
                    .await
            }
            Instruction::Battle { opponent } => {
                self.handle_battle(&signers, accounts, opponent, &transaction.digest())
                    .await
            }
            Instruction::DailyCheckIn => self.handle_daily_check_in(&signers, accounts).await,
        }
    }

    async fn try_process(
        &mut self,
        transaction: &Transaction,
    ) -> Result<Result<Receipt, ProgramError>> {
        let Some(payer) = transaction.payer().cloned() else {
            return Ok(Err(ProgramError::MissingSignature {
                role: SignerRole::Payer,
            }));
        };
        if !transaction.verify() {
            return Ok(Err(ProgramError::InvalidSignature));
        }
        let instruction = match transaction.instruction() {
            Ok(instruction) => instruction,
            Err(err) => return Ok(Err(err)),
        };
        if transaction.accounts.len() != instruction.account_count() {
            return Ok(Err(handlers::invalid_accounts(
                instruction.account_count(),
                transaction.accounts.len(),
            )));
        }

        match self.prepare(&payer, transaction.nonce).await {
            Ok(()) => {}
            Err(PrepareError::NonceMismatch { expected, got }) => {
                return Ok(Err(ProgramError::NonceMismatch { expected, got }));
            }
            Err(PrepareError::State(err)) => {
                return Err(err).context("state error during prepare");
            }
        }

        let (written, events) = match self.apply(transaction, &instruction).await? {
            Ok(effect) => effect,
            Err(err) => return Ok(Err(err)),
        };

        let mut accounts = Vec::with_capacity(written.len());
        for address in written {
            if let Some(value) = self.account(&address).await? {
                accounts.push((address, value));
            }
        }
        Ok(Ok(Receipt::Committed { accounts, events }))
    }

    /// Routes one transaction to its handler.
    ///
    /// Signatures, opcode, account count and payer nonce are checked before dispatch. The
    /// returned `Err` is reserved for store failures; every rule violation is a
    /// [Receipt::Rejected] and leaves the overlay untouched (the payer nonce included).
    pub async fn process(&mut self, transaction: &Transaction) -> Result<Receipt> {
        let checkpoint = self.pending.clone();
        match self.try_process(transaction).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(error)) => {
                self.pending = checkpoint;
                debug!(
                    payer = ?transaction.payer(),
                    nonce = transaction.nonce,
                    opcode = transaction.opcode,
                    code = error.code(),
                    %error,
                    "transaction rejected"
                );
                Ok(Receipt::Rejected(error))
            }
            Err(err) => {
                self.pending = checkpoint;
                Err(err)
            }
        }
    }

    /// Processes a batch in order against this overlay.
    ///
    /// Returns the emitted outputs and, for every payer with a committed transaction, the next
    /// nonce it must use. Transactions with a stale nonce are dropped without output. Batches
    /// over [MAX_BATCH_TRANSACTIONS] are refused before anything executes.
    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        anyhow::ensure!(
            transactions.len() <= MAX_BATCH_TRANSACTIONS,
            "batch too large: {} (max {MAX_BATCH_TRANSACTIONS})",
            transactions.len()
        );
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            match self.process(&tx).await? {
                Receipt::Committed { events, .. } => {
                    if let Some(payer) = tx.payer() {
                        processed_nonces.insert(payer.clone(), tx.nonce.saturating_add(1));
                    }
                    outputs.extend(events.into_iter().map(Output::Event));
                    outputs.push(Output::Transaction(tx));
                }
                Receipt::Rejected(ProgramError::NonceMismatch { .. }) => continue,
                Receipt::Rejected(error) => {
                    if let Some(payer) = tx.payer() {
                        outputs.push(Output::Event(Event::InstructionRejected {
                            payer: payer.clone(),
                            nonce: tx.nonce,
                            error,
                        }));
                    }
                }
            }
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}
