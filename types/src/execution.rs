use bytes::{Buf, BufMut};
use commonware_codec::{Encode, EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    sha256::{Digest, Sha256},
    Digestible, Hasher, Signer, Verifier,
};
use commonware_utils::union;

use crate::league::{
    read_string, string_encode_size, write_string, GameState, Player, ProgramError,
};

pub const NAMESPACE: &[u8] = b"_ESPORTS_LEAGUE";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

/// Upper bound on accounts a single transaction may reference.
pub const MAX_TRANSACTION_ACCOUNTS: usize = 8;
/// Upper bound on signatures attached to a single transaction.
pub const MAX_TRANSACTION_SIGNATURES: usize = 4;
/// Upper bound on encoded instruction arguments.
pub const MAX_INSTRUCTION_DATA_LENGTH: usize = 256;
/// Upper bound on transactions executed as one batch.
pub const MAX_BATCH_TRANSACTIONS: usize = 500;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

/// A decoded league instruction.
///
/// On the wire an instruction is its opcode followed by its arguments. Transactions carry the
/// opcode and the argument bytes separately so that an unknown opcode can be reported as such
/// instead of as a decoding failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Create the game root account.
    /// Accounts: [game_state (signer), authority (signer)]
    /// Binary: [0]
    Initialize,

    /// Mint a player under an initialized game.
    /// Accounts: [game_state, player (signer), user (signer)]
    /// Binary: [1] [nameLen:u32 BE] [nameBytes...]
    MintPlayer { player_name: String },

    /// Resolve a battle between two players.
    /// Accounts: [player, opponent, authority (signer)]
    /// Binary: [2] [opponent:32]
    Battle { opponent: PublicKey },

    /// Claim the daily check-in reward.
    /// Accounts: [player, authority (signer)]
    /// Binary: [3]
    DailyCheckIn,
}

impl Instruction {
    pub const INITIALIZE: u8 = 0;
    pub const MINT_PLAYER: u8 = 1;
    pub const BATTLE: u8 = 2;
    pub const DAILY_CHECK_IN: u8 = 3;

    pub fn opcode(&self) -> u8 {
        match self {
            Self::Initialize => Self::INITIALIZE,
            Self::MintPlayer { .. } => Self::MINT_PLAYER,
            Self::Battle { .. } => Self::BATTLE,
            Self::DailyCheckIn => Self::DAILY_CHECK_IN,
        }
    }

    /// Number of accounts the instruction expects, in declaration order.
    pub fn account_count(&self) -> usize {
        match self {
            Self::Initialize | Self::DailyCheckIn => 2,
            Self::MintPlayer { .. } | Self::Battle { .. } => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::MintPlayer { .. } => "mintPlayer",
            Self::Battle { .. } => "battle",
            Self::DailyCheckIn => "dailyCheckIn",
        }
    }

    fn write_args(&self, writer: &mut impl BufMut) {
        match self {
            Self::Initialize | Self::DailyCheckIn => {}
            Self::MintPlayer { player_name } => write_string(player_name, writer),
            Self::Battle { opponent } => opponent.write(writer),
        }
    }

    fn args_encode_size(&self) -> usize {
        match self {
            Self::Initialize | Self::DailyCheckIn => 0,
            Self::MintPlayer { player_name } => string_encode_size(player_name),
            Self::Battle { .. } => PublicKey::SIZE,
        }
    }

    /// Encodes the instruction arguments (without the opcode).
    pub fn encode_args(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.args_encode_size());
        self.write_args(&mut data);
        data
    }

    fn read_args(opcode: u8, reader: &mut impl Buf) -> Result<Option<Self>, Error> {
        let instruction = match opcode {
            Self::INITIALIZE => Self::Initialize,
            // Names are bounded by the argument buffer here; the name rules are enforced
            // during validation so an overlong name surfaces as `InvalidName`.
            Self::MINT_PLAYER => Self::MintPlayer {
                player_name: read_string(reader, MAX_INSTRUCTION_DATA_LENGTH)?,
            },
            Self::BATTLE => Self::Battle {
                opponent: PublicKey::read(reader)?,
            },
            Self::DAILY_CHECK_IN => Self::DailyCheckIn,
            _ => return Ok(None),
        };
        Ok(Some(instruction))
    }

    /// Decodes an opcode and its argument bytes. Trailing bytes are rejected.
    pub fn decode(opcode: u8, data: &[u8]) -> Result<Self, ProgramError> {
        let mut reader = data;
        let instruction = Self::read_args(opcode, &mut reader)
            .map_err(|_| ProgramError::InvalidInstructionData)?
            .ok_or(ProgramError::UnknownInstruction(opcode))?;
        if reader.has_remaining() {
            return Err(ProgramError::InvalidInstructionData);
        }
        Ok(instruction)
    }
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        self.opcode().write(writer);
        self.write_args(writer);
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let opcode = u8::read(reader)?;
        Self::read_args(opcode, reader)?.ok_or(Error::InvalidEnum(opcode))
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE + self.args_encode_size()
    }
}

/// A signer attached to a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionSignature {
    pub public: PublicKey,
    pub signature: ed25519::Signature,
}

impl Write for TransactionSignature {
    fn write(&self, writer: &mut impl BufMut) {
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for TransactionSignature {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            public: PublicKey::read(reader)?,
            signature: ed25519::Signature::read(reader)?,
        })
    }
}

impl FixedSize for TransactionSignature {
    const SIZE: usize = PublicKey::SIZE + ed25519::Signature::SIZE;
}

/// A signed request to run one instruction.
///
/// Every signature covers the same payload (nonce, opcode, accounts and argument bytes). The
/// first signer pays: its nonce is checked and advanced when the transaction commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub opcode: u8,
    pub accounts: Vec<PublicKey>,
    pub data: Vec<u8>,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    fn payload(nonce: u64, opcode: u8, accounts: &[PublicKey], data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        opcode.write(&mut payload);
        accounts.to_vec().write(&mut payload);
        data.to_vec().write(&mut payload);

        payload
    }

    /// Builds an unsigned transaction from raw parts.
    pub fn from_parts(nonce: u64, opcode: u8, accounts: Vec<PublicKey>, data: Vec<u8>) -> Self {
        Self {
            nonce,
            opcode,
            accounts,
            data,
            signatures: Vec::new(),
        }
    }

    /// Builds an unsigned transaction for `instruction`.
    pub fn new(nonce: u64, instruction: &Instruction, accounts: Vec<PublicKey>) -> Self {
        Self::from_parts(nonce, instruction.opcode(), accounts, instruction.encode_args())
    }

    /// Appends a signature from `private`. The first signer becomes the payer.
    pub fn sign(mut self, private: &ed25519::PrivateKey) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(self.nonce, self.opcode, &self.accounts, &self.data),
        );
        self.signatures.push(TransactionSignature {
            public: private.public_key(),
            signature,
        });
        self
    }

    pub fn payer(&self) -> Option<&PublicKey> {
        self.signatures.first().map(|signature| &signature.public)
    }

    pub fn signers(&self) -> impl Iterator<Item = &PublicKey> {
        self.signatures.iter().map(|signature| &signature.public)
    }

    /// Returns true if every attached signature verifies over the payload.
    pub fn verify(&self) -> bool {
        let namespace = transaction_namespace(NAMESPACE);
        let payload = Self::payload(self.nonce, self.opcode, &self.accounts, &self.data);
        self.signatures.iter().all(|signature| {
            signature
                .public
                .verify(&namespace, &payload, &signature.signature)
        })
    }

    pub fn instruction(&self) -> Result<Instruction, ProgramError> {
        Instruction::decode(self.opcode, &self.data)
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.opcode.write(writer);
        self.accounts.write(writer);
        self.data.write(writer);
        self.signatures.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let opcode = u8::read(reader)?;
        let accounts = Vec::<PublicKey>::read_range(reader, 0..=MAX_TRANSACTION_ACCOUNTS)?;
        let data = Vec::<u8>::read_range(reader, 0..=MAX_INSTRUCTION_DATA_LENGTH)?;
        let signatures =
            Vec::<TransactionSignature>::read_range(reader, 1..=MAX_TRANSACTION_SIGNATURES)?;

        Ok(Self {
            nonce,
            opcode,
            accounts,
            data,
            signatures,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.opcode.encode_size()
            + self.accounts.encode_size()
            + self.data.encode_size()
            + self.signatures.encode_size()
    }
}

impl Digestible for Transaction {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(&Self::payload(
            self.nonce,
            self.opcode,
            &self.accounts,
            &self.data,
        ));
        // Signers are part of the identity of a transaction, their signatures are not (any
        // valid signature is as good as another).
        for public in self.signers() {
            hasher.update(public.as_ref());
        }
        hasher.finalize()
    }
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Account record stored at an address (tag 0)
    Account(PublicKey),
    /// Replay counter of a transaction payer (tag 1)
    Nonce(PublicKey),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(address) => {
                0u8.write(writer);
                address.write(writer);
            }
            Self::Nonce(address) => {
                1u8.write(writer);
                address.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Nonce(PublicKey::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl FixedSize for Key {
    const SIZE: usize = u8::SIZE + PublicKey::SIZE;
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    GameState(GameState),
    Player(Player),
    Nonce(u64),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::GameState(game) => {
                0u8.write(writer);
                game.write(writer);
            }
            Self::Player(player) => {
                1u8.write(writer);
                player.write(writer);
            }
            Self::Nonce(nonce) => {
                2u8.write(writer);
                nonce.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::GameState(GameState::read(reader)?),
            1 => Self::Player(Player::read(reader)?),
            2 => Self::Nonce(u64::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::GameState(game) => game.encode_size(),
                Self::Player(player) => player.encode_size(),
                Self::Nonce(nonce) => nonce.encode_size(),
            }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    GameInitialized {
        game: PublicKey,
        authority: PublicKey,
    },
    PlayerMinted {
        player: PublicKey,
        owner: PublicKey,
        game: PublicKey,
        name: String,
    },
    BattleResolved {
        player: PublicKey,
        opponent: PublicKey,
        winner: PublicKey,
        player_strength: u64,
        opponent_strength: u64,
        roll: u64,
    },
    CheckedIn {
        player: PublicKey,
        timestamp: i64,
        xp: u64,
        power: u64,
    },
    /// Emitted during batch execution for transactions that did not commit.
    InstructionRejected {
        payer: PublicKey,
        nonce: u64,
        error: ProgramError,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::GameInitialized { game, authority } => {
                0u8.write(writer);
                game.write(writer);
                authority.write(writer);
            }
            Self::PlayerMinted {
                player,
                owner,
                game,
                name,
            } => {
                1u8.write(writer);
                player.write(writer);
                owner.write(writer);
                game.write(writer);
                write_string(name, writer);
            }
            Self::BattleResolved {
                player,
                opponent,
                winner,
                player_strength,
                opponent_strength,
                roll,
            } => {
                2u8.write(writer);
                player.write(writer);
                opponent.write(writer);
                winner.write(writer);
                player_strength.write(writer);
                opponent_strength.write(writer);
                roll.write(writer);
            }
            Self::CheckedIn {
                player,
                timestamp,
                xp,
                power,
            } => {
                3u8.write(writer);
                player.write(writer);
                timestamp.write(writer);
                xp.write(writer);
                power.write(writer);
            }
            Self::InstructionRejected {
                payer,
                nonce,
                error,
            } => {
                4u8.write(writer);
                payer.write(writer);
                nonce.write(writer);
                error.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::GameInitialized {
                game: PublicKey::read(reader)?,
                authority: PublicKey::read(reader)?,
            },
            1 => Self::PlayerMinted {
                player: PublicKey::read(reader)?,
                owner: PublicKey::read(reader)?,
                game: PublicKey::read(reader)?,
                name: read_string(reader, crate::league::MAX_NAME_LENGTH)?,
            },
            2 => Self::BattleResolved {
                player: PublicKey::read(reader)?,
                opponent: PublicKey::read(reader)?,
                winner: PublicKey::read(reader)?,
                player_strength: u64::read(reader)?,
                opponent_strength: u64::read(reader)?,
                roll: u64::read(reader)?,
            },
            3 => Self::CheckedIn {
                player: PublicKey::read(reader)?,
                timestamp: i64::read(reader)?,
                xp: u64::read(reader)?,
                power: u64::read(reader)?,
            },
            4 => Self::InstructionRejected {
                payer: PublicKey::read(reader)?,
                nonce: u64::read(reader)?,
                error: ProgramError::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::GameInitialized { .. } => PublicKey::SIZE * 2,
                Self::PlayerMinted { name, .. } => PublicKey::SIZE * 3 + string_encode_size(name),
                Self::BattleResolved { .. } => PublicKey::SIZE * 3 + u64::SIZE * 3,
                Self::CheckedIn { .. } => PublicKey::SIZE + i64::SIZE + u64::SIZE * 2,
                Self::InstructionRejected { error, .. } => {
                    PublicKey::SIZE + u64::SIZE + error.encode_size()
                }
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
        }
    }
}

/// Outcome of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    /// The instruction committed. Carries the post-commit snapshot of every account it wrote.
    Committed {
        accounts: Vec<(PublicKey, Value)>,
        events: Vec<Event>,
    },
    /// The instruction was refused and nothing changed.
    Rejected(ProgramError),
}

impl Receipt {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn error(&self) -> Option<&ProgramError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Committed { .. } => None,
        }
    }

    pub fn account(&self, address: &PublicKey) -> Option<&Value> {
        match self {
            Self::Committed { accounts, .. } => accounts
                .iter()
                .find(|(key, _)| key == address)
                .map(|(_, value)| value),
            Self::Rejected(_) => None,
        }
    }

    pub fn player(&self, address: &PublicKey) -> Option<&Player> {
        match self.account(address)? {
            Value::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn events(&self) -> &[Event] {
        match self {
            Self::Committed { events, .. } => events,
            Self::Rejected(_) => &[],
        }
    }
}

impl Write for Receipt {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Committed { accounts, events } => {
                0u8.write(writer);
                accounts.write(writer);
                events.write(writer);
            }
            Self::Rejected(error) => {
                1u8.write(writer);
                error.write(writer);
            }
        }
    }
}

impl Read for Receipt {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Committed {
                accounts: Vec::<(PublicKey, Value)>::read_range(
                    reader,
                    0..=MAX_TRANSACTION_ACCOUNTS,
                )?,
                events: Vec::<Event>::read_range(reader, 0..=MAX_TRANSACTION_ACCOUNTS)?,
            }),
            1 => Ok(Self::Rejected(ProgramError::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Receipt {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Committed { accounts, events } => {
                    accounts.encode_size() + events.encode_size()
                }
                Self::Rejected(error) => error.encode_size(),
            }
    }
}

/// Hash of an encoded receipt, used to compare execution results across runs.
pub fn receipt_digest(receipt: &Receipt) -> Digest {
    Sha256::hash(&receipt.encode())
}
