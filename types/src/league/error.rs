use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use thiserror::Error as ThisError;

use super::{ERROR_CODE_OFFSET, MAX_NAME_LENGTH};

/// Account role whose signature an instruction requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignerRole {
    Payer = 0,
    GameState = 1,
    Authority = 2,
    Player = 3,
    User = 4,
}

impl std::fmt::Display for SignerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Payer => "payer",
            Self::GameState => "game_state",
            Self::Authority => "authority",
            Self::Player => "player",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

impl Write for SignerRole {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for SignerRole {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Payer),
            1 => Ok(Self::GameState),
            2 => Ok(Self::Authority),
            3 => Ok(Self::Player),
            4 => Ok(Self::User),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for SignerRole {
    const SIZE: usize = u8::SIZE;
}

/// Coarse grouping of [ProgramError]s, used by callers to decide whether a retry makes sense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inputs or account state do not match the instruction; fix the input and resubmit.
    Precondition,
    /// Required signatures are absent, invalid or from the wrong identity.
    Authorization,
    /// A game rule (currently only the check-in cooldown) refused the instruction.
    BusinessRule,
}

/// Reason an instruction was rejected. Rejections never mutate the store.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProgramError {
    #[error("You can only check in once every 24 hours")]
    CheckInTooEarly { remaining_secs: i64 },
    #[error("account already initialized")]
    AccountAlreadyInitialized,
    #[error("game state not found")]
    GameStateNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("opponent not found")]
    OpponentNotFound,
    #[error("a player cannot battle itself")]
    SelfBattleNotAllowed,
    #[error("player name must be 1-{} bytes of printable text", MAX_NAME_LENGTH)]
    InvalidName,
    #[error("unknown instruction (opcode={0})")]
    UnknownInstruction(u8),
    #[error("malformed instruction data")]
    InvalidInstructionData,
    #[error("wrong number of accounts (expected={expected}, got={got})")]
    InvalidAccounts { expected: u32, got: u32 },
    #[error("account list does not match instruction arguments")]
    AccountMismatch,
    #[error("nonce mismatch (expected={expected}, got={got})")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("missing signature from {role}")]
    MissingSignature { role: SignerRole },
    #[error("invalid transaction signature")]
    InvalidSignature,
    #[error("signer does not own the account")]
    Unauthorized,
}

impl ProgramError {
    /// Stable numeric code; `CheckInTooEarly` keeps the first custom slot.
    pub fn code(&self) -> u32 {
        ERROR_CODE_OFFSET
            + match self {
                Self::CheckInTooEarly { .. } => 0,
                Self::AccountAlreadyInitialized => 1,
                Self::GameStateNotFound => 2,
                Self::PlayerNotFound => 3,
                Self::OpponentNotFound => 4,
                Self::SelfBattleNotAllowed => 5,
                Self::InvalidName => 6,
                Self::UnknownInstruction(_) => 7,
                Self::InvalidInstructionData => 8,
                Self::InvalidAccounts { .. } => 9,
                Self::AccountMismatch => 10,
                Self::NonceMismatch { .. } => 11,
                Self::MissingSignature { .. } => 12,
                Self::InvalidSignature => 13,
                Self::Unauthorized => 14,
            }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CheckInTooEarly { .. } => ErrorKind::BusinessRule,
            Self::MissingSignature { .. } | Self::InvalidSignature | Self::Unauthorized => {
                ErrorKind::Authorization
            }
            _ => ErrorKind::Precondition,
        }
    }
}

impl Write for ProgramError {
    fn write(&self, writer: &mut impl BufMut) {
        self.code().write(writer);
        match self {
            Self::CheckInTooEarly { remaining_secs } => remaining_secs.write(writer),
            Self::UnknownInstruction(opcode) => opcode.write(writer),
            Self::InvalidAccounts { expected, got } => {
                expected.write(writer);
                got.write(writer);
            }
            Self::NonceMismatch { expected, got } => {
                expected.write(writer);
                got.write(writer);
            }
            Self::MissingSignature { role } => role.write(writer),
            _ => {}
        }
    }
}

impl Read for ProgramError {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let code = u32::read(reader)?;
        let error = match code.checked_sub(ERROR_CODE_OFFSET) {
            Some(0) => Self::CheckInTooEarly {
                remaining_secs: i64::read(reader)?,
            },
            Some(1) => Self::AccountAlreadyInitialized,
            Some(2) => Self::GameStateNotFound,
            Some(3) => Self::PlayerNotFound,
            Some(4) => Self::OpponentNotFound,
            Some(5) => Self::SelfBattleNotAllowed,
            Some(6) => Self::InvalidName,
            Some(7) => Self::UnknownInstruction(u8::read(reader)?),
            Some(8) => Self::InvalidInstructionData,
            Some(9) => Self::InvalidAccounts {
                expected: u32::read(reader)?,
                got: u32::read(reader)?,
            },
            Some(10) => Self::AccountMismatch,
            Some(11) => Self::NonceMismatch {
                expected: u64::read(reader)?,
                got: u64::read(reader)?,
            },
            Some(12) => Self::MissingSignature {
                role: SignerRole::read(reader)?,
            },
            Some(13) => Self::InvalidSignature,
            Some(14) => Self::Unauthorized,
            _ => return Err(Error::Invalid("ProgramError", "unknown error code")),
        };
        Ok(error)
    }
}

impl EncodeSize for ProgramError {
    fn encode_size(&self) -> usize {
        u32::SIZE
            + match self {
                Self::CheckInTooEarly { .. } => i64::SIZE,
                Self::UnknownInstruction(_) => u8::SIZE,
                Self::InvalidAccounts { .. } => u32::SIZE * 2,
                Self::NonceMismatch { .. } => u64::SIZE * 2,
                Self::MissingSignature { .. } => SignerRole::SIZE,
                _ => 0,
            }
    }
}
