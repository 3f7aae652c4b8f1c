use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

use super::{
    read_string, string_encode_size, write_string, BATTLE_XP_REWARD, CHECK_IN_COOLDOWN_SECS,
    CHECK_IN_POWER_REWARD, CHECK_IN_XP_REWARD, INITIAL_POWER, INITIAL_XP, MAX_NAME_LENGTH,
    XP_PER_STRENGTH,
};

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PlayerInvariantError {
    #[error("player name is empty")]
    EmptyName,
    #[error("player name too long (len={len}, max={max})")]
    NameTooLong { len: usize, max: usize },
    #[error("player name contains control characters")]
    NameNotPrintable,
}

/// Checks a display name against the minting rules.
///
/// Names must carry at least one visible character, fit in [MAX_NAME_LENGTH] bytes and contain
/// no control characters.
pub fn validate_name(name: &str) -> Result<(), PlayerInvariantError> {
    if name.trim().is_empty() {
        return Err(PlayerInvariantError::EmptyName);
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(PlayerInvariantError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_LENGTH,
        });
    }
    if name.chars().any(char::is_control) {
        return Err(PlayerInvariantError::NameNotPrintable);
    }
    Ok(())
}

/// Where a player sits in the daily check-in cycle. Derived from the stored timestamp and the
/// current time, never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckInStatus {
    NeverCheckedIn,
    CooledDown,
    Cooling { remaining_secs: i64 },
}

impl CheckInStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Cooling { .. })
    }
}

/// A minted player account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Signer that minted the player; the only identity allowed to act on its behalf.
    pub owner: PublicKey,
    /// Game instance the player was minted under.
    pub game: PublicKey,
    pub name: String,
    pub battles_won: u64,
    pub battles_lost: u64,
    /// Unix seconds of the last successful check-in (0 if never).
    pub daily_check_in: i64,
    pub xp: u64,
    pub power: u64,
}

impl Player {
    pub fn new(owner: PublicKey, game: PublicKey, name: String) -> Self {
        Self {
            owner,
            game,
            name,
            battles_won: 0,
            battles_lost: 0,
            daily_check_in: 0,
            xp: INITIAL_XP,
            power: INITIAL_POWER,
        }
    }

    pub fn validate_invariants(&self) -> Result<(), PlayerInvariantError> {
        validate_name(&self.name)
    }

    pub fn battles_played(&self) -> u64 {
        self.battles_won.saturating_add(self.battles_lost)
    }

    /// Weight used when resolving battles. Never zero, so every matchup has a defined odds.
    pub fn strength(&self) -> u64 {
        self.power
            .saturating_add(self.xp / XP_PER_STRENGTH)
            .max(1)
    }

    pub fn check_in_status(&self, now: i64) -> CheckInStatus {
        if self.daily_check_in == 0 {
            return CheckInStatus::NeverCheckedIn;
        }
        let elapsed = now.saturating_sub(self.daily_check_in);
        if elapsed >= CHECK_IN_COOLDOWN_SECS {
            CheckInStatus::CooledDown
        } else {
            CheckInStatus::Cooling {
                remaining_secs: CHECK_IN_COOLDOWN_SECS.saturating_sub(elapsed),
            }
        }
    }

    pub fn record_win(&mut self) {
        self.battles_won = self.battles_won.saturating_add(1);
        self.xp = self.xp.saturating_add(BATTLE_XP_REWARD);
    }

    pub fn record_loss(&mut self) {
        self.battles_lost = self.battles_lost.saturating_add(1);
    }

    pub fn record_check_in(&mut self, now: i64) {
        self.daily_check_in = now;
        self.xp = self.xp.saturating_add(CHECK_IN_XP_REWARD);
        self.power = self.power.saturating_add(CHECK_IN_POWER_REWARD);
    }
}

impl Write for Player {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.game.write(writer);
        write_string(&self.name, writer);
        self.battles_won.write(writer);
        self.battles_lost.write(writer);
        self.daily_check_in.write(writer);
        self.xp.write(writer);
        self.power.write(writer);
    }
}

impl Read for Player {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let player = Self {
            owner: PublicKey::read(reader)?,
            game: PublicKey::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            battles_won: u64::read(reader)?,
            battles_lost: u64::read(reader)?,
            daily_check_in: i64::read(reader)?,
            xp: u64::read(reader)?,
            power: u64::read(reader)?,
        };
        player
            .validate_invariants()
            .map_err(|_| Error::Invalid("Player", "invalid name"))?;
        Ok(player)
    }
}

impl EncodeSize for Player {
    fn encode_size(&self) -> usize {
        self.owner.encode_size()
            + self.game.encode_size()
            + string_encode_size(&self.name)
            + self.battles_won.encode_size()
            + self.battles_lost.encode_size()
            + self.daily_check_in.encode_size()
            + self.xp.encode_size()
            + self.power.encode_size()
    }
}
