/// Maximum name length (in bytes) for minted players
pub const MAX_NAME_LENGTH: usize = 32;

/// Power granted to a freshly minted player
pub const INITIAL_POWER: u64 = 10;

/// Experience granted to a freshly minted player
pub const INITIAL_XP: u64 = 0;

/// Experience awarded to the winner of a battle
pub const BATTLE_XP_REWARD: u64 = 10;

/// Minimum spacing between two check-ins of the same player
pub const CHECK_IN_COOLDOWN_SECS: i64 = 24 * 60 * 60;

/// Experience awarded by a successful check-in
pub const CHECK_IN_XP_REWARD: u64 = 25;

/// Power awarded by a successful check-in
pub const CHECK_IN_POWER_REWARD: u64 = 1;

/// Experience that converts into one point of battle strength.
pub const XP_PER_STRENGTH: u64 = 100;

/// First custom error code (codes below are reserved for the runtime).
pub const ERROR_CODE_OFFSET: u32 = 6_000;
