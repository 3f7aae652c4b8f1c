use commonware_cryptography::{
    ed25519::PublicKey,
    sha256::{Digest, Sha256},
    Hasher,
};
use league_types::league::Player;

const BATTLE_DOMAIN: &[u8] = b"battle";

/// Result of resolving one battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub player_wins: bool,
    /// Draw in `[0, player_strength + opponent_strength)`; the player wins below its strength.
    pub roll: u64,
    pub player_strength: u64,
    pub opponent_strength: u64,
}

/// Resolves a battle from both players' strengths and execution entropy.
///
/// The draw hashes the slot seed, the transaction digest, both addresses and both players'
/// battle counts, so neither participant controls it and repeated battles between the same
/// pair draw fresh values. The player wins with probability `s_p / (s_p + s_o)`.
pub fn resolve(
    seed: &Digest,
    transaction: &Digest,
    player_address: &PublicKey,
    player: &Player,
    opponent_address: &PublicKey,
    opponent: &Player,
) -> Outcome {
    let mut hasher = Sha256::new();
    hasher.update(BATTLE_DOMAIN);
    hasher.update(seed.as_ref());
    hasher.update(transaction.as_ref());
    hasher.update(player_address.as_ref());
    hasher.update(opponent_address.as_ref());
    hasher.update(&player.battles_played().to_be_bytes());
    hasher.update(&opponent.battles_played().to_be_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_ref()[..8]);
    let draw = u64::from_be_bytes(prefix);

    let player_strength = player.strength();
    let opponent_strength = opponent.strength();
    // Strengths are at least 1 each, so the modulus is never zero; u128 keeps the sum exact.
    let total = u128::from(player_strength) + u128::from(opponent_strength);
    let roll = u128::from(draw) % total;

    Outcome {
        player_wins: roll < u128::from(player_strength),
        roll: roll as u64,
        player_strength,
        opponent_strength,
    }
}

/// Chance (0.0..=1.0) that `player` beats `opponent`.
pub fn win_probability(player: &Player, opponent: &Player) -> f64 {
    let player_strength = player.strength() as f64;
    player_strength / (player_strength + opponent.strength() as f64)
}
