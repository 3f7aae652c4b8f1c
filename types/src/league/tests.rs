use super::*;
use commonware_codec::{DecodeExt, Encode, FixedSize, ReadExt};
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use proptest::prelude::*;

fn key(seed: u64) -> commonware_cryptography::ed25519::PublicKey {
    PrivateKey::from_seed(seed).public_key()
}

#[test]
fn test_game_state_roundtrip() {
    let game = GameState::new(key(1));
    let encoded = game.encode();
    assert_eq!(encoded.len(), GameState::SIZE);
    let decoded = GameState::read(&mut &encoded[..]).unwrap();
    assert_eq!(game, decoded);
}

#[test]
fn test_player_roundtrip() {
    let mut player = Player::new(key(1), key(2), "Player 417".to_string());
    player.record_win();
    player.record_check_in(1_700_000_000);
    player.validate_invariants().expect("valid invariants");

    let encoded = player.encode();
    let decoded = Player::decode(encoded).unwrap();
    assert_eq!(player, decoded);
}

#[test]
fn test_player_read_rejects_oversized_name() {
    let player = Player::new(key(1), key(2), "x".repeat(MAX_NAME_LENGTH + 1));
    let encoded = player.encode();
    assert!(Player::decode(encoded).is_err());
}

#[test]
fn test_player_read_rejects_invalid_names() {
    for name in ["", "   ", "tab\tname", "line\nbreak"] {
        let encoded = Player::new(key(1), key(2), name.to_string()).encode();
        assert!(matches!(
            Player::decode(encoded),
            Err(commonware_codec::Error::Invalid("Player", "invalid name"))
        ));
    }
}

#[test]
fn test_new_player_defaults() {
    let player = Player::new(key(1), key(2), "Rookie".to_string());
    assert_eq!(player.battles_won, 0);
    assert_eq!(player.battles_lost, 0);
    assert_eq!(player.daily_check_in, 0);
    assert_eq!(player.xp, INITIAL_XP);
    assert_eq!(player.power, INITIAL_POWER);
    assert_eq!(player.battles_played(), 0);
}

#[test]
fn test_validate_name() {
    assert_eq!(validate_name("Player 001"), Ok(()));
    assert_eq!(validate_name(&"a".repeat(MAX_NAME_LENGTH)), Ok(()));
    assert_eq!(validate_name(""), Err(PlayerInvariantError::EmptyName));
    assert_eq!(validate_name("   "), Err(PlayerInvariantError::EmptyName));
    assert_eq!(
        validate_name("tab\tname"),
        Err(PlayerInvariantError::NameNotPrintable)
    );
    assert!(matches!(
        validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)),
        Err(PlayerInvariantError::NameTooLong { len: 33, max: 32 })
    ));
    // Length is counted in bytes, not characters.
    assert!(matches!(
        validate_name(&"é".repeat(17)),
        Err(PlayerInvariantError::NameTooLong { .. })
    ));
}

#[test]
fn test_check_in_status() {
    let mut player = Player::new(key(1), key(2), "Rookie".to_string());
    assert_eq!(player.check_in_status(1_000), CheckInStatus::NeverCheckedIn);
    assert!(player.check_in_status(1_000).is_available());

    player.record_check_in(1_000_000);
    assert_eq!(player.daily_check_in, 1_000_000);
    assert_eq!(player.xp, INITIAL_XP + CHECK_IN_XP_REWARD);
    assert_eq!(player.power, INITIAL_POWER + CHECK_IN_POWER_REWARD);

    assert_eq!(
        player.check_in_status(1_000_000 + 3_600),
        CheckInStatus::Cooling {
            remaining_secs: CHECK_IN_COOLDOWN_SECS - 3_600
        }
    );
    assert_eq!(
        player.check_in_status(1_000_000 + CHECK_IN_COOLDOWN_SECS - 1),
        CheckInStatus::Cooling { remaining_secs: 1 }
    );
    assert_eq!(
        player.check_in_status(1_000_000 + CHECK_IN_COOLDOWN_SECS),
        CheckInStatus::CooledDown
    );
}

#[test]
fn test_strength() {
    let mut player = Player::new(key(1), key(2), "Rookie".to_string());
    assert_eq!(player.strength(), INITIAL_POWER);

    player.xp = 250;
    assert_eq!(player.strength(), INITIAL_POWER + 2);

    player.power = 0;
    player.xp = 99;
    assert_eq!(player.strength(), 1);
}

#[test]
fn test_battle_records() {
    let mut player = Player::new(key(1), key(2), "Rookie".to_string());
    player.record_win();
    player.record_loss();
    player.record_loss();
    assert_eq!(player.battles_won, 1);
    assert_eq!(player.battles_lost, 2);
    assert_eq!(player.battles_played(), 3);
    assert_eq!(player.xp, BATTLE_XP_REWARD);
    assert_eq!(player.power, INITIAL_POWER);
}

#[test]
fn test_program_error_codes() {
    let too_early = ProgramError::CheckInTooEarly {
        remaining_secs: 60,
    };
    assert_eq!(too_early.code(), 6000);
    assert_eq!(
        too_early.to_string(),
        "You can only check in once every 24 hours"
    );
    assert_eq!(too_early.kind(), ErrorKind::BusinessRule);
    assert_eq!(ProgramError::Unauthorized.kind(), ErrorKind::Authorization);
    assert_eq!(
        ProgramError::MissingSignature {
            role: SignerRole::User
        }
        .kind(),
        ErrorKind::Authorization
    );
    assert_eq!(
        ProgramError::SelfBattleNotAllowed.kind(),
        ErrorKind::Precondition
    );
}

#[test]
fn test_program_error_roundtrip() {
    for error in [
        ProgramError::CheckInTooEarly {
            remaining_secs: 3_600,
        },
        ProgramError::AccountAlreadyInitialized,
        ProgramError::GameStateNotFound,
        ProgramError::PlayerNotFound,
        ProgramError::OpponentNotFound,
        ProgramError::SelfBattleNotAllowed,
        ProgramError::InvalidName,
        ProgramError::UnknownInstruction(9),
        ProgramError::InvalidInstructionData,
        ProgramError::InvalidAccounts {
            expected: 3,
            got: 2,
        },
        ProgramError::AccountMismatch,
        ProgramError::NonceMismatch {
            expected: 4,
            got: 7,
        },
        ProgramError::MissingSignature {
            role: SignerRole::GameState,
        },
        ProgramError::InvalidSignature,
        ProgramError::Unauthorized,
    ] {
        let encoded = error.encode();
        let decoded = ProgramError::decode(encoded).unwrap();
        assert_eq!(error, decoded);
    }
}

#[test]
fn test_program_error_rejects_unknown_code() {
    let mut encoded = Vec::new();
    commonware_codec::Write::write(&5_999u32, &mut encoded);
    assert!(ProgramError::decode(encoded.as_slice()).is_err());
}

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ]{0,31}".prop_map(|s| format!("P{s}"))
}

proptest! {
    #[test]
    fn prop_player_roundtrip(
        owner in any::<u64>(),
        game in any::<u64>(),
        name in arb_name(),
        battles_won in any::<u64>(),
        battles_lost in any::<u64>(),
        daily_check_in in any::<i64>(),
        xp in any::<u64>(),
        power in any::<u64>(),
    ) {
        let player = Player {
            owner: key(owner),
            game: key(game),
            name,
            battles_won,
            battles_lost,
            daily_check_in,
            xp,
            power,
        };
        let decoded = Player::decode(player.encode()).unwrap();
        prop_assert_eq!(player, decoded);
    }

    #[test]
    fn prop_player_decode_no_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = Player::decode(data.as_slice());
    }
}
