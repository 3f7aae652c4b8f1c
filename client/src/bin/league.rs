//! Command line access to a local league ledger.
//!
//! Usage: league --config league.yaml <command>
//!
//! The configured key pays for and signs every instruction. `keygen` prints a fresh key for
//! the config file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commonware_codec::{DecodeExt, Encode};
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::{from_hex_formatted, hex};
use league_client::{client::generate_keypair, Client, Config};
use league_types::{execution::Value, league::CheckInStatus};
use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "league")]
#[command(about = "Manage games and players on a local esports league ledger")]
struct Args {
    /// YAML config with `database`, `private_key` and `log_level`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh private key and its address
    Keygen,
    #[command(flatten)]
    Ledger(LedgerCommand),
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Create a game state account with the configured key as authority
    Init,
    /// Mint a player under a game, owned by the configured key
    Mint {
        #[arg(long)]
        game: String,
        /// Defaults to `Player N` for a random N
        #[arg(long)]
        name: Option<String>,
    },
    /// Battle an opponent with one of your players
    Battle {
        #[arg(long)]
        player: String,
        #[arg(long)]
        opponent: String,
    },
    /// Claim the daily check-in reward for one of your players
    CheckIn {
        #[arg(long)]
        player: String,
    },
    /// Print the account stored at an address
    Show { address: String },
}

fn parse_address(field: &str, value: &str) -> Result<PublicKey> {
    let bytes =
        from_hex_formatted(value).with_context(|| format!("{field} must be hex: {value}"))?;
    PublicKey::decode(bytes.as_ref()).with_context(|| format!("{field} is not an address: {value}"))
}

fn unix_now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;
    i64::try_from(elapsed.as_secs()).context("system clock out of range")
}

fn print_account(address: &PublicKey, value: &Value, now: i64) {
    println!("address: {}", hex(&address.encode()));
    match value {
        Value::GameState(state) => {
            println!("  kind: game");
            println!("  authority: {}", hex(&state.authority.encode()));
        }
        Value::Player(player) => {
            println!("  kind: player");
            println!("  name: {}", player.name);
            println!("  owner: {}", hex(&player.owner.encode()));
            println!("  game: {}", hex(&player.game.encode()));
            println!(
                "  record: {} won / {} lost",
                player.battles_won, player.battles_lost
            );
            println!("  xp: {} power: {}", player.xp, player.power);
            println!("  last check-in: {}", player.daily_check_in);
            let status = player.check_in_status(now);
            if status.is_available() {
                println!("  check-in: available");
            } else if let CheckInStatus::Cooling { remaining_secs } = status {
                println!("  check-in: cooling, {remaining_secs}s left");
            }
        }
        Value::Nonce(nonce) => println!("  nonce: {nonce}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Keygen => {
            let (private, public) = generate_keypair();
            println!("private_key: \"{}\"", hex(&private.encode()));
            println!("address: {}", hex(&public.encode()));
            Ok(())
        }
        Command::Ledger(command) => {
            let config_file = args.config.context("missing --config")?;
            run(config_file, command).await
        }
    }
}

async fn run(config_file: PathBuf, command: LedgerCommand) -> Result<()> {
    // Load config
    let contents = std::fs::read_to_string(&config_file)
        .with_context(|| format!("Could not read config file {}", config_file.display()))?;
    let config: Config = serde_yaml::from_str(&contents).context("Could not parse config file")?;
    let redacted = format!("{:?}", config.redacted_debug());
    let config = config.validate().context("Invalid config")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();
    info!(config = %redacted, "loaded config file");

    let client = Client::open(&config.database)?;
    let signer = &config.signer;
    let now = unix_now()?;

    match command {
        LedgerCommand::Init => {
            let (game, game_address) = generate_keypair();
            client.initialize_game(signer, &game).await?;
            println!("game: {}", hex(&game_address.encode()));
            println!("authority: {}", hex(&config.public_key.encode()));
        }
        LedgerCommand::Mint { game, name } => {
            let game = parse_address("game", &game)?;
            let (player, player_address) = generate_keypair();
            let minted = client.mint_player(signer, &game, &player, name).await?;
            print_account(&player_address, &Value::Player(minted), now);
        }
        LedgerCommand::Battle { player, opponent } => {
            let player = parse_address("player", &player)?;
            let opponent = parse_address("opponent", &opponent)?;
            let report = client.battle(signer, &player, &opponent).await?;
            let verdict = if report.player_won(&player) {
                "won"
            } else {
                "lost"
            };
            println!(
                "{verdict} (roll {} of {} vs strength {})",
                report.roll,
                report.player_strength.saturating_add(report.opponent_strength),
                report.player_strength
            );
            print_account(&player, &Value::Player(report.player), now);
            print_account(&opponent, &Value::Player(report.opponent), now);
        }
        LedgerCommand::CheckIn { player } => {
            let player = parse_address("player", &player)?;
            let updated = client.daily_check_in(signer, &player).await?;
            print_account(&player, &Value::Player(updated), now);
        }
        LedgerCommand::Show { address } => {
            let address = parse_address("address", &address)?;
            let value = client.account(&address).await?;
            print_account(&address, &value, now);
        }
    }
    Ok(())
}
