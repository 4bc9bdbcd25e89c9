//! Headless Battle Runner
//!
//! Runs one agent-vs-agent battle on the skirmish scenario and prints the
//! result as JSON or text.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::runtime::Runtime;

use fleet_tactics::battle::ai::{load_instincts, InstinctKey, Instincts};
use fleet_tactics::battle::{BattleState, Scenario, SkirmishRules};
use fleet_tactics::core::config::{load_config, TacticsConfig};
use fleet_tactics::core::error::{Result, TacticsError};
use fleet_tactics::core::types::PlayerSide;
use fleet_tactics::session::Session;

/// Headless Battle Runner - agent vs agent on the skirmish scenario
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run one self-play battle and print the result")]
struct Args {
    /// Host instinct profile (TOML); random when omitted
    #[arg(long)]
    host: Option<PathBuf>,

    /// Guest instinct profile (TOML); random when omitted
    #[arg(long)]
    guest: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Turn limit before the battle is a draw
    #[arg(long)]
    max_turns: Option<u32>,

    /// Random seed for deterministic profiles and agents
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleResult {
    outcome: String,
    message: String,
    turns: u32,
    host_ships_left: usize,
    guest_ships_left: usize,
    log_entries: usize,
    host_instincts: Instincts,
    guest_instincts: Instincts,
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_tactics=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TacticsConfig::default(),
    };
    if let Some(max_turns) = args.max_turns {
        config.session.max_turns = max_turns;
    }
    config.validate()?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let host = profile(args.host.as_ref(), &mut rng)?;
    let guest = profile(args.guest.as_ref(), &mut rng)?;

    let rt = Runtime::new()?;
    let (outcome, message, state) = rt.block_on(battle(&config, host.clone(), guest.clone(), seed))?;

    if args.verbose {
        eprintln!("=== Battle Log ===");
        for entry in &state.chat {
            eprintln!("  [{}] {:?}: {:?}", entry.sent_at, entry.sender, entry.event);
        }
        eprintln!();
    }

    let result = BattleResult {
        outcome,
        message,
        turns: state.turn,
        host_ships_left: state.ships_in_play(PlayerSide::Host).count(),
        guest_ships_left: state.ships_in_play(PlayerSide::Guest).count(),
        log_entries: state.chat.len(),
        host_instincts: host,
        guest_instincts: guest,
        seed,
    };

    match args.format.as_str() {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Outcome: {} ({})", result.outcome, result.message);
            println!("Turns: {}", result.turns);
            println!("Ships left: host {} / guest {}", result.host_ships_left, result.guest_ships_left);
            println!("Log entries: {}", result.log_entries);
            println!("Seed: {}", result.seed);
        }
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn profile(path: Option<&PathBuf>, rng: &mut StdRng) -> Result<Instincts> {
    match path {
        Some(path) => load_instincts(path),
        None => Ok(Instincts::random(&InstinctKey::ALL, rng)),
    }
}

async fn battle(
    config: &TacticsConfig,
    host: Instincts,
    guest: Instincts,
    seed: u64,
) -> Result<(String, String, Arc<BattleState>)> {
    let scenario = Scenario::skirmish(config.session.max_turns);
    let mut session = Session::new(Arc::new(SkirmishRules), scenario.initial_state(), config);
    session.spawn_agent(PlayerSide::Host, host, seed)?;
    session.spawn_agent(PlayerSide::Guest, guest, seed.wrapping_add(1))?;
    session.start()?;

    let ended = session.wait_for_end(config.session.game_timeout()).await;
    let state = session.snapshot();
    session.shutdown().await;

    match ended {
        Ok(end) => {
            let outcome = match end.winner {
                Some(side) => format!("{:?}Win", side),
                None => "Draw".to_string(),
            };
            Ok((outcome, end.message, state))
        }
        Err(TacticsError::Timeout(after)) => Ok(("Draw".into(), format!("timed out after {:?}", after), state)),
        Err(error) => Err(error),
    }
}
