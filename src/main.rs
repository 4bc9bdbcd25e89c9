//! Fleet Tactics - Tournament Entry Point
//!
//! Samples a population of instinct vectors, plays every ordered pair
//! against each other on the skirmish scenario and prints the ranking.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::runtime::Runtime;

use fleet_tactics::battle::ai::{InstinctKey, Instincts};
use fleet_tactics::battle::{Scenario, SkirmishRules};
use fleet_tactics::core::config::{load_config, TacticsConfig};
use fleet_tactics::core::error::Result;
use fleet_tactics::tournament::{generate_population, Tournament};

/// Self-play instinct tournament
#[derive(Parser, Debug)]
#[command(name = "fleet-tactics")]
#[command(about = "Rank sampled agent personalities by self-play net wins")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Population size (overrides config)
    #[arg(long)]
    population: Option<usize>,

    /// Trials per ordered pair (overrides config)
    #[arg(long)]
    trials: Option<usize>,

    /// Random seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct RankedProfile<'a> {
    rank: usize,
    net_wins: i64,
    instincts: &'a Instincts,
}

#[derive(Serialize)]
struct Report<'a> {
    trials_run: usize,
    draws: usize,
    ranking: Vec<RankedProfile<'a>>,
}

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet_tactics=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    tracing::info!(
        population = config.tournament.population_size,
        trials_per_pair = config.tournament.trials_per_pair,
        seed = config.tournament.seed,
        "Fleet Tactics tournament starting..."
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.tournament.seed);
    let population = generate_population(
        &InstinctKey::ALL,
        config.tournament.population_size,
        config.tournament.coordinate_spread,
        &mut rng,
    )?;

    let tournament = Tournament::new(
        Arc::new(SkirmishRules),
        Scenario::skirmish(config.session.max_turns),
        config,
    );

    let rt = Runtime::new()?;
    let result = rt.block_on(tournament.perform_trials(&population))?;

    let report = Report {
        trials_run: result.trials_run,
        draws: result.draws,
        ranking: result
            .ranking()
            .into_iter()
            .enumerate()
            .map(|(i, (instincts, net_wins))| RankedProfile {
                rank: i + 1,
                net_wins,
                instincts,
            })
            .collect(),
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text(&report),
    }

    Ok(())
}

fn resolve_config(args: &Args) -> Result<TacticsConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TacticsConfig::default(),
    };
    if let Some(size) = args.population {
        config.tournament.population_size = size;
    }
    if let Some(trials) = args.trials {
        config.tournament.trials_per_pair = trials;
    }
    if let Some(seed) = args.seed {
        config.tournament.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn print_text(report: &Report) {
    println!("\n=== TOURNAMENT RESULTS ===");
    println!("Trials: {} ({} draws)", report.trials_run, report.draws);
    println!();
    for entry in &report.ranking {
        println!("#{:<3} net {:+}", entry.rank, entry.net_wins);
        let traits: Vec<String> = entry
            .instincts
            .iter()
            .map(|(key, value)| format!("{}={:.2}", key, value))
            .collect();
        println!("     {}", traits.join(" "));
    }
}
