//! Self-play trials and their aggregation
//!
//! Every ordered pair (host, guest) of the population plays `trials_per_pair`
//! battles, self-pairs included. Trials run concurrently, bounded by a
//! semaphore; only the coordinating task touches the tallies.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::battle::ai::instinct::Instincts;
use crate::battle::rules::RulesEngine;
use crate::battle::scenario::Scenario;
use crate::core::config::TacticsConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::PlayerSide;
use crate::session::orchestrator::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialOutcome {
    HostWin,
    GuestWin,
    Draw,
}

impl TrialOutcome {
    pub fn from_winner(winner: Option<PlayerSide>) -> Self {
        match winner {
            Some(PlayerSide::Host) => TrialOutcome::HostWin,
            Some(PlayerSide::Guest) => TrialOutcome::GuestWin,
            None => TrialOutcome::Draw,
        }
    }
}

/// Wins of row profile over column profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinMatrix {
    size: usize,
    wins: Vec<u32>,
}

impl WinMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            wins: vec![0; size * size],
        }
    }

    pub fn record(&mut self, winner: usize, loser: usize) {
        self.wins[winner * self.size + loser] += 1;
    }

    pub fn wins(&self, winner: usize, loser: usize) -> u32 {
        self.wins[winner * self.size + loser]
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct TournamentResult {
    /// Net wins (wins minus losses) per profile
    pub scores: HashMap<Instincts, i64>,
    /// Indexed by position in the input population
    pub win_matrix: WinMatrix,
    pub trials_run: usize,
    pub draws: usize,
}

impl TournamentResult {
    /// Profiles by descending net wins
    pub fn ranking(&self) -> Vec<(&Instincts, i64)> {
        let mut ranked: Vec<(&Instincts, i64)> = self.scores.iter().map(|(p, s)| (p, *s)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// One battle between two profiles; a game that runs out of time is a draw
pub async fn run_trial(
    rules: Arc<dyn RulesEngine>,
    scenario: &Scenario,
    config: &TacticsConfig,
    host: Instincts,
    guest: Instincts,
    seed: u64,
) -> Result<TrialOutcome> {
    let mut session = Session::new(rules, scenario.initial_state(), config);
    session.spawn_agent(PlayerSide::Host, host, seed)?;
    session.spawn_agent(PlayerSide::Guest, guest, seed.wrapping_add(1))?;
    session.start()?;

    let ended = session.wait_for_end(config.session.game_timeout()).await;
    session.shutdown().await;

    match ended {
        Ok(end) => Ok(TrialOutcome::from_winner(end.winner)),
        Err(TacticsError::Timeout(after)) => {
            tracing::warn!(?after, "Trial timed out, scoring as a draw");
            Ok(TrialOutcome::Draw)
        }
        Err(error) => Err(error),
    }
}

pub struct Tournament {
    rules: Arc<dyn RulesEngine>,
    scenario: Scenario,
    config: TacticsConfig,
}

impl Tournament {
    pub fn new(rules: Arc<dyn RulesEngine>, scenario: Scenario, config: TacticsConfig) -> Self {
        Self {
            rules,
            scenario,
            config,
        }
    }

    /// Play every ordered pair of `population` and tally net wins
    ///
    /// Dropping the returned future aborts every in-flight trial.
    pub async fn perform_trials(&self, population: &[Instincts]) -> Result<TournamentResult> {
        let size = population.len();
        let per_pair = self.config.tournament.trials_per_pair;
        let limit = Arc::new(Semaphore::new(self.config.tournament.max_concurrent_trials));
        tracing::info!(profiles = size, per_pair, "Tournament starting");

        let mut trials = JoinSet::new();
        for host in 0..size {
            for guest in 0..size {
                for round in 0..per_pair {
                    let limit = limit.clone();
                    let rules = self.rules.clone();
                    let scenario = self.scenario.clone();
                    let config = self.config.clone();
                    let (host_profile, guest_profile) = (population[host].clone(), population[guest].clone());
                    let seed = self
                        .config
                        .tournament
                        .seed
                        .wrapping_add((((host * size + guest) * per_pair + round) as u64) << 1);

                    trials.spawn(async move {
                        let _permit = limit
                            .acquire_owned()
                            .await
                            .map_err(|_| TacticsError::SessionClosed("waiting for a trial slot".into()))?;
                        let outcome =
                            run_trial(rules, &scenario, &config, host_profile, guest_profile, seed).await?;
                        Ok::<_, TacticsError>((host, guest, outcome))
                    });
                }
            }
        }

        let mut net = vec![0i64; size];
        let mut win_matrix = WinMatrix::new(size);
        let mut trials_run = 0;
        let mut draws = 0;

        while let Some(joined) = trials.join_next().await {
            let (host, guest, outcome) = joined??;
            trials_run += 1;
            match outcome {
                TrialOutcome::HostWin => {
                    net[host] += 1;
                    net[guest] -= 1;
                    win_matrix.record(host, guest);
                }
                TrialOutcome::GuestWin => {
                    net[guest] += 1;
                    net[host] -= 1;
                    win_matrix.record(guest, host);
                }
                TrialOutcome::Draw => draws += 1,
            }
            tracing::debug!(host, guest, ?outcome, trials_run, "Trial finished");
        }

        let mut scores = HashMap::with_capacity(size);
        for (profile, score) in population.iter().zip(net) {
            *scores.entry(profile.clone()).or_insert(0) += score;
        }

        tracing::info!(trials_run, draws, "Tournament finished");
        Ok(TournamentResult {
            scores,
            win_matrix,
            trials_run,
            draws,
        })
    }
}
