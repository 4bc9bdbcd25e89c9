//! AI's view of the battle state
//!
//! `DecisionContext` is a read-only, side-relative view over one snapshot.
//! `AgentMind` is everything the agent itself owns between decisions.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::battle::ai::brain::Brain;
use crate::battle::ai::instinct::{InstinctKey, Instincts};
use crate::battle::ai::policy::PhaseScratch;
use crate::battle::ship::Ship;
use crate::battle::state::BattleState;
use crate::core::types::{PlayerSide, Vec2};

/// Side-relative view of one snapshot
pub struct DecisionContext<'a> {
    pub side: PlayerSide,
    pub state: &'a BattleState,
}

impl<'a> DecisionContext<'a> {
    pub fn new(side: PlayerSide, state: &'a BattleState) -> Self {
        Self { side, state }
    }

    /// Own ships that are deployed and still fighting
    pub fn own_ships(&self) -> impl Iterator<Item = &'a Ship> {
        self.state.ships_in_play(self.side)
    }

    /// Own ships still waiting to be deployed
    pub fn undeployed_ships(&self) -> impl Iterator<Item = &'a Ship> {
        self.state
            .ships_of(self.side)
            .filter(|s| !s.is_deployed() && !s.destroyed && !s.escaped)
    }

    pub fn enemy_ships(&self) -> impl Iterator<Item = &'a Ship> {
        self.state.ships_in_play(self.side.opponent())
    }

    /// Points left for deployment
    pub fn remaining_budget(&self) -> u32 {
        self.state
            .point_budget
            .saturating_sub(self.state.deployed_cost(self.side))
    }

    /// Distance from `pos` to the closest enemy footprint centre
    pub fn nearest_enemy_distance(&self, pos: Vec2) -> Option<f64> {
        self.enemy_ships()
            .filter_map(|s| s.position)
            .map(|p| p.distance(&pos))
            .min_by(f64::total_cmp)
    }

    /// Distance from `pos` to the closest friendly ship other than `except`
    pub fn nearest_friend_distance(&self, pos: Vec2, except: &Ship) -> Option<f64> {
        self.own_ships()
            .filter(|s| s.id != except.id)
            .filter_map(|s| s.position)
            .map(|p| p.distance(&pos))
            .min_by(f64::total_cmp)
    }
}

/// The agent's private state: personality, memory, randomness, phase scratch
pub struct AgentMind {
    pub instincts: Instincts,
    pub brain: Brain,
    pub rng: ChaCha8Rng,
    pub scratch: PhaseScratch,
}

impl AgentMind {
    pub fn new(instincts: Instincts, seed: u64) -> Self {
        Self {
            instincts,
            brain: Brain::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            scratch: PhaseScratch::default(),
        }
    }

    /// Read an instinct, sampling it with the agent's own RNG on first use
    pub fn instinct(&mut self, key: InstinctKey) -> f64 {
        self.instincts.get(key, &mut self.rng)
    }
}
