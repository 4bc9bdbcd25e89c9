//! Battle snapshots
//!
//! A `BattleState` is never mutated after it is published; the rules engine
//! derives a new one for every accepted action.

use serde::{Deserialize, Serialize};

use crate::battle::ship::Ship;
use crate::core::types::{PlayerSide, SendTime, ShipId, Vec2};

/// Battle phases, in turn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Deploy,
    Power,
    Move,
    Attack,
    Repair,
}

impl Phase {
    /// Phase that follows this one; deployment happens only once
    pub fn next(self) -> Phase {
        match self {
            Phase::Deploy => Phase::Power,
            Phase::Power => Phase::Move,
            Phase::Move => Phase::Attack,
            Phase::Attack => Phase::Repair,
            Phase::Repair => Phase::Power,
        }
    }

    /// Do the sides alternate single actions in this phase?
    pub fn uses_initiative(self) -> bool {
        matches!(self, Phase::Move | Phase::Attack)
    }
}

/// Something that happened, as written to the battle log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    Message(String),
    ShipIdentified { ship: ShipId, owner: PlayerSide },
    ShipAttacked { attacker: ShipId, target: ShipId, damage: u32 },
    AttackFailed { attacker: ShipId, target: Option<ShipId> },
    ShipDestroyed { ship: ShipId, by: Option<ShipId> },
    ShipEscaped { ship: ShipId },
    PhaseStarted { phase: Phase, turn: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sent_at: SendTime,
    /// `None` for entries written by the rules engine itself
    pub sender: Option<PlayerSide>,
    pub event: ChatEvent,
}

/// Rectangular battle area; the host deploys along `y = 0`, the guest along `y = height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    pub deploy_depth: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 60.0,
            height: 60.0,
            deploy_depth: 20.0,
        }
    }
}

impl Arena {
    /// Is a footprint of `radius` at `pos` fully inside the arena?
    pub fn contains(&self, pos: Vec2, radius: f64) -> bool {
        pos.x - radius >= 0.0
            && pos.x + radius <= self.width
            && pos.y - radius >= 0.0
            && pos.y + radius <= self.height
    }

    pub fn in_deploy_zone(&self, side: PlayerSide, pos: Vec2) -> bool {
        match side {
            PlayerSide::Host => pos.y <= self.deploy_depth,
            PlayerSide::Guest => pos.y >= self.height - self.deploy_depth,
        }
    }

    /// Y coordinate of a deployment row, counted from the front line
    pub fn deploy_row_y(&self, side: PlayerSide, row: usize, rows: usize) -> f64 {
        let spacing = self.deploy_depth / rows.max(1) as f64;
        let from_front = (row as f64 + 0.5) * spacing;
        match side {
            PlayerSide::Host => self.deploy_depth - from_front,
            PlayerSide::Guest => self.height - self.deploy_depth + from_front,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    /// Bumped on every accepted action
    pub version: u64,
    pub turn: u32,
    pub max_turns: u32,
    pub phase: Phase,
    /// Bumped on every phase change
    pub phase_seq: u64,
    pub initiative: PlayerSide,
    pub done: [bool; 2],
    pub accepted: [u64; 2],

    pub arena: Arena,
    pub point_budget: u32,
    pub ships: Vec<Ship>,

    pub chat: Vec<ChatEntry>,
}

impl BattleState {
    pub fn new(ships: Vec<Ship>, point_budget: u32, max_turns: u32) -> Self {
        Self {
            version: 0,
            turn: 0,
            max_turns,
            phase: Phase::Deploy,
            phase_seq: 0,
            initiative: PlayerSide::Host,
            done: [false; 2],
            accepted: [0; 2],
            arena: Arena::default(),
            point_budget,
            ships,
            chat: Vec::new(),
        }
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == id)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == id)
    }

    pub fn is_done(&self, side: PlayerSide) -> bool {
        self.done[side.index()]
    }

    /// Actions accepted so far from `side`
    pub fn accepted_actions(&self, side: PlayerSide) -> u64 {
        self.accepted[side.index()]
    }

    /// Not done with the phase, and either free-for-all or holding initiative
    pub fn is_turn_of(&self, side: PlayerSide) -> bool {
        !self.is_done(side) && (!self.phase.uses_initiative() || self.initiative == side)
    }

    pub fn ships_of(&self, side: PlayerSide) -> impl Iterator<Item = &Ship> {
        self.ships.iter().filter(move |s| s.owner == side)
    }

    pub fn ships_in_play(&self, side: PlayerSide) -> impl Iterator<Item = &Ship> {
        self.ships_of(side).filter(|s| s.in_play())
    }

    /// Points already spent on deployed ships
    pub fn deployed_cost(&self, side: PlayerSide) -> u32 {
        self.ships_of(side)
            .filter(|s| s.is_deployed())
            .map(|s| s.point_cost)
            .sum()
    }

    /// Would a footprint at `pos` collide with any ship other than `ignore`?
    pub fn collides(&self, pos: Vec2, radius: f64, ignore: Option<ShipId>) -> bool {
        self.ships
            .iter()
            .filter(|s| Some(s.id) != ignore)
            .any(|s| s.overlaps(pos, radius))
    }

    /// Next logical send time for the battle log
    pub fn next_send_time(&self) -> SendTime {
        self.chat.last().map_or(0, |e| e.sent_at + 1)
    }

    pub fn log(&mut self, sender: Option<PlayerSide>, event: ChatEvent) {
        let sent_at = self.next_send_time();
        self.chat.push(ChatEntry {
            sent_at,
            sender,
            event,
        });
    }
}
