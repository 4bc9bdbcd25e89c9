//! Commands a player submits to the rules engine

use serde::{Deserialize, Serialize};

use crate::core::types::{ShipId, Vec2};

/// What a weapon is pointed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponTarget {
    Ship(ShipId),
    Point(Vec2),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Deploy { ship: ShipId, position: Vec2 },
    Move { ship: ShipId, to: Vec2 },
    /// Long-range reposition for ships with a warp drive
    Warp { ship: ShipId, to: Vec2 },
    Attack { ship: ShipId, weapon: usize, target: WeaponTarget },
    UseAbility { ship: ShipId, ability: usize },
    DonePhase,
    Chat(String),
    Disconnect,
}

impl Action {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Deploy { .. } => "deploy",
            Action::Move { .. } => "move",
            Action::Warp { .. } => "warp",
            Action::Attack { .. } => "attack",
            Action::UseAbility { .. } => "ability",
            Action::DonePhase => "done",
            Action::Chat(_) => "chat",
            Action::Disconnect => "disconnect",
        }
    }
}
