//! Starting fleets for self-play battles

use serde::{Deserialize, Serialize};

use crate::battle::ship::{Gauge, Ship, Weapon, WeightClass};
use crate::battle::state::BattleState;
use crate::core::types::PlayerSide;

/// Blueprint for one ship in a roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipTemplate {
    pub name: String,
    pub weight_class: WeightClass,
    pub point_cost: u32,
    pub hull: u32,
    pub shield: u32,
    pub move_range: f64,
    pub warp_range: Option<f64>,
    pub weapons: Vec<Weapon>,
}

impl ShipTemplate {
    pub fn build(&self, owner: PlayerSide) -> Ship {
        let mut ship = Ship::new(owner, &self.name, self.weight_class);
        ship.point_cost = self.point_cost;
        ship.hull = Gauge::full(self.hull);
        ship.shield = Gauge::full(self.shield);
        ship.move_range = self.move_range;
        ship.warp_range = self.warp_range;
        ship.weapons = self.weapons.clone();
        ship
    }
}

/// A mirrored battle setup: both sides get the same roster and budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub roster: Vec<ShipTemplate>,
    pub point_budget: u32,
    pub max_turns: u32,
}

impl Scenario {
    /// Mixed roster worth more than the budget, so deployment has to choose
    pub fn skirmish(max_turns: u32) -> Self {
        let roster = vec![
            ShipTemplate {
                name: "Wasp".into(),
                weight_class: WeightClass::Light,
                point_cost: 10,
                hull: 6,
                shield: 2,
                move_range: 8.0,
                warp_range: None,
                weapons: vec![Weapon::direct("Pulse Laser", 18.0, 3)],
            },
            ShipTemplate {
                name: "Hornet".into(),
                weight_class: WeightClass::Light,
                point_cost: 10,
                hull: 6,
                shield: 2,
                move_range: 8.0,
                warp_range: None,
                weapons: vec![Weapon::direct("Pulse Laser", 18.0, 3)],
            },
            ShipTemplate {
                name: "Lancer".into(),
                weight_class: WeightClass::Medium,
                point_cost: 20,
                hull: 10,
                shield: 4,
                move_range: 6.0,
                warp_range: None,
                weapons: vec![
                    Weapon::direct("Railgun", 22.0, 4),
                    Weapon::area("Flak Burst", 16.0, 3.0, 2),
                ],
            },
            ShipTemplate {
                name: "Warden".into(),
                weight_class: WeightClass::Medium,
                point_cost: 20,
                hull: 10,
                shield: 4,
                move_range: 6.0,
                warp_range: None,
                weapons: vec![Weapon::direct("Railgun", 22.0, 4)],
            },
            ShipTemplate {
                name: "Furnace".into(),
                weight_class: WeightClass::Heavy,
                point_cost: 35,
                hull: 16,
                shield: 6,
                move_range: 4.0,
                warp_range: None,
                weapons: vec![
                    Weapon::direct("Plasma Lance", 20.0, 5).incendiary(),
                    Weapon::direct("Point Defence", 10.0, 2),
                ],
            },
            ShipTemplate {
                name: "Leviathan".into(),
                weight_class: WeightClass::Massive,
                point_cost: 50,
                hull: 24,
                shield: 8,
                move_range: 3.0,
                warp_range: Some(20.0),
                weapons: vec![
                    Weapon::area("Siege Torpedo", 26.0, 4.0, 5),
                    Weapon::direct("Broadside", 18.0, 3),
                ],
            },
        ];

        Self {
            roster,
            point_budget: 100,
            max_turns,
        }
    }

    /// Fresh undeployed battle with the roster given to both sides
    pub fn initial_state(&self) -> BattleState {
        let ships = PlayerSide::BOTH
            .iter()
            .flat_map(|side| self.roster.iter().map(move |t| t.build(*side)))
            .collect();
        BattleState::new(ships, self.point_budget, self.max_turns)
    }
}
