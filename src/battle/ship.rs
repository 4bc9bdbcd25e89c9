//! Ships, their weapons and their repair abilities
//!
//! A ship is "in play" once deployed and until destroyed or escaped.

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerSide, ShipId, Vec2};

/// Hull size tier; ordering is smallest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeightClass {
    Light,
    Medium,
    Heavy,
    Massive,
}

impl WeightClass {
    pub const ALL: [WeightClass; 4] = [
        WeightClass::Light,
        WeightClass::Medium,
        WeightClass::Heavy,
        WeightClass::Massive,
    ];

    /// Deployment row, counted from the front line
    pub fn row(self) -> usize {
        match self {
            WeightClass::Light => 0,
            WeightClass::Medium => 1,
            WeightClass::Heavy => 2,
            WeightClass::Massive => 3,
        }
    }

    /// Collision footprint radius
    pub fn radius(self) -> f64 {
        match self {
            WeightClass::Light => 0.5,
            WeightClass::Medium => 1.0,
            WeightClass::Heavy => 1.5,
            WeightClass::Massive => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Hits one ship
    Direct,
    /// Hits every enemy footprint within `radius` of an aim point
    Area { radius: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub kind: WeaponKind,
    pub range: f64,
    pub damage: u32,
    pub incendiary: bool,
    /// Fired this phase
    pub used: bool,
}

impl Weapon {
    pub fn direct(name: &str, range: f64, damage: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: WeaponKind::Direct,
            range,
            damage,
            incendiary: false,
            used: false,
        }
    }

    pub fn area(name: &str, range: f64, radius: f64, damage: u32) -> Self {
        Self {
            kind: WeaponKind::Area { radius },
            ..Self::direct(name, range, damage)
        }
    }

    pub fn incendiary(mut self) -> Self {
        self.incendiary = true;
        self
    }

    pub fn is_area(&self) -> bool {
        matches!(self.kind, WeaponKind::Area { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    RepairModule,
    ExtinguishFire,
    Recoalesce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    pub kind: AbilityKind,
    /// Used this phase
    pub done: bool,
}

impl Ability {
    pub fn new(kind: AbilityKind) -> Self {
        Self { kind, done: false }
    }
}

/// Current and maximum value of a depletable stat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub current: u32,
    pub max: u32,
}

impl Gauge {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f64 {
        if self.max == 0 {
            return 1.0;
        }
        self.current as f64 / self.max as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub owner: PlayerSide,
    pub name: String,
    pub weight_class: WeightClass,
    pub point_cost: u32,

    // Position; `None` until deployed
    pub position: Option<Vec2>,
    pub move_range: f64,
    pub warp_range: Option<f64>,
    pub warp_uses: u32,

    // Condition
    pub hull: Gauge,
    pub shield: Gauge,
    pub fire_stacks: u32,
    pub damaged_modules: u32,
    pub module_count: u32,

    pub weapons: Vec<Weapon>,
    pub abilities: Vec<Ability>,

    // Per-phase bookkeeping
    pub has_moved: bool,

    pub destroyed: bool,
    pub escaped: bool,
}

impl Ship {
    pub fn new(owner: PlayerSide, name: &str, weight_class: WeightClass) -> Self {
        Self {
            id: ShipId::new(),
            owner,
            name: name.to_string(),
            weight_class,
            point_cost: 10,
            position: None,
            move_range: 5.0,
            warp_range: None,
            warp_uses: 0,
            hull: Gauge::full(10),
            shield: Gauge::full(2),
            fire_stacks: 0,
            damaged_modules: 0,
            module_count: 4,
            weapons: Vec::new(),
            abilities: vec![
                Ability::new(AbilityKind::RepairModule),
                Ability::new(AbilityKind::ExtinguishFire),
                Ability::new(AbilityKind::Recoalesce),
            ],
            has_moved: false,
            destroyed: false,
            escaped: false,
        }
    }

    pub fn radius(&self) -> f64 {
        self.weight_class.radius()
    }

    pub fn is_deployed(&self) -> bool {
        self.position.is_some()
    }

    /// Deployed and neither destroyed nor escaped
    pub fn in_play(&self) -> bool {
        self.is_deployed() && !self.destroyed && !self.escaped
    }

    /// Remaining hull as a fraction of maximum
    pub fn health(&self) -> f64 {
        self.hull.fraction()
    }

    /// How badly this ship is hurting; 0.0 for a pristine ship
    pub fn suffering(&self) -> f64 {
        let modules = if self.module_count == 0 {
            0.0
        } else {
            self.damaged_modules as f64 / self.module_count as f64
        };
        (1.0 - self.hull.fraction())
            + 0.5 * (1.0 - self.shield.fraction())
            + 0.25 * self.fire_stacks as f64
            + 0.5 * modules
    }

    /// Would an ability have any effect right now?
    pub fn ability_applies(&self, kind: AbilityKind) -> bool {
        match kind {
            AbilityKind::RepairModule => self.damaged_modules > 0,
            AbilityKind::ExtinguishFire => self.fire_stacks > 0,
            AbilityKind::Recoalesce => self.shield.current < self.shield.max,
        }
    }

    /// Indices of abilities usable this phase
    pub fn available_abilities(&self) -> Vec<usize> {
        self.abilities
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.done && self.ability_applies(a.kind))
            .map(|(i, _)| i)
            .collect()
    }

    /// Does a footprint of `radius` at `at` overlap this ship?
    pub fn overlaps(&self, at: Vec2, radius: f64) -> bool {
        match self.position {
            Some(pos) if self.in_play() => pos.distance(&at) < self.radius() + radius,
            _ => false,
        }
    }
}
