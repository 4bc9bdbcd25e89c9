//! Battle model - snapshots, actions and the rules boundary
//!
//! Snapshots are immutable values; every accepted action produces a new one.
//! The agent lives in `ai` and only ever talks to the rules through actions.

pub mod action;
pub mod ai;
pub mod rules;
pub mod scenario;
pub mod ship;
pub mod state;

// Re-exports for convenient access
pub use action::{Action, WeaponTarget};
pub use rules::{ActionOutcome, GameEnd, RulesEngine, SkirmishRules};
pub use scenario::{Scenario, ShipTemplate};
pub use ship::{Ability, AbilityKind, Gauge, Ship, Weapon, WeaponKind, WeightClass};
pub use state::{Arena, BattleState, ChatEntry, ChatEvent, Phase};
