//! Instincts: the scalar "personality" of one agent
//!
//! Every trait is an `InstinctKey` with a valid range. A profile starts with
//! whatever values it was built from; any key read for the first time is
//! sampled uniformly in its range and remembered, so a live profile never
//! changes a value once it has been read.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ship::WeightClass;
use crate::core::error::{Result, TacticsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstinctKey {
    DeployLightPreference,
    DeployMediumPreference,
    DeployHeavyPreference,
    DeployMassivePreference,
    MoveSufferingBias,
    MoveWarpPropensity,
    MoveAggression,
    MoveSpreadPreference,
    CombatTargetValue,
    CombatPriorityExponent,
    CombatPreyOnWeak,
    CombatAvengeAttacks,
    CombatFocusFire,
    CombatFrustration,
    CombatFirstSighting,
}

impl InstinctKey {
    /// Every recognized key, in a stable order
    pub const ALL: [InstinctKey; 15] = [
        InstinctKey::DeployLightPreference,
        InstinctKey::DeployMediumPreference,
        InstinctKey::DeployHeavyPreference,
        InstinctKey::DeployMassivePreference,
        InstinctKey::MoveSufferingBias,
        InstinctKey::MoveWarpPropensity,
        InstinctKey::MoveAggression,
        InstinctKey::MoveSpreadPreference,
        InstinctKey::CombatTargetValue,
        InstinctKey::CombatPriorityExponent,
        InstinctKey::CombatPreyOnWeak,
        InstinctKey::CombatAvengeAttacks,
        InstinctKey::CombatFocusFire,
        InstinctKey::CombatFrustration,
        InstinctKey::CombatFirstSighting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstinctKey::DeployLightPreference => "deployLightPreference",
            InstinctKey::DeployMediumPreference => "deployMediumPreference",
            InstinctKey::DeployHeavyPreference => "deployHeavyPreference",
            InstinctKey::DeployMassivePreference => "deployMassivePreference",
            InstinctKey::MoveSufferingBias => "moveSufferingBias",
            InstinctKey::MoveWarpPropensity => "moveWarpPropensity",
            InstinctKey::MoveAggression => "moveAggression",
            InstinctKey::MoveSpreadPreference => "moveSpreadPreference",
            InstinctKey::CombatTargetValue => "combatTargetValue",
            InstinctKey::CombatPriorityExponent => "combatPriorityExponent",
            InstinctKey::CombatPreyOnWeak => "combatPreyOnWeak",
            InstinctKey::CombatAvengeAttacks => "combatAvengeAttacks",
            InstinctKey::CombatFocusFire => "combatFocusFire",
            InstinctKey::CombatFrustration => "combatFrustration",
            InstinctKey::CombatFirstSighting => "combatFirstSighting",
        }
    }

    /// Valid `[lo, hi]` range of this trait
    pub fn range(self) -> (f64, f64) {
        match self {
            InstinctKey::DeployLightPreference
            | InstinctKey::DeployMediumPreference
            | InstinctKey::DeployHeavyPreference
            | InstinctKey::DeployMassivePreference => (0.05, 1.0),
            InstinctKey::MoveSufferingBias => (0.0, 3.0),
            InstinctKey::MoveWarpPropensity => (0.0, 1.0),
            InstinctKey::MoveAggression => (-1.0, 1.0),
            InstinctKey::MoveSpreadPreference => (0.0, 1.0),
            InstinctKey::CombatTargetValue => (0.0, 2.0),
            InstinctKey::CombatPriorityExponent => (0.5, 3.0),
            InstinctKey::CombatPreyOnWeak => (0.0, 3.0),
            InstinctKey::CombatAvengeAttacks => (0.0, 5.0),
            InstinctKey::CombatFocusFire => (0.0, 1.0),
            InstinctKey::CombatFrustration => (0.0, 2.0),
            InstinctKey::CombatFirstSighting => (0.0, 1.0),
        }
    }

    /// Default sampler: uniform over the valid range
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        let (lo, hi) = self.range();
        rng.gen_range(lo..=hi)
    }

    /// Map a coordinate in `[-1, 1]` linearly onto the valid range
    pub fn denormalize(self, coordinate: f64) -> f64 {
        let (lo, hi) = self.range();
        denormalize(coordinate, lo, hi)
    }

    /// Deployment preference trait for a weight class
    pub fn deploy_preference(class: WeightClass) -> Self {
        match class {
            WeightClass::Light => InstinctKey::DeployLightPreference,
            WeightClass::Medium => InstinctKey::DeployMediumPreference,
            WeightClass::Heavy => InstinctKey::DeployHeavyPreference,
            WeightClass::Massive => InstinctKey::DeployMassivePreference,
        }
    }
}

impl std::fmt::Display for InstinctKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstinctKey {
    type Err = TacticsError;

    fn from_str(s: &str) -> Result<Self> {
        InstinctKey::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| TacticsError::Config(format!("unknown instinct key '{}'", s)))
    }
}

/// Map `coordinate` in `[-1, 1]` linearly onto `[lo, hi]`, clamping outliers
pub fn denormalize(coordinate: f64, lo: f64, hi: f64) -> f64 {
    let t = (coordinate.clamp(-1.0, 1.0) + 1.0) / 2.0;
    lo + t * (hi - lo)
}

/// One agent's instinct vector
///
/// Equality and hashing are structural, so a profile can key a score map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instincts {
    values: BTreeMap<InstinctKey, OrderedFloat<f64>>,
}

impl Instincts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit profile; keys not given are sampled on first read
    pub fn from_values(values: impl IntoIterator<Item = (InstinctKey, f64)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k, OrderedFloat(v)))
                .collect(),
        }
    }

    /// Profile with every key in `keys` sampled from its default
    pub fn random<R: Rng + ?Sized>(keys: &[InstinctKey], rng: &mut R) -> Self {
        Self::from_values(keys.iter().map(|k| (*k, k.sample(rng))))
    }

    /// Profile from a direction in instinct space
    ///
    /// `coordinates[i]` is scaled by `spread`, clamped to `[-1, 1]` and
    /// denormalized into the range of `keys[i]`.
    pub fn from_coordinates(keys: &[InstinctKey], coordinates: &[f64], spread: f64) -> Self {
        Self::from_values(
            keys.iter()
                .zip(coordinates)
                .map(|(k, c)| (*k, k.denormalize(c * spread))),
        )
    }

    /// Read a trait, sampling and memoizing it on first access
    pub fn get<R: Rng + ?Sized>(&mut self, key: InstinctKey, rng: &mut R) -> f64 {
        self.values
            .entry(key)
            .or_insert_with(|| OrderedFloat(key.sample(rng)))
            .0
    }

    /// Read a trait without sampling
    pub fn value(&self, key: InstinctKey) -> Option<f64> {
        self.values.get(&key).map(|v| v.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstinctKey, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v.0))
    }
}

/// Load an instinct profile from a TOML table of `camelCaseKey = value`
pub fn load_instincts(path: &Path) -> Result<Instincts> {
    let contents = fs::read_to_string(path)?;
    let instincts: Instincts = toml::from_str(&contents)?;
    Ok(instincts)
}
