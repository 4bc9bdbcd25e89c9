//! The agent's per-battle scoring memory
//!
//! Each named neuron declares a value type and a default. A neuron can be
//! read globally or per target ship; the storage key is the typed pair
//! (neuron, target) so two targets can never share an entry.

use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TacticsError};
use crate::core::types::ShipId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronId {
    /// How much we want to shoot a ship
    AttackPriority,
    /// Own ships destroyed so far
    ShipsLost,
    /// Hits taken from a ship
    HitsTaken,
}

/// Identity of one stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    pub neuron: NeuronId,
    pub target: Option<ShipId>,
}

/// A declared neuron: value type plus default
pub struct Neuron<T> {
    id: NeuronId,
    default: fn() -> T,
}

impl<T> Neuron<T> {
    pub const fn new(id: NeuronId, default: fn() -> T) -> Self {
        Self { id, default }
    }

    /// The neuron's untargeted entry
    pub fn key(&self) -> BrainKey<T> {
        BrainKey {
            storage: StorageKey {
                neuron: self.id,
                target: None,
            },
            default: self.default,
        }
    }

    /// The neuron's entry for one target ship
    pub fn for_target(&self, target: ShipId) -> BrainKey<T> {
        BrainKey {
            storage: StorageKey {
                neuron: self.id,
                target: Some(target),
            },
            default: self.default,
        }
    }
}

/// Typed handle to one brain entry
pub struct BrainKey<T> {
    storage: StorageKey,
    default: fn() -> T,
}

impl<T> Clone for BrainKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BrainKey<T> {}

impl<T> BrainKey<T> {
    pub fn storage(&self) -> StorageKey {
        self.storage
    }
}

fn zero_score() -> f64 {
    0.0
}

fn zero_count() -> u32 {
    0
}

pub const ATTACK_PRIORITY: Neuron<f64> = Neuron::new(NeuronId::AttackPriority, zero_score);
pub const SHIPS_LOST: Neuron<u32> = Neuron::new(NeuronId::ShipsLost, zero_count);
pub const HITS_TAKEN: Neuron<u32> = Neuron::new(NeuronId::HitsTaken, zero_count);

/// One exported brain entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainEntry {
    pub key: StorageKey,
    pub value: serde_json::Value,
}

/// Scoring memory for a single battle
#[derive(Debug, Default)]
pub struct Brain {
    memory: AHashMap<StorageKey, serde_json::Value>,
}

impl Brain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an entry, storing the neuron's default on first access
    pub fn get<T>(&mut self, key: &BrainKey<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(stored) = self.memory.get(&key.storage) {
            return T::deserialize(stored).map_err(|e| codec_error(key.storage, e));
        }

        let value = (key.default)();
        let encoded = serde_json::to_value(&value).map_err(|e| codec_error(key.storage, e))?;
        self.memory.insert(key.storage, encoded);
        Ok(value)
    }

    /// Overwrite an entry
    pub fn set<T: Serialize>(&mut self, key: &BrainKey<T>, value: T) -> Result<()> {
        let encoded = serde_json::to_value(&value).map_err(|e| codec_error(key.storage, e))?;
        self.memory.insert(key.storage, encoded);
        Ok(())
    }

    /// Add `delta` to a score and return the new value
    pub fn adjust(&mut self, key: &BrainKey<f64>, delta: f64) -> Result<f64> {
        let value = self.get(key)? + delta;
        self.set(key, value)?;
        Ok(value)
    }

    /// Increment a counter and return the new value
    pub fn bump(&mut self, key: &BrainKey<u32>) -> Result<u32> {
        let value = self.get(key)?.saturating_add(1);
        self.set(key, value)?;
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Opaque bag of every stored value
    pub fn export(&self) -> Vec<BrainEntry> {
        self.memory
            .iter()
            .map(|(key, value)| BrainEntry {
                key: *key,
                value: value.clone(),
            })
            .collect()
    }
}

fn codec_error(key: StorageKey, error: serde_json::Error) -> TacticsError {
    TacticsError::BrainCodec {
        key: format!("{:?}", key),
        message: error.to_string(),
    }
}
