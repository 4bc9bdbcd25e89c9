//! Runtime configuration with documented defaults
//!
//! Loaded from TOML; every section and field falls back to its default so a
//! config file only needs to mention what it overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TacticsError};

/// Agent runtime tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// How long to wait for a rejection after submitting an action (ms)
    ///
    /// A timeout is not an error: the action is assumed accepted.
    pub rejection_timeout_ms: u64,

    /// How many times a policy may ask to re-plan on the same snapshot
    /// before the agent gives up on the phase and submits "done".
    pub max_replans: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rejection_timeout_ms: 50,
            max_replans: 8,
        }
    }
}

impl AgentConfig {
    pub fn rejection_timeout(&self) -> Duration {
        Duration::from_millis(self.rejection_timeout_ms)
    }
}

/// Session and battle limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock limit for one game before it is abandoned (seconds)
    pub game_timeout_secs: u64,

    /// Turn limit after which the reference rules declare a draw
    pub max_turns: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_timeout_secs: 60,
            max_turns: 12,
        }
    }
}

impl SessionConfig {
    pub fn game_timeout(&self) -> Duration {
        Duration::from_secs(self.game_timeout_secs)
    }
}

/// Self-play tournament parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    /// Number of instinct vectors in the population
    pub population_size: usize,

    /// Trials per ordered pair (host, guest)
    pub trials_per_pair: usize,

    /// Upper bound on battles in flight at once
    pub max_concurrent_trials: usize,

    /// Seed for population sampling and per-trial agent seeds
    pub seed: u64,

    /// Multiplier applied to unit-basis coordinates before denormalizing
    ///
    /// Unit vectors in n dimensions have coordinates around 1/sqrt(n), so
    /// `None` means "use sqrt(n)" which spreads profiles across the ranges.
    pub coordinate_spread: Option<f64>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            trials_per_pair: 1,
            max_concurrent_trials: 16,
            seed: 12345,
            coordinate_spread: None,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    pub agent: AgentConfig,
    pub session: SessionConfig,
    pub tournament: TournamentConfig,
}

impl TacticsConfig {
    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.agent.rejection_timeout_ms == 0 {
            return Err(TacticsError::Config(
                "agent.rejection_timeout_ms must be positive".into(),
            ));
        }

        if self.session.game_timeout_secs == 0 || self.session.max_turns == 0 {
            return Err(TacticsError::Config(
                "session.game_timeout_secs and session.max_turns must be positive".into(),
            ));
        }

        if self.tournament.max_concurrent_trials == 0 {
            return Err(TacticsError::Config(
                "tournament.max_concurrent_trials must be positive".into(),
            ));
        }

        if let Some(spread) = self.tournament.coordinate_spread {
            if !(spread.is_finite() && spread > 0.0) {
                return Err(TacticsError::Config(format!(
                    "tournament.coordinate_spread ({}) must be a positive number",
                    spread
                )));
            }
        }

        Ok(())
    }
}

/// Parse and validate a TOML config string
pub fn parse_config(contents: &str) -> Result<TacticsConfig> {
    let config: TacticsConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a TOML config file
pub fn load_config(path: &Path) -> Result<TacticsConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}
