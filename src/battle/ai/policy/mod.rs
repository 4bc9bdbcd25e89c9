//! Per-phase decision policies
//!
//! Each policy has a pure planning half (snapshot + mind in, choice out) and
//! an async `run` that submits the choice and reacts to the verdict.

pub mod attack;
pub mod deploy;
pub mod movement;
pub mod power;
pub mod repair;

use ahash::AHashSet;

use crate::battle::action::Action;
use crate::battle::ai::decision_context::AgentMind;
use crate::battle::state::{BattleState, Phase};
use crate::core::error::Result;
use crate::core::types::ShipId;
use crate::session::player::{PlayerHandle, Verdict};

/// What the runtime should do after a policy returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Something was submitted; wait for the next snapshot
    AwaitNextState,
    /// A submission was rejected; decide again on the same snapshot
    Replan,
}

/// Choices ruled out for the rest of the current phase
#[derive(Debug, Default)]
pub struct PhaseScratch {
    phase_seq: Option<u64>,
    pub excluded_ships: AHashSet<ShipId>,
    pub excluded_weapons: AHashSet<(ShipId, usize)>,
    pub excluded_abilities: AHashSet<(ShipId, usize)>,
}

impl PhaseScratch {
    /// Forget everything when the phase has moved on
    pub fn sync(&mut self, phase_seq: u64) {
        if self.phase_seq != Some(phase_seq) {
            *self = Self {
                phase_seq: Some(phase_seq),
                ..Self::default()
            };
        }
    }
}

/// Run the policy for the snapshot's phase
pub async fn dispatch(
    player: &mut PlayerHandle,
    mind: &mut AgentMind,
    state: &BattleState,
) -> Result<Flow> {
    mind.scratch.sync(state.phase_seq);
    tracing::debug!(
        side = ?player.side(),
        phase = ?state.phase,
        version = state.version,
        "Deciding"
    );

    match state.phase {
        Phase::Deploy => deploy::run(player, mind, state).await,
        Phase::Power => power::run(player).await,
        Phase::Move => movement::run(player, mind, state).await,
        Phase::Attack => attack::run(player, mind, state).await,
        Phase::Repair => repair::run(player, mind, state).await,
    }
}

/// End the phase; a rejected "done" sends the runtime back to planning
pub(crate) async fn finish_phase(player: &mut PlayerHandle) -> Result<Flow> {
    match player.submit_checked(Action::DonePhase).await? {
        Verdict::Accepted => Ok(Flow::AwaitNextState),
        Verdict::Rejected(message) => {
            tracing::warn!(side = ?player.side(), %message, "Done with phase was rejected");
            Ok(Flow::Replan)
        }
    }
}
