//! Repair: use any applicable damage-control ability, chosen uniformly

use crate::battle::action::Action;
use crate::battle::ai::decision_context::{AgentMind, DecisionContext};
use crate::battle::ai::policy::{finish_phase, Flow};
use crate::battle::state::BattleState;
use crate::core::error::Result;
use crate::core::types::ShipId;
use crate::math::weighted_pick;
use crate::session::player::{PlayerHandle, Verdict};

pub fn choose_repair(ctx: &DecisionContext, mind: &mut AgentMind) -> Option<(ShipId, usize)> {
    let available: Vec<((ShipId, usize), f64)> = ctx
        .own_ships()
        .flat_map(|ship| {
            ship.available_abilities()
                .into_iter()
                .map(move |index| (ship.id, index))
        })
        .filter(|key| !mind.scratch.excluded_abilities.contains(key))
        .map(|key| (key, 1.0))
        .collect();

    weighted_pick(available, &mut mind.rng)
}

pub async fn run(player: &mut PlayerHandle, mind: &mut AgentMind, state: &BattleState) -> Result<Flow> {
    let ctx = DecisionContext::new(player.side(), state);
    let Some((ship, ability)) = choose_repair(&ctx, mind) else {
        return finish_phase(player).await;
    };
    tracing::debug!(side = ?player.side(), %ship, ability, "Repairing");

    match player.submit_checked(Action::UseAbility { ship, ability }).await? {
        Verdict::Accepted => Ok(Flow::AwaitNextState),
        Verdict::Rejected(message) => {
            tracing::warn!(side = ?player.side(), %ship, ability, %message, "Ability rejected");
            mind.scratch.excluded_abilities.insert((ship, ability));
            Ok(Flow::Replan)
        }
    }
}
