//! Deployment: pick a fleet within budget and line it up by weight class

use crate::battle::action::Action;
use crate::battle::ai::decision_context::{AgentMind, DecisionContext};
use crate::battle::ai::instinct::InstinctKey;
use crate::battle::ai::policy::{finish_phase, Flow};
use crate::battle::ship::{Ship, WeightClass};
use crate::battle::state::BattleState;
use crate::core::error::Result;
use crate::core::types::{ShipId, Vec2};
use crate::math::weighted_pick;
use crate::session::player::{PlayerHandle, Verdict};

/// Number of deployment rows, one per weight class
const ROWS: usize = WeightClass::ALL.len();

/// Choose which ships to deploy and where
pub fn plan_deployment(ctx: &DecisionContext, mind: &mut AgentMind) -> Vec<(ShipId, Vec2)> {
    let mut budget = ctx.remaining_budget();
    let mut pool: Vec<&Ship> = ctx.undeployed_ships().collect();
    let mut chosen: Vec<&Ship> = Vec::new();

    loop {
        let candidates: Vec<(usize, f64)> = pool
            .iter()
            .enumerate()
            .filter(|(_, ship)| ship.point_cost <= budget)
            .map(|(i, ship)| (i, mind.instinct(InstinctKey::deploy_preference(ship.weight_class))))
            .collect();

        let Some(index) = weighted_pick(candidates, &mut mind.rng) else {
            break;
        };
        let ship = pool.swap_remove(index);
        budget -= ship.point_cost;
        chosen.push(ship);
    }

    place_in_rows(ctx, &chosen)
}

/// Front row for the lightest class, evenly spaced across the arena width
fn place_in_rows(ctx: &DecisionContext, chosen: &[&Ship]) -> Vec<(ShipId, Vec2)> {
    let arena = ctx.state.arena;
    let mut placements = Vec::with_capacity(chosen.len());

    for class in WeightClass::ALL {
        let row: Vec<&&Ship> = chosen.iter().filter(|s| s.weight_class == class).collect();
        let y = arena.deploy_row_y(ctx.side, class.row(), ROWS);
        let spacing = arena.width / (row.len() + 1) as f64;
        for (slot, ship) in row.iter().enumerate() {
            placements.push((ship.id, Vec2::new(spacing * (slot + 1) as f64, y)));
        }
    }

    placements
}

pub async fn run(player: &mut PlayerHandle, mind: &mut AgentMind, state: &BattleState) -> Result<Flow> {
    let ctx = DecisionContext::new(player.side(), state);
    let plan = plan_deployment(&ctx, mind);
    tracing::debug!(side = ?player.side(), ships = plan.len(), "Deployment planned");

    for (ship, position) in plan {
        if let Verdict::Rejected(message) = player.submit_checked(Action::Deploy { ship, position }).await? {
            tracing::warn!(side = ?player.side(), %ship, %message, "Deployment rejected, skipping ship");
        }
    }

    finish_phase(player).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::ai::instinct::Instincts;
    use crate::battle::scenario::Scenario;
    use crate::core::types::PlayerSide;

    #[test]
    fn test_plan_respects_budget_and_zone() {
        let state = Scenario::skirmish(10).initial_state();
        for seed in 0..20 {
            let mut mind = AgentMind::new(Instincts::new(), seed);
            let ctx = DecisionContext::new(PlayerSide::Guest, &state);
            let plan = plan_deployment(&ctx, &mut mind);
            assert!(!plan.is_empty());

            let cost: u32 = plan
                .iter()
                .map(|(id, _)| state.ship(*id).unwrap().point_cost)
                .sum();
            assert!(cost <= state.point_budget);

            for (id, pos) in &plan {
                let ship = state.ship(*id).unwrap();
                assert_eq!(ship.owner, PlayerSide::Guest);
                assert!(state.arena.in_deploy_zone(PlayerSide::Guest, *pos));
                assert!(state.arena.contains(*pos, ship.radius()));
            }
        }
    }

    #[test]
    fn test_plan_keeps_picking_until_nothing_is_affordable() {
        let state = Scenario::skirmish(10).initial_state();
        let mut mind = AgentMind::new(Instincts::new(), 3);
        let ctx = DecisionContext::new(PlayerSide::Host, &state);
        let plan = plan_deployment(&ctx, &mut mind);

        let spent: u32 = plan
            .iter()
            .map(|(id, _)| state.ship(*id).unwrap().point_cost)
            .sum();
        let cheapest_left = ctx
            .undeployed_ships()
            .filter(|s| !plan.iter().any(|(id, _)| *id == s.id))
            .map(|s| s.point_cost)
            .min()
            .unwrap_or(u32::MAX);
        assert!(spent.saturating_add(cheapest_left) > state.point_budget);
    }

    #[test]
    fn test_rows_follow_weight_class() {
        let state = Scenario::skirmish(10).initial_state();
        let mut mind = AgentMind::new(Instincts::new(), 11);
        let ctx = DecisionContext::new(PlayerSide::Host, &state);
        let plan = plan_deployment(&ctx, &mut mind);

        for (a, pa) in &plan {
            for (b, pb) in &plan {
                let (sa, sb) = (state.ship(*a).unwrap(), state.ship(*b).unwrap());
                if sa.weight_class < sb.weight_class {
                    // Host front line is the high-y edge of its zone
                    assert!(pa.y > pb.y);
                }
                if a != b {
                    assert!(pa.distance(pb) >= sa.radius() + sb.radius());
                }
            }
        }
    }
}
