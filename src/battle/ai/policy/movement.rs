//! Movement: smallest ships first, hurt ships more eagerly

use std::f64::consts::{FRAC_PI_4, TAU};

use rand::Rng;

use crate::battle::action::Action;
use crate::battle::ai::brain::SHIPS_LOST;
use crate::battle::ai::decision_context::{AgentMind, DecisionContext};
use crate::battle::ai::instinct::InstinctKey;
use crate::battle::ai::policy::{finish_phase, Flow};
use crate::battle::ship::Ship;
use crate::battle::state::BattleState;
use crate::core::error::Result;
use crate::core::types::{ShipId, Vec2};
use crate::math::{weighted_pick, weighted_pick_required};
use crate::session::player::{PlayerHandle, Verdict};

/// Compass headings tried for a normal move
const HEADINGS: usize = 8;

/// Headings tried for a warp jump
const WARP_HEADINGS: usize = 4;

/// Floor added to every destination score so no legal spot is impossible
const SCORE_FLOOR: f64 = 0.05;

/// Friendly spacing beyond which more room stops mattering
const COMFORTABLE_SPACING: f64 = 10.0;

/// Aggression given up per own ship destroyed
const LOSS_CAUTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlan {
    pub ship: ShipId,
    pub from: Vec2,
    pub to: Vec2,
    pub warp: bool,
}

impl MovePlan {
    fn action(&self) -> Action {
        if self.warp {
            Action::Warp {
                ship: self.ship,
                to: self.to,
            }
        } else {
            Action::Move {
                ship: self.ship,
                to: self.to,
            }
        }
    }
}

/// Pick a ship and a destination, or `None` if nothing can move
///
/// A ship with no legal spot at all (not even where it sits) is excluded for
/// the rest of the phase and another ship is tried. Ship weights that are
/// all unusable are an error.
pub fn choose_move(ctx: &DecisionContext, mind: &mut AgentMind) -> Result<Option<MovePlan>> {
    loop {
        let movable: Vec<&Ship> = ctx
            .own_ships()
            .filter(|s| !s.has_moved && !mind.scratch.excluded_ships.contains(&s.id))
            .collect();
        let Some(smallest) = movable.iter().map(|s| s.weight_class).min() else {
            return Ok(None);
        };

        let bias = mind.instinct(InstinctKey::MoveSufferingBias);
        let tier = movable
            .iter()
            .filter(|s| s.weight_class == smallest)
            .map(|s| (*s, (1.0 + s.suffering()).powf(bias)));
        let ship = weighted_pick_required(tier, &mut mind.rng)?;
        let Some(from) = ship.position else {
            return Ok(None);
        };

        let destinations: Vec<(Vec2, bool)> = candidate_destinations(ship, from, mind)
            .into_iter()
            .filter(|(to, _)| {
                ctx.state.arena.contains(*to, ship.radius())
                    && !ctx.state.collides(*to, ship.radius(), Some(ship.id))
            })
            .collect();

        let aggression = cautious_aggression(mind)?;
        let spread = mind.instinct(InstinctKey::MoveSpreadPreference);
        let scored = destinations
            .into_iter()
            .map(|(to, warp)| ((to, warp), positional_score(ctx, ship, to, aggression, spread)));
        let Some((to, warp)) = weighted_pick(scored, &mut mind.rng) else {
            tracing::warn!(ship = %ship.id, "No legal spot for ship, skipping it this phase");
            mind.scratch.excluded_ships.insert(ship.id);
            continue;
        };

        return Ok(Some(MovePlan {
            ship: ship.id,
            from,
            to,
            warp,
        }));
    }
}

/// Aggression, lowered for every ship this side has lost so far
pub fn cautious_aggression(mind: &mut AgentMind) -> Result<f64> {
    let aggression = mind.instinct(InstinctKey::MoveAggression);
    let lost = mind.brain.get(&SHIPS_LOST.key())?;
    Ok((aggression - LOSS_CAUTION * lost as f64).max(-1.0))
}

/// Stay put, eight headings at half and full range, and maybe a few warp jumps
fn candidate_destinations(ship: &Ship, from: Vec2, mind: &mut AgentMind) -> Vec<(Vec2, bool)> {
    let mut candidates = vec![(from, false)];

    for i in 0..HEADINGS {
        let heading = Vec2::from_angle(TAU * i as f64 / HEADINGS as f64);
        for fraction in [0.5, 1.0] {
            candidates.push((from + heading * (ship.move_range * fraction), false));
        }
    }

    if let Some(warp_range) = ship.warp_range {
        // The more a drive has been used, the more it gets used
        let uses = ship.warp_uses as f64;
        let propensity = mind.instinct(InstinctKey::MoveWarpPropensity);
        let chance = (propensity * (uses + 1.0) / (uses + 2.0)).clamp(0.0, 1.0);
        if mind.rng.gen_bool(chance) {
            for i in 0..WARP_HEADINGS {
                let heading = Vec2::from_angle(FRAC_PI_4 + TAU * i as f64 / WARP_HEADINGS as f64);
                candidates.push((from + heading * warp_range, true));
            }
        }
    }

    candidates
}

/// Prefer a distance to the nearest enemy set by aggression, and room from friends
fn positional_score(ctx: &DecisionContext, ship: &Ship, to: Vec2, aggression: f64, spread: f64) -> f64 {
    let reach = ship
        .weapons
        .iter()
        .map(|w| w.range)
        .fold(ship.move_range, f64::max)
        .max(1.0);

    let closeness = match ctx.nearest_enemy_distance(to) {
        Some(distance) => {
            let preferred = reach * (1.0 - 0.5 * aggression);
            1.0 / (1.0 + (distance - preferred).abs() / reach)
        }
        None => 1.0,
    };

    let room = ctx
        .nearest_friend_distance(to, ship)
        .map_or(1.0, |d| (d / COMFORTABLE_SPACING).min(1.0));

    SCORE_FLOOR + closeness + spread * room
}

pub async fn run(player: &mut PlayerHandle, mind: &mut AgentMind, state: &BattleState) -> Result<Flow> {
    let ctx = DecisionContext::new(player.side(), state);
    let Some(plan) = choose_move(&ctx, mind)? else {
        return finish_phase(player).await;
    };
    tracing::debug!(side = ?player.side(), ship = %plan.ship, warp = plan.warp, "Moving");

    let message = match player.submit_checked(plan.action()).await? {
        Verdict::Accepted => return Ok(Flow::AwaitNextState),
        Verdict::Rejected(message) => message,
    };
    tracing::warn!(side = ?player.side(), ship = %plan.ship, %message, "Move rejected, holding position");

    let hold = Action::Move {
        ship: plan.ship,
        to: plan.from,
    };
    match player.submit_checked(hold).await? {
        Verdict::Accepted => Ok(Flow::AwaitNextState),
        Verdict::Rejected(message) => {
            tracing::warn!(side = ?player.side(), ship = %plan.ship, %message, "Ship cannot move this phase");
            mind.scratch.excluded_ships.insert(plan.ship);
            Ok(Flow::Replan)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::ai::instinct::Instincts;
    use crate::battle::ship::WeightClass;
    use crate::battle::state::Phase;
    use crate::core::error::TacticsError;
    use crate::core::types::PlayerSide;

    fn fleet() -> BattleState {
        let mut light = Ship::new(PlayerSide::Host, "Light", WeightClass::Light);
        light.position = Some(Vec2::new(20.0, 15.0));
        let mut heavy = Ship::new(PlayerSide::Host, "Heavy", WeightClass::Heavy);
        heavy.position = Some(Vec2::new(40.0, 10.0));
        let mut enemy = Ship::new(PlayerSide::Guest, "Enemy", WeightClass::Medium);
        enemy.position = Some(Vec2::new(30.0, 45.0));
        let mut state = BattleState::new(vec![light, heavy, enemy], 100, 10);
        state.phase = Phase::Move;
        state
    }

    #[test]
    fn test_smallest_tier_moves_first() {
        let state = fleet();
        let light = state.ships[0].id;
        for seed in 0..10 {
            let mut mind = AgentMind::new(Instincts::new(), seed);
            let ctx = DecisionContext::new(PlayerSide::Host, &state);
            let plan = choose_move(&ctx, &mut mind).unwrap().expect("light ship can move");
            assert_eq!(plan.ship, light);
            assert!(plan.from.distance(&plan.to) <= state.ships[0].move_range + 1e-9);
        }
    }

    #[test]
    fn test_moved_and_excluded_ships_are_skipped() {
        let mut state = fleet();
        state.ships[0].has_moved = true;
        let heavy = state.ships[1].id;

        let mut mind = AgentMind::new(Instincts::new(), 1);
        let ctx = DecisionContext::new(PlayerSide::Host, &state);
        assert_eq!(choose_move(&ctx, &mut mind).unwrap().map(|p| p.ship), Some(heavy));

        mind.scratch.excluded_ships.insert(heavy);
        assert!(choose_move(&ctx, &mut mind).unwrap().is_none());
    }

    #[test]
    fn test_destinations_stay_in_arena() {
        let mut state = fleet();
        state.ships[0].position = Some(Vec2::new(0.6, 0.6));
        for seed in 0..20 {
            let mut mind = AgentMind::new(Instincts::new(), seed);
            let ctx = DecisionContext::new(PlayerSide::Host, &state);
            let plan = choose_move(&ctx, &mut mind).unwrap().unwrap();
            assert!(state.arena.contains(plan.to, 0.5));
        }
    }

    #[test]
    fn test_ship_without_a_legal_spot_is_skipped() {
        let mut state = fleet();
        // Light footprint pokes out of the arena, so even holding is illegal
        state.ships[0].position = Some(Vec2::new(0.1, 0.1));
        let (light, heavy) = (state.ships[0].id, state.ships[1].id);

        let mut mind = AgentMind::new(Instincts::new(), 4);
        let ctx = DecisionContext::new(PlayerSide::Host, &state);
        let plan = choose_move(&ctx, &mut mind).unwrap().expect("heavy ship can still move");
        assert_eq!(plan.ship, heavy);
        assert!(mind.scratch.excluded_ships.contains(&light));
    }

    #[test]
    fn test_unusable_suffering_bias_is_an_error() {
        let mut state = fleet();
        state.ships[0].fire_stacks = 1;
        let mut mind = AgentMind::new(
            Instincts::from_values([(InstinctKey::MoveSufferingBias, f64::NAN)]),
            4,
        );
        let ctx = DecisionContext::new(PlayerSide::Host, &state);
        assert!(matches!(
            choose_move(&ctx, &mut mind),
            Err(TacticsError::EmptyDistribution)
        ));
    }

    #[test]
    fn test_losses_make_the_fleet_cautious() {
        let mut mind = AgentMind::new(Instincts::from_values([(InstinctKey::MoveAggression, 0.5)]), 0);
        assert_eq!(cautious_aggression(&mut mind).unwrap(), 0.5);
        mind.brain.set(&SHIPS_LOST.key(), 2).unwrap();
        assert_eq!(cautious_aggression(&mut mind).unwrap(), 0.0);
        mind.brain.set(&SHIPS_LOST.key(), 40).unwrap();
        assert_eq!(cautious_aggression(&mut mind).unwrap(), -1.0);
    }

    #[test]
    fn test_full_propensity_warp_drive_sometimes_warps() {
        let mut state = fleet();
        state.ships[0].warp_range = Some(12.0);
        state.ships[0].warp_uses = 50;
        let warped = (0..50).any(|seed| {
            let mut mind = AgentMind::new(
                Instincts::from_values([(InstinctKey::MoveWarpPropensity, 1.0)]),
                seed,
            );
            let ctx = DecisionContext::new(PlayerSide::Host, &state);
            choose_move(&ctx, &mut mind).unwrap().is_some_and(|p| p.warp)
        });
        assert!(warped);
    }
}
