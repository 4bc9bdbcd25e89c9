//! Attack: weigh every (ship, weapon, target) triple and fire one

use crate::battle::action::{Action, WeaponTarget};
use crate::battle::ai::brain::{ATTACK_PRIORITY, HITS_TAKEN};
use crate::battle::ai::decision_context::{AgentMind, DecisionContext};
use crate::battle::ai::instinct::InstinctKey;
use crate::battle::ai::policy::{finish_phase, Flow};
use crate::battle::ship::WeaponKind;
use crate::battle::state::BattleState;
use crate::core::error::Result;
use crate::core::types::ShipId;
use crate::math::weighted_pick;
use crate::session::player::{PlayerHandle, Verdict};

/// Weight every target keeps regardless of its value
const BASE_TARGET_WEIGHT: f64 = 0.1;

/// Point cost that counts as one unit of target value
const COST_PER_VALUE: f64 = 10.0;

/// Extra weight per hit an enemy has landed on this side, times the avenge instinct
const GRUDGE_PER_HIT: f64 = 0.1;

/// Blast overlap margin, so aim points at the edge still connect
const BLAST_MARGIN: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackPlan {
    pub ship: ShipId,
    pub weapon: usize,
    pub target: WeaponTarget,
    /// Enemy ship the shot is meant for
    pub victim: ShipId,
    pub area: bool,
}

impl AttackPlan {
    fn action(&self) -> Action {
        Action::Attack {
            ship: self.ship,
            weapon: self.weapon,
            target: self.target,
        }
    }
}

/// `x^exponent` with the sign of `x` preserved
pub fn signed_pow(x: f64, exponent: f64) -> f64 {
    x.signum() * x.abs().powf(exponent)
}

/// Map any real onto a positive weight: `1 + x` above zero, `1 / (1 - x)` below
pub fn smooth(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 + x
    } else {
        1.0 / (1.0 - x)
    }
}

/// Every attack this side could make right now, with its weight
pub fn attack_candidates(ctx: &DecisionContext, mind: &mut AgentMind) -> Result<Vec<(AttackPlan, f64)>> {
    let target_value = mind.instinct(InstinctKey::CombatTargetValue);
    let exponent = mind.instinct(InstinctKey::CombatPriorityExponent);
    let prey_on_weak = mind.instinct(InstinctKey::CombatPreyOnWeak);
    let avenge = mind.instinct(InstinctKey::CombatAvengeAttacks).max(0.0);

    let mut candidates = Vec::new();
    for ship in ctx.own_ships() {
        let Some(from) = ship.position else { continue };

        for (index, weapon) in ship.weapons.iter().enumerate() {
            if weapon.used || mind.scratch.excluded_weapons.contains(&(ship.id, index)) {
                continue;
            }

            for enemy in ctx.enemy_ships() {
                let Some(at) = enemy.position else { continue };
                let distance = from.distance(&at);

                let target = match weapon.kind {
                    WeaponKind::Direct if distance <= weapon.range + enemy.radius() => {
                        WeaponTarget::Ship(enemy.id)
                    }
                    WeaponKind::Area { radius }
                        if distance < weapon.range + radius + enemy.radius() - BLAST_MARGIN =>
                    {
                        WeaponTarget::Point(from.toward(&at, weapon.range))
                    }
                    _ => continue,
                };

                let priority = mind.brain.get(&ATTACK_PRIORITY.for_target(enemy.id))?;
                let hits_taken = mind.brain.get(&HITS_TAKEN.for_target(enemy.id))?;
                let weight = (BASE_TARGET_WEIGHT + target_value * enemy.point_cost as f64 / COST_PER_VALUE)
                    * smooth(signed_pow(priority, exponent))
                    * (1.0 + prey_on_weak * (1.0 - enemy.health()))
                    * (1.0 + avenge * GRUDGE_PER_HIT * hits_taken as f64);

                candidates.push((
                    AttackPlan {
                        ship: ship.id,
                        weapon: index,
                        target,
                        victim: enemy.id,
                        area: weapon.is_area(),
                    },
                    weight,
                ));
            }
        }
    }

    Ok(candidates)
}

/// Weighted pick over the current candidates
pub fn choose_attack(ctx: &DecisionContext, mind: &mut AgentMind) -> Result<Option<AttackPlan>> {
    let candidates = attack_candidates(ctx, mind)?;
    Ok(weighted_pick(candidates, &mut mind.rng))
}

pub async fn run(player: &mut PlayerHandle, mind: &mut AgentMind, state: &BattleState) -> Result<Flow> {
    let ctx = DecisionContext::new(player.side(), state);
    let Some(plan) = choose_attack(&ctx, mind)? else {
        return finish_phase(player).await;
    };
    tracing::debug!(
        side = ?player.side(),
        ship = %plan.ship,
        weapon = plan.weapon,
        target = %plan.victim,
        "Attacking"
    );

    match player.submit_checked(plan.action()).await? {
        Verdict::Accepted => Ok(Flow::AwaitNextState),
        Verdict::Rejected(message) => {
            tracing::warn!(side = ?player.side(), ship = %plan.ship, weapon = plan.weapon, %message, "Attack rejected");
            mind.scratch.excluded_weapons.insert((plan.ship, plan.weapon));

            // Only area shots left: stop guessing aim points
            let remaining = attack_candidates(&ctx, mind)?;
            if remaining.iter().all(|(c, _)| c.area) {
                finish_phase(player).await
            } else {
                Ok(Flow::Replan)
            }
        }
    }
}
