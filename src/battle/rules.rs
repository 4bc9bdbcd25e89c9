//! Rules engine boundary and the reference skirmish rules
//!
//! The agent never decides legality; it submits actions and reacts to
//! whatever the engine makes of them. `SkirmishRules` is the small engine
//! used for self-play and tests.

use serde::{Deserialize, Serialize};

use crate::battle::action::{Action, WeaponTarget};
use crate::battle::ship::{AbilityKind, Weapon, WeaponKind};
use crate::battle::state::{BattleState, ChatEvent, Phase};
use crate::core::types::{PlayerSide, ShipId, Vec2};

/// Slack for float comparisons against ranges
const RANGE_SLACK: f64 = 1e-9;

/// Shield restored per `Recoalesce`
const RECOALESCE_AMOUNT: u32 = 2;

/// Hull damage from a single hit that knocks out a module
const MODULE_DAMAGE_THRESHOLD: u32 = 2;

/// Terminal result of a battle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnd {
    /// `None` for a draw
    pub winner: Option<PlayerSide>,
    pub message: String,
}

impl GameEnd {
    pub fn draw(message: impl Into<String>) -> Self {
        Self {
            winner: None,
            message: message.into(),
        }
    }

    pub fn win(winner: PlayerSide, message: impl Into<String>) -> Self {
        Self {
            winner: Some(winner),
            message: message.into(),
        }
    }
}

/// What the engine made of a submitted action
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Accepted(BattleState),
    Rejected(String),
    GameEnd(GameEnd),
}

/// Authoritative rules; both operations must be pure functions of their inputs
pub trait RulesEngine: Send + Sync + 'static {
    fn apply_action(&self, side: PlayerSide, action: &Action, state: &BattleState) -> ActionOutcome;

    fn check_victory(&self, state: &BattleState) -> Option<GameEnd>;
}

/// Deterministic reference rules for self-play
#[derive(Debug, Clone, Copy, Default)]
pub struct SkirmishRules;

type Verdict = std::result::Result<(), String>;

impl RulesEngine for SkirmishRules {
    fn apply_action(&self, side: PlayerSide, action: &Action, state: &BattleState) -> ActionOutcome {
        let mut next = state.clone();

        let verdict = match action {
            Action::Disconnect => {
                return ActionOutcome::GameEnd(GameEnd::win(
                    side.opponent(),
                    format!("{:?} disconnected", side),
                ));
            }
            Action::Chat(text) => {
                next.log(Some(side), ChatEvent::Message(text.clone()));
                Ok(())
            }
            _ if !state.is_turn_of(side) => Err(format!("not {:?}'s turn to act", side)),
            Action::DonePhase => done_phase(&mut next, side),
            Action::Deploy { ship, position } => deploy(&mut next, side, *ship, *position),
            Action::Move { ship, to } => relocate(&mut next, side, *ship, *to, false),
            Action::Warp { ship, to } => relocate(&mut next, side, *ship, *to, true),
            Action::Attack {
                ship,
                weapon,
                target,
            } => attack(&mut next, side, *ship, *weapon, *target),
            Action::UseAbility { ship, ability } => use_ability(&mut next, side, *ship, *ability),
        };

        match verdict {
            Ok(()) => {
                next.version += 1;
                next.accepted[side.index()] += 1;
                ActionOutcome::Accepted(next)
            }
            Err(message) => ActionOutcome::Rejected(message),
        }
    }

    fn check_victory(&self, state: &BattleState) -> Option<GameEnd> {
        if state.phase == Phase::Deploy {
            return None;
        }

        let host = state.ships_in_play(PlayerSide::Host).count();
        let guest = state.ships_in_play(PlayerSide::Guest).count();

        match (host, guest) {
            (0, 0) => Some(GameEnd::draw("both fleets lost")),
            (0, _) => Some(GameEnd::win(PlayerSide::Guest, "host fleet lost")),
            (_, 0) => Some(GameEnd::win(PlayerSide::Host, "guest fleet lost")),
            _ if state.turn >= state.max_turns => Some(GameEnd::draw(format!(
                "turn limit {} reached",
                state.max_turns
            ))),
            _ => None,
        }
    }
}

fn require_phase(state: &BattleState, phase: Phase) -> Verdict {
    if state.phase != phase {
        return Err(format!("{:?} is not allowed during {:?}", phase, state.phase));
    }
    Ok(())
}

fn pass_initiative(state: &mut BattleState, side: PlayerSide) {
    if !state.is_done(side.opponent()) {
        state.initiative = side.opponent();
    }
}

fn done_phase(state: &mut BattleState, side: PlayerSide) -> Verdict {
    state.done[side.index()] = true;
    state.initiative = side.opponent();

    if state.done.iter().all(|d| *d) {
        advance_phase(state);
    }
    Ok(())
}

fn advance_phase(state: &mut BattleState) {
    if state.phase == Phase::Repair {
        end_of_turn(state);
    }

    state.phase = state.phase.next();
    state.phase_seq += 1;
    state.done = [false; 2];
    state.initiative = if state.turn % 2 == 0 {
        PlayerSide::Host
    } else {
        PlayerSide::Guest
    };

    for ship in &mut state.ships {
        ship.has_moved = false;
        for weapon in &mut ship.weapons {
            weapon.used = false;
        }
        for ability in &mut ship.abilities {
            ability.done = false;
        }
    }

    let (phase, turn) = (state.phase, state.turn);
    state.log(None, ChatEvent::PhaseStarted { phase, turn });
}

/// Fires burn, shields trickle back
fn end_of_turn(state: &mut BattleState) {
    let mut burned = Vec::new();
    for ship in state.ships.iter_mut().filter(|s| s.in_play()) {
        let burn = ship.fire_stacks.min(ship.hull.current);
        ship.hull.current -= burn;
        if ship.hull.current == 0 {
            ship.destroyed = true;
            burned.push(ship.id);
        }
        ship.shield.current = (ship.shield.current + 1).min(ship.shield.max);
    }
    for ship in burned {
        state.log(None, ChatEvent::ShipDestroyed { ship, by: None });
    }
    state.turn += 1;
}

fn deploy(state: &mut BattleState, side: PlayerSide, id: ShipId, position: Vec2) -> Verdict {
    require_phase(state, Phase::Deploy)?;

    let ship = state.ship(id).ok_or("unknown ship")?;
    if ship.owner != side {
        return Err("cannot deploy an enemy ship".into());
    }
    if ship.is_deployed() {
        return Err(format!("{} is already deployed", ship.name));
    }
    if state.deployed_cost(side) + ship.point_cost > state.point_budget {
        return Err(format!("{} exceeds the fleet point budget", ship.name));
    }
    let radius = ship.radius();
    if !state.arena.contains(position, radius) || !state.arena.in_deploy_zone(side, position) {
        return Err("position is outside the deployment zone".into());
    }
    if state.collides(position, radius, Some(id)) {
        return Err("position collides with another ship".into());
    }

    if let Some(ship) = state.ship_mut(id) {
        ship.position = Some(position);
    }
    state.log(None, ChatEvent::ShipIdentified { ship: id, owner: side });
    Ok(())
}

fn relocate(state: &mut BattleState, side: PlayerSide, id: ShipId, to: Vec2, warp: bool) -> Verdict {
    require_phase(state, Phase::Move)?;

    let ship = state.ship(id).ok_or("unknown ship")?;
    if ship.owner != side || !ship.in_play() {
        return Err("ship cannot be moved".into());
    }
    if ship.has_moved {
        return Err(format!("{} already moved this phase", ship.name));
    }
    let from = ship.position.ok_or("ship is not deployed")?;
    let reach = if warp {
        ship.warp_range.ok_or("ship has no warp drive")?
    } else {
        ship.move_range
    };
    if from.distance(&to) > reach + RANGE_SLACK {
        return Err(format!("{} cannot reach that point", ship.name));
    }
    let radius = ship.radius();
    if !state.arena.contains(to, radius) {
        return Err("destination is outside the arena".into());
    }
    if state.collides(to, radius, Some(id)) {
        return Err("destination collides with another ship".into());
    }

    if let Some(ship) = state.ship_mut(id) {
        ship.position = Some(to);
        ship.has_moved = true;
        if warp {
            ship.warp_uses += 1;
        }
    }
    pass_initiative(state, side);
    Ok(())
}

fn attack(
    state: &mut BattleState,
    side: PlayerSide,
    id: ShipId,
    weapon_index: usize,
    target: WeaponTarget,
) -> Verdict {
    require_phase(state, Phase::Attack)?;

    let ship = state.ship(id).ok_or("unknown ship")?;
    if ship.owner != side || !ship.in_play() {
        return Err("ship cannot attack".into());
    }
    let from = ship.position.ok_or("ship is not deployed")?;
    let weapon = ship
        .weapons
        .get(weapon_index)
        .ok_or("unknown weapon")?
        .clone();
    if weapon.used {
        return Err(format!("{} already fired this phase", weapon.name));
    }

    let victims: Vec<ShipId> = match (weapon.kind, target) {
        (WeaponKind::Direct, WeaponTarget::Ship(target_id)) => {
            let victim = state.ship(target_id).ok_or("unknown target")?;
            if victim.owner == side || !victim.in_play() {
                return Err("invalid target".into());
            }
            let at = victim.position.ok_or("target is not deployed")?;
            if from.distance(&at) > weapon.range + victim.radius() + RANGE_SLACK {
                return Err("target is out of range".into());
            }
            vec![target_id]
        }
        (WeaponKind::Area { radius }, WeaponTarget::Point(point)) => {
            if from.distance(&point) > weapon.range + RANGE_SLACK {
                return Err("aim point is out of range".into());
            }
            state
                .ships_in_play(side.opponent())
                .filter(|s| s.overlaps(point, radius))
                .map(|s| s.id)
                .collect()
        }
        (WeaponKind::Direct, WeaponTarget::Point(_)) => {
            return Err(format!("{} needs a ship target", weapon.name));
        }
        (WeaponKind::Area { .. }, WeaponTarget::Ship(_)) => {
            return Err(format!("{} needs an aim point", weapon.name));
        }
    };

    if let Some(weapon) = state
        .ship_mut(id)
        .and_then(|s| s.weapons.get_mut(weapon_index))
    {
        weapon.used = true;
    }

    if victims.is_empty() {
        state.log(
            None,
            ChatEvent::AttackFailed {
                attacker: id,
                target: None,
            },
        );
    }
    for victim in victims {
        strike(state, id, victim, &weapon);
    }

    pass_initiative(state, side);
    Ok(())
}

/// Shields soak first; whatever gets through hits the hull
fn strike(state: &mut BattleState, attacker: ShipId, target: ShipId, weapon: &Weapon) {
    let Some(ship) = state.ship_mut(target) else {
        return;
    };

    let absorbed = weapon.damage.min(ship.shield.current);
    ship.shield.current -= absorbed;
    let through = (weapon.damage - absorbed).min(ship.hull.current);
    ship.hull.current -= through;

    if through >= MODULE_DAMAGE_THRESHOLD && ship.damaged_modules < ship.module_count {
        ship.damaged_modules += 1;
    }
    if weapon.incendiary && through > 0 {
        ship.fire_stacks += 1;
    }
    let destroyed = ship.hull.current == 0;
    if destroyed {
        ship.destroyed = true;
    }

    if through == 0 {
        state.log(
            None,
            ChatEvent::AttackFailed {
                attacker,
                target: Some(target),
            },
        );
    } else {
        state.log(
            None,
            ChatEvent::ShipAttacked {
                attacker,
                target,
                damage: through,
            },
        );
    }
    if destroyed {
        state.log(
            None,
            ChatEvent::ShipDestroyed {
                ship: target,
                by: Some(attacker),
            },
        );
    }
}

fn use_ability(state: &mut BattleState, side: PlayerSide, id: ShipId, index: usize) -> Verdict {
    require_phase(state, Phase::Repair)?;

    let ship = state.ship_mut(id).ok_or("unknown ship")?;
    if ship.owner != side || !ship.in_play() {
        return Err("ship cannot use abilities".into());
    }
    let ability = ship.abilities.get(index).ok_or("unknown ability")?;
    let kind = ability.kind;
    if ability.done {
        return Err(format!("{:?} already used this phase", kind));
    }
    if !ship.ability_applies(kind) {
        return Err(format!("{:?} would have no effect", kind));
    }

    match kind {
        AbilityKind::RepairModule => ship.damaged_modules -= 1,
        AbilityKind::ExtinguishFire => ship.fire_stacks -= 1,
        AbilityKind::Recoalesce => {
            ship.shield.current = (ship.shield.current + RECOALESCE_AMOUNT).min(ship.shield.max);
        }
    }
    ship.abilities[index].done = true;
    Ok(())
}
