//! Decision policy integration tests
//!
//! Policies run against a bare player handle with nobody answering, so every
//! submission is "assumed accepted" after the rejection timeout and the
//! action queue shows exactly what the policy sent.

use std::sync::Arc;
use std::time::Duration;

use fleet_tactics::battle::ai::policy::{self, attack, Flow};
use fleet_tactics::battle::ai::{AgentMind, DecisionContext, Instincts};
use fleet_tactics::battle::*;
use fleet_tactics::core::types::{PlayerSide, Vec2};
use fleet_tactics::session::{PlayerHandle, Submission};
use tokio::sync::{mpsc, watch};

fn wire(
    state: &BattleState,
) -> (
    PlayerHandle,
    mpsc::UnboundedReceiver<Submission>,
    mpsc::UnboundedSender<String>,
    watch::Sender<Arc<BattleState>>,
) {
    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(Arc::new(state.clone()));
    let player = PlayerHandle::new(
        PlayerSide::Host,
        action_tx,
        error_rx,
        state_rx,
        Duration::from_millis(20),
    );
    (player, action_rx, error_tx, state_tx)
}

fn drain(queue: &mut mpsc::UnboundedReceiver<Submission>) -> Vec<Action> {
    let mut actions = Vec::new();
    while let Ok(submission) = queue.try_recv() {
        assert_eq!(submission.side, PlayerSide::Host);
        actions.push(submission.action);
    }
    actions
}

#[tokio::test]
async fn test_deploy_policy_submits_one_deploy_then_done() {
    let mut scout = Ship::new(PlayerSide::Host, "Scout", WeightClass::Light);
    scout.point_cost = 30;
    let scout_id = scout.id;
    let enemy = Ship::new(PlayerSide::Guest, "Raider", WeightClass::Medium);
    let state = BattleState::new(vec![scout, enemy], 100, 10);
    assert_eq!(state.phase, Phase::Deploy);

    let (mut player, mut queue, _errors, _state) = wire(&state);
    let mut mind = AgentMind::new(Instincts::new(), 42);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::AwaitNextState);

    let actions = drain(&mut queue);
    assert_eq!(actions.len(), 2, "got {:?}", actions);
    match &actions[0] {
        Action::Deploy { ship, position } => {
            assert_eq!(*ship, scout_id);
            assert!(state.arena.in_deploy_zone(PlayerSide::Host, *position));
        }
        other => panic!("expected a deploy, got {:?}", other),
    }
    assert_eq!(actions[1], Action::DonePhase);
}

#[tokio::test]
async fn test_attack_policy_without_targets_only_ends_phase() {
    let mut gunner = Ship::new(PlayerSide::Host, "Gunner", WeightClass::Medium);
    gunner.position = Some(Vec2::new(30.0, 5.0));
    gunner.weapons.push(Weapon::direct("Laser", 10.0, 4));
    gunner.weapons.push(Weapon::area("Mortar", 12.0, 3.0, 2));
    let mut enemy = Ship::new(PlayerSide::Guest, "Distant", WeightClass::Medium);
    enemy.position = Some(Vec2::new(30.0, 55.0));
    let mut state = BattleState::new(vec![gunner, enemy], 100, 10);
    state.phase = Phase::Attack;

    let (mut player, mut queue, _errors, _state) = wire(&state);
    let mut mind = AgentMind::new(Instincts::new(), 7);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::AwaitNextState);

    assert_eq!(drain(&mut queue), vec![Action::DonePhase]);
}

#[tokio::test]
async fn test_rejected_move_falls_back_to_holding_position() {
    let mut runner = Ship::new(PlayerSide::Host, "Runner", WeightClass::Light);
    runner.position = Some(Vec2::new(30.0, 10.0));
    let from = runner.position.unwrap();
    let mut state = BattleState::new(vec![runner], 100, 10);
    state.phase = Phase::Move;

    let (mut player, mut queue, errors, _state) = wire(&state);
    errors.send("stale".into()).unwrap();

    // Reject the first submission only; hand the channels back so they outlive the policy
    let responder = tokio::spawn(async move {
        let first = queue.recv().await.unwrap();
        errors.send("blocked".into()).unwrap();
        let second = queue.recv().await.unwrap();
        (first.action, second.action, queue, errors)
    });

    let mut mind = AgentMind::new(Instincts::new(), 3);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::AwaitNextState);

    let (first, second, _queue, _errors) = responder.await.unwrap();
    assert!(matches!(first, Action::Move { .. } | Action::Warp { .. }));
    match second {
        Action::Move { to, .. } => assert_eq!(to, from),
        other => panic!("expected a hold-position move, got {:?}", other),
    }
}

#[tokio::test]
async fn test_power_and_repair_pass_when_nothing_to_do() {
    let mut ship = Ship::new(PlayerSide::Host, "Idle", WeightClass::Light);
    ship.position = Some(Vec2::new(30.0, 10.0));
    let mut state = BattleState::new(vec![ship], 100, 10);

    for phase in [Phase::Power, Phase::Repair] {
        state.phase = phase;
        state.phase_seq += 1;
        let (mut player, mut queue, _errors, _state) = wire(&state);
        let mut mind = AgentMind::new(Instincts::new(), 1);
        policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
        assert_eq!(drain(&mut queue), vec![Action::DonePhase], "{:?}", phase);
    }
}

/// Answer the first submission with a rejection; hand everything back so the
/// channels outlive the policy under test
fn reject_first(
    mut queue: mpsc::UnboundedReceiver<Submission>,
    errors: mpsc::UnboundedSender<String>,
) -> tokio::task::JoinHandle<(Action, mpsc::UnboundedReceiver<Submission>, mpsc::UnboundedSender<String>)> {
    tokio::spawn(async move {
        let first = queue.recv().await.unwrap();
        errors.send("refused".into()).unwrap();
        (first.action, queue, errors)
    })
}

fn gunnery(weapons: Vec<Weapon>) -> BattleState {
    let mut gunner = Ship::new(PlayerSide::Host, "Gunner", WeightClass::Medium);
    gunner.position = Some(Vec2::new(30.0, 10.0));
    gunner.weapons = weapons;
    let mut enemy = Ship::new(PlayerSide::Guest, "Target", WeightClass::Medium);
    enemy.position = Some(Vec2::new(30.0, 15.0));
    let mut state = BattleState::new(vec![gunner, enemy], 100, 10);
    state.phase = Phase::Attack;
    state
}

#[tokio::test]
async fn test_rejected_attack_with_a_direct_weapon_left_replans() {
    let state = gunnery(vec![Weapon::direct("Laser", 10.0, 3), Weapon::direct("Railgun", 10.0, 4)]);
    let gunner = state.ships[0].id;

    let (mut player, queue, errors, _state) = wire(&state);
    let responder = reject_first(queue, errors);

    let mut mind = AgentMind::new(Instincts::new(), 8);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::Replan);

    let (first, mut queue, _errors) = responder.await.unwrap();
    let Action::Attack { ship, weapon, .. } = first else {
        panic!("expected an attack, got {:?}", first);
    };
    assert_eq!(ship, gunner);
    assert!(mind.scratch.excluded_weapons.contains(&(gunner, weapon)));
    assert!(drain(&mut queue).is_empty());
}

#[tokio::test]
async fn test_rejected_attack_with_only_area_weapons_left_ends_phase() {
    let state = gunnery(vec![Weapon::direct("Laser", 10.0, 3), Weapon::area("Mortar", 10.0, 3.0, 2)]);

    // A seed whose first choice is the laser, found by replaying the same draw
    let ctx = DecisionContext::new(PlayerSide::Host, &state);
    let seed = (0..64)
        .find(|seed| {
            let mut replay = AgentMind::new(Instincts::new(), *seed);
            attack::choose_attack(&ctx, &mut replay)
                .unwrap()
                .is_some_and(|plan| plan.weapon == 0)
        })
        .expect("some seed fires the laser first");

    let (mut player, queue, errors, _state) = wire(&state);
    let responder = reject_first(queue, errors);

    let mut mind = AgentMind::new(Instincts::new(), seed);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::AwaitNextState);

    let (first, mut queue, _errors) = responder.await.unwrap();
    assert!(matches!(first, Action::Attack { weapon: 0, .. }), "got {:?}", first);
    // The mortar is never tried
    assert_eq!(drain(&mut queue), vec![Action::DonePhase]);
}

#[tokio::test]
async fn test_rejected_ability_is_not_chosen_again() {
    let mut ship = Ship::new(PlayerSide::Host, "Burning", WeightClass::Medium);
    ship.position = Some(Vec2::new(30.0, 10.0));
    ship.fire_stacks = 2;
    let burning = ship.id;
    let mut state = BattleState::new(vec![ship], 100, 10);
    state.phase = Phase::Repair;

    let (mut player, queue, errors, _state) = wire(&state);
    let responder = reject_first(queue, errors);

    let mut mind = AgentMind::new(Instincts::new(), 6);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::Replan);

    let (first, mut queue, _errors) = responder.await.unwrap();
    assert_eq!(
        first,
        Action::UseAbility {
            ship: burning,
            ability: 1
        }
    );

    // Same snapshot again: the only applicable ability is ruled out
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::AwaitNextState);
    assert_eq!(drain(&mut queue), vec![Action::DonePhase]);
}

#[tokio::test]
async fn test_rejected_done_asks_for_another_plan() {
    let mut state = BattleState::new(vec![Ship::new(PlayerSide::Host, "Idle", WeightClass::Light)], 100, 10);
    state.phase = Phase::Power;

    let (mut player, queue, errors, _state) = wire(&state);
    let responder = reject_first(queue, errors);

    let mut mind = AgentMind::new(Instincts::new(), 2);
    let flow = policy::dispatch(&mut player, &mut mind, &state).await.unwrap();
    assert_eq!(flow, Flow::Replan);
    let (first, _queue, _errors) = responder.await.unwrap();
    assert_eq!(first, Action::DonePhase);
}
