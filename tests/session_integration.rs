//! Session and self-play integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_tactics::battle::ai::{InstinctKey, Instincts};
use fleet_tactics::battle::{
    Action, ActionOutcome, BattleState, ChatEvent, GameEnd, Phase, RulesEngine, Scenario, Ship, SkirmishRules,
    WeightClass,
};
use fleet_tactics::core::config::TacticsConfig;
use fleet_tactics::core::error::TacticsError;
use fleet_tactics::core::types::{PlayerSide, Vec2};
use fleet_tactics::session::Session;
use fleet_tactics::tournament::{run_trial, TrialOutcome};

fn quick_config() -> TacticsConfig {
    let mut config = TacticsConfig::default();
    config.session.max_turns = 4;
    config.session.game_timeout_secs = 30;
    config
}

#[tokio::test]
async fn test_external_disconnect_ends_the_game() {
    let config = quick_config();
    let mut session = Session::new(
        Arc::new(SkirmishRules),
        Scenario::skirmish(config.session.max_turns).initial_state(),
        &config,
    );
    let guest = session.player(PlayerSide::Guest).unwrap();
    session.start().unwrap();

    guest.submit(Action::Disconnect).unwrap();
    let end = session.wait_for_end(Duration::from_secs(5)).await.unwrap();
    assert_eq!(end.winner, Some(PlayerSide::Host));
    assert_eq!(session.result(), Some(end));

    session.shutdown().await;
    // The action path is closed once the game is over
    assert!(guest.submit(Action::DonePhase).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_agent_against_idle_human_keeps_waiting() {
    let config = quick_config();
    let mut session = Session::new(
        Arc::new(SkirmishRules),
        Scenario::skirmish(config.session.max_turns).initial_state(),
        &config,
    );
    let human = session.player(PlayerSide::Guest).unwrap();
    session
        .spawn_agent(PlayerSide::Host, Instincts::random(&InstinctKey::ALL, &mut rand::thread_rng()), 5)
        .unwrap();
    session.start().unwrap();

    // The agent deploys and passes, then waits on the human
    let waited = session.wait_for_end(Duration::from_millis(500)).await;
    assert!(waited.is_err());
    let snapshot = human.snapshot();
    assert!(snapshot.is_done(PlayerSide::Host));
    assert!(snapshot.ships_of(PlayerSide::Host).any(|s| s.is_deployed()));

    session.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_identical_profiles_finish_a_full_trial() {
    let config = quick_config();
    let profile = Instincts::from_values([
        (InstinctKey::CombatAvengeAttacks, 2.5),
        (InstinctKey::MoveAggression, 0.8),
    ]);

    let outcome = run_trial(
        Arc::new(SkirmishRules),
        &Scenario::skirmish(config.session.max_turns),
        &config,
        profile.clone(),
        profile,
        99,
    )
    .await
    .expect("trial should finish");

    assert!(matches!(
        outcome,
        TrialOutcome::HostWin | TrialOutcome::GuestWin | TrialOutcome::Draw
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_self_play_reaches_a_real_result_before_timeout() {
    let config = quick_config();
    let mut session = Session::new(
        Arc::new(SkirmishRules),
        Scenario::skirmish(config.session.max_turns).initial_state(),
        &config,
    );
    let mut rng = rand::thread_rng();
    session
        .spawn_agent(PlayerSide::Host, Instincts::random(&InstinctKey::ALL, &mut rng), 1)
        .unwrap();
    session
        .spawn_agent(PlayerSide::Guest, Instincts::random(&InstinctKey::ALL, &mut rng), 2)
        .unwrap();
    session.start().unwrap();

    // A game result, not a timeout: agents must never stall each other
    let end = session
        .wait_for_end(config.session.game_timeout())
        .await
        .expect("game should end on its own");
    assert!(!end.message.is_empty());

    let state = session.snapshot();
    assert!(state.turn >= 1 || end.winner.is_some());
    assert!(session.shutdown().await.is_empty());
}

/// Skirmish rules that turn down the host's first "done" of the power phase,
/// slowly enough that the rejection lands after the agent stopped waiting
struct SlowFirstRefusal {
    delay: Duration,
    refused: AtomicBool,
}

impl RulesEngine for SlowFirstRefusal {
    fn apply_action(&self, side: PlayerSide, action: &Action, state: &BattleState) -> ActionOutcome {
        let first_power_done =
            side == PlayerSide::Host && state.phase == Phase::Power && *action == Action::DonePhase;
        if first_power_done && !self.refused.swap(true, Ordering::SeqCst) {
            std::thread::sleep(self.delay);
            return ActionOutcome::Rejected("reactor still spinning up".into());
        }
        SkirmishRules.apply_action(side, action, state)
    }

    fn check_victory(&self, state: &BattleState) -> Option<GameEnd> {
        SkirmishRules.check_victory(state)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejection_after_the_wait_does_not_freeze_the_turn() {
    let config = quick_config();
    let rules = Arc::new(SlowFirstRefusal {
        delay: config.agent.rejection_timeout() * 3,
        refused: AtomicBool::new(false),
    });
    let mut session = Session::new(
        rules.clone(),
        Scenario::skirmish(config.session.max_turns).initial_state(),
        &config,
    );
    let mut rng = rand::thread_rng();
    session
        .spawn_agent(PlayerSide::Host, Instincts::random(&InstinctKey::ALL, &mut rng), 11)
        .unwrap();
    session
        .spawn_agent(PlayerSide::Guest, Instincts::random(&InstinctKey::ALL, &mut rng), 12)
        .unwrap();
    session.start().unwrap();

    let ended = session.wait_for_end(config.session.game_timeout()).await;
    session.shutdown().await;

    assert!(rules.refused.load(Ordering::SeqCst));
    let end = ended.expect("the host should decide again after the late rejection");
    assert!(!end.message.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_agent_failure_is_reported_then_forfeits() {
    let config = quick_config();
    let mut hurt = Ship::new(PlayerSide::Host, "Hurt", WeightClass::Light);
    hurt.position = Some(Vec2::new(30.0, 10.0));
    hurt.fire_stacks = 1;
    let mut enemy = Ship::new(PlayerSide::Guest, "Enemy", WeightClass::Medium);
    enemy.position = Some(Vec2::new(30.0, 50.0));
    let mut initial = BattleState::new(vec![hurt, enemy], 100, config.session.max_turns);
    initial.phase = Phase::Move;
    initial.phase_seq = 1;

    let mut session = Session::new(Arc::new(SkirmishRules), initial, &config);
    let _guest = session.player(PlayerSide::Guest).unwrap();
    // No usable weight for picking which ship moves
    session
        .spawn_agent(
            PlayerSide::Host,
            Instincts::from_values([(InstinctKey::MoveSufferingBias, f64::NAN)]),
            3,
        )
        .unwrap();
    session.start().unwrap();

    let end = session.wait_for_end(Duration::from_secs(5)).await.unwrap();
    assert_eq!(end.winner, Some(PlayerSide::Guest));

    let reported = session.snapshot().chat.iter().any(|entry| {
        entry.sender == Some(PlayerSide::Host)
            && matches!(&entry.event, ChatEvent::Message(text) if text.starts_with("agent error:"))
    });
    assert!(reported);

    let failures = session.shutdown().await;
    assert!(matches!(failures.as_slice(), [TacticsError::EmptyDistribution]), "{:?}", failures);
}
