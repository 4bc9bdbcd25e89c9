//! The always-running agent process for one side
//!
//! A tracker worker mirrors the snapshot stream. It forwards newly appended
//! log entries as events and publishes the newest readiness on a conflating
//! watch channel. The runtime loop owns the brain: it learns from every
//! event, and when the latest snapshot says it is this side's turn (and is
//! newer than the one it last decided on) it runs the phase policy. A
//! rejection that shows up after the policy stopped waiting for it puts the
//! same snapshot back up for decision.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::battle::action::Action;
use crate::battle::ai::brain::{ATTACK_PRIORITY, HITS_TAKEN, SHIPS_LOST};
use crate::battle::ai::decision_context::AgentMind;
use crate::battle::ai::instinct::{InstinctKey, Instincts};
use crate::battle::ai::policy::{self, Flow};
use crate::battle::state::{BattleState, ChatEntry, ChatEvent};
use crate::core::config::AgentConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{PlayerSide, ShipId};
use crate::session::player::PlayerHandle;

/// Focus-fire increment per own hit, scaled by the instinct
const FOCUS_FIRE_STEP: f64 = 0.1;

/// Damage that counts as one full unit of grievance
const DAMAGE_PER_GRIEVANCE: f64 = 10.0;

/// Newest snapshot plus whether this side may act on it
#[derive(Debug, Clone)]
pub struct Readiness {
    pub snapshot: Arc<BattleState>,
    pub my_turn: bool,
}

impl Readiness {
    fn of(side: PlayerSide, snapshot: Arc<BattleState>) -> Self {
        let my_turn = snapshot.is_turn_of(side);
        Self { snapshot, my_turn }
    }
}

pub struct AgentRuntime {
    player: PlayerHandle,
    mind: AgentMind,
    config: AgentConfig,
}

impl AgentRuntime {
    pub fn new(player: PlayerHandle, instincts: Instincts, seed: u64, config: AgentConfig) -> Self {
        Self {
            player,
            mind: AgentMind::new(instincts, seed),
            config,
        }
    }

    /// Play until the session goes away
    ///
    /// Failures are reported in chat followed by a disconnect, so the other
    /// side sees a forfeit instead of a stalled turn.
    pub async fn run(self) -> Result<()> {
        let Self {
            mut player,
            mut mind,
            config,
        } = self;
        let side = player.side();
        tracing::info!(side = ?side, "Agent starting");

        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (ready_tx, mut readiness) = watch::channel(Readiness::of(side, player.snapshot()));
        // Aborted on drop, so cancelling the agent cancels its tracker
        let mut tracker = JoinSet::new();
        tracker.spawn(track(side, player.subscribe(), event_tx, ready_tx));

        let result = drive(&mut player, &mut mind, &config, &mut events, &mut readiness).await;
        tracker.shutdown().await;

        match result {
            Ok(()) | Err(TacticsError::SessionClosed(_)) => {
                tracing::info!(side = ?side, brain_entries = mind.brain.len(), "Agent finished");
                Ok(())
            }
            Err(error) => {
                tracing::error!(side = ?side, %error, "Agent failed, disconnecting");
                let _ = player.submit(Action::Chat(format!("agent error: {}", error)));
                let _ = player.submit(Action::Disconnect);
                Err(error)
            }
        }
    }
}

/// Mirror snapshots into events and readiness until the stream ends
async fn track(
    side: PlayerSide,
    mut state: watch::Receiver<Arc<BattleState>>,
    events: mpsc::UnboundedSender<ChatEntry>,
    readiness: watch::Sender<Readiness>,
) {
    let mut forwarded = 0;
    loop {
        let snapshot = state.borrow_and_update().clone();
        for entry in snapshot.chat.iter().skip(forwarded) {
            if events.send(entry.clone()).is_err() {
                return;
            }
        }
        forwarded = snapshot.chat.len();
        readiness.send_replace(Readiness::of(side, snapshot));

        if state.changed().await.is_err() {
            return;
        }
    }
}

async fn drive(
    player: &mut PlayerHandle,
    mind: &mut AgentMind,
    config: &AgentConfig,
    events: &mut mpsc::UnboundedReceiver<ChatEntry>,
    readiness: &mut watch::Receiver<Readiness>,
) -> Result<()> {
    let side = player.side();
    let mut last_decided: Option<u64> = None;
    // (snapshot version, late rejections seen on it)
    let mut late_rejections = (0, 0);

    loop {
        tokio::select! {
            biased;
            entry = events.recv() => match entry {
                Some(entry) => learn(mind, side, &player.snapshot(), &entry)?,
                None => return Ok(()),
            },
            message = player.next_error() => match message {
                Some(message) => {
                    let latest = player.snapshot();
                    if latest.is_turn_of(side) && last_decided.is_some_and(|v| latest.version <= v) {
                        if late_rejections.0 != latest.version {
                            late_rejections = (latest.version, 0);
                        }
                        late_rejections.1 += 1;
                        if late_rejections.1 <= config.max_replans {
                            tracing::warn!(
                                side = ?side,
                                version = latest.version,
                                %message,
                                "Late rejection, deciding again"
                            );
                            last_decided = None;
                        } else {
                            tracing::warn!(side = ?side, %message, "Late rejection ignored, too many on this snapshot");
                        }
                    }
                }
                None => return Ok(()),
            },
            changed = readiness.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
        }

        // Brain first, so decisions see every event up to now
        let latest = player.snapshot();
        while let Ok(entry) = events.try_recv() {
            learn(mind, side, &latest, &entry)?;
        }

        if !readiness.borrow_and_update().my_turn {
            continue;
        }

        // Readiness may lag behind what this side already acted on
        let latest = player.snapshot();
        if !latest.is_turn_of(side) || last_decided.is_some_and(|v| latest.version <= v) {
            continue;
        }
        last_decided = Some(act(player, mind, config, latest).await?);
    }
}

/// Run policies on one snapshot, re-planning on rejection; returns the
/// version of the last snapshot a decision was made on
async fn act(
    player: &mut PlayerHandle,
    mind: &mut AgentMind,
    config: &AgentConfig,
    mut snapshot: Arc<BattleState>,
) -> Result<u64> {
    for _ in 0..=config.max_replans {
        match policy::dispatch(player, mind, &snapshot).await? {
            Flow::AwaitNextState => return Ok(snapshot.version),
            Flow::Replan => {
                let latest = player.snapshot();
                if !latest.is_turn_of(player.side()) {
                    return Ok(latest.version);
                }
                snapshot = latest;
            }
        }
    }

    tracing::warn!(
        side = ?player.side(),
        phase = ?snapshot.phase,
        replans = config.max_replans,
        "Too many rejections, ending phase"
    );
    policy::finish_phase(player).await?;
    Ok(snapshot.version)
}

fn owner_is(state: &BattleState, ship: ShipId, side: PlayerSide) -> bool {
    state.ship(ship).is_some_and(|s| s.owner == side)
}

/// Update the brain from one battle log entry
pub fn learn(mind: &mut AgentMind, side: PlayerSide, state: &BattleState, entry: &ChatEntry) -> Result<()> {
    let enemy = side.opponent();

    match &entry.event {
        ChatEvent::ShipIdentified { ship, owner } if *owner == enemy => {
            let sighting = mind.instinct(InstinctKey::CombatFirstSighting);
            mind.brain.adjust(&ATTACK_PRIORITY.for_target(*ship), sighting)?;
        }
        ChatEvent::ShipAttacked {
            attacker,
            target,
            damage,
        } => {
            if owner_is(state, *target, side) && owner_is(state, *attacker, enemy) {
                let avenge = mind.instinct(InstinctKey::CombatAvengeAttacks);
                let grievance = avenge * *damage as f64 / DAMAGE_PER_GRIEVANCE;
                mind.brain.adjust(&ATTACK_PRIORITY.for_target(*attacker), grievance)?;
                mind.brain.bump(&HITS_TAKEN.for_target(*attacker))?;
            } else if owner_is(state, *attacker, side) && owner_is(state, *target, enemy) {
                let focus = mind.instinct(InstinctKey::CombatFocusFire);
                mind.brain
                    .adjust(&ATTACK_PRIORITY.for_target(*target), focus * FOCUS_FIRE_STEP)?;
            }
        }
        ChatEvent::AttackFailed {
            attacker,
            target: Some(target),
        } if owner_is(state, *attacker, side) => {
            let frustration = mind.instinct(InstinctKey::CombatFrustration);
            mind.brain.adjust(&ATTACK_PRIORITY.for_target(*target), -frustration)?;
        }
        ChatEvent::ShipDestroyed { ship, by } if owner_is(state, *ship, side) => {
            let lost = mind.brain.bump(&SHIPS_LOST.key())?;
            tracing::debug!(side = ?side, %ship, lost, "Lost a ship");
            if let Some(killer) = by.filter(|k| owner_is(state, *k, enemy)) {
                let avenge = mind.instinct(InstinctKey::CombatAvengeAttacks);
                mind.brain.adjust(&ATTACK_PRIORITY.for_target(killer), avenge)?;
            }
        }
        ChatEvent::ShipEscaped { ship } if owner_is(state, *ship, enemy) => {
            mind.brain.set(&ATTACK_PRIORITY.for_target(*ship), 0.0)?;
        }
        _ => {}
    }

    Ok(())
}
