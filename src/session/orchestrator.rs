//! Session lifecycle
//!
//! A session owns the action queue, the per-side error channels, the shared
//! snapshot and the game-end signal. One applier worker consumes the queue
//! and applies a single action at a time, so every state transition is
//! linearizable no matter how many sources submit concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::battle::ai::instinct::Instincts;
use crate::battle::ai::runtime::AgentRuntime;
use crate::battle::rules::{ActionOutcome, GameEnd, RulesEngine};
use crate::battle::state::BattleState;
use crate::core::config::{AgentConfig, TacticsConfig};
use crate::core::error::{Result, TacticsError};
use crate::core::types::PlayerSide;
use crate::session::player::{PlayerHandle, Submission};

/// Channel ends handed to the applier on `start`
struct ApplierWiring {
    actions: mpsc::UnboundedReceiver<Submission>,
    state: watch::Sender<Arc<BattleState>>,
    errors: [mpsc::UnboundedSender<String>; 2],
    end: watch::Sender<Option<GameEnd>>,
}

pub struct Session {
    rules: Arc<dyn RulesEngine>,
    agent_config: AgentConfig,

    actions: Option<mpsc::UnboundedSender<Submission>>,
    state: watch::Receiver<Arc<BattleState>>,
    errors: [Option<mpsc::UnboundedReceiver<String>>; 2],
    end: watch::Receiver<Option<GameEnd>>,
    applier: Option<ApplierWiring>,

    workers: JoinSet<Result<()>>,
}

impl Session {
    pub fn new(rules: Arc<dyn RulesEngine>, initial: BattleState, config: &TacticsConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Arc::new(initial));
        let (host_error_tx, host_error_rx) = mpsc::unbounded_channel();
        let (guest_error_tx, guest_error_rx) = mpsc::unbounded_channel();
        let (end_tx, end_rx) = watch::channel(None);

        Self {
            rules,
            agent_config: config.agent.clone(),
            actions: Some(action_tx),
            state: state_rx,
            errors: [Some(host_error_rx), Some(guest_error_rx)],
            end: end_rx,
            applier: Some(ApplierWiring {
                actions: action_rx,
                state: state_tx,
                errors: [host_error_tx, guest_error_tx],
                end: end_tx,
            }),
            workers: JoinSet::new(),
        }
    }

    /// Claim the seat for `side`; each seat can be claimed once
    pub fn player(&mut self, side: PlayerSide) -> Result<PlayerHandle> {
        let actions = self
            .actions
            .clone()
            .ok_or_else(|| TacticsError::SessionClosed("claiming a seat".into()))?;
        let errors = self.errors[side.index()]
            .take()
            .ok_or(TacticsError::SideAlreadyClaimed(side))?;

        Ok(PlayerHandle::new(
            side,
            actions,
            errors,
            self.state.clone(),
            self.agent_config.rejection_timeout(),
        ))
    }

    /// Seat an agent runtime for `side`
    pub fn spawn_agent(&mut self, side: PlayerSide, instincts: Instincts, seed: u64) -> Result<()> {
        let player = self.player(side)?;
        let runtime = AgentRuntime::new(player, instincts, seed, self.agent_config.clone());
        self.workers.spawn(runtime.run());
        Ok(())
    }

    /// Start applying submitted actions
    pub fn start(&mut self) -> Result<()> {
        let wiring = self
            .applier
            .take()
            .ok_or_else(|| TacticsError::SessionClosed("starting twice".into()))?;
        self.workers.spawn(apply_actions(self.rules.clone(), wiring));
        tracing::info!("Session started");
        Ok(())
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<BattleState> {
        self.state.borrow().clone()
    }

    /// Game result, if the game is over
    pub fn result(&self) -> Option<GameEnd> {
        self.end.borrow().clone()
    }

    /// Wait for the game to end, at most `timeout`
    pub async fn wait_for_end(&mut self, timeout: Duration) -> Result<GameEnd> {
        let mut end = self.end.clone();
        let ended = tokio::time::timeout(timeout, end.wait_for(|e| e.is_some())).await;
        match ended {
            Ok(Ok(result)) => (*result)
                .clone()
                .ok_or_else(|| TacticsError::SessionClosed("reading the result".into())),
            Ok(Err(_)) => Err(TacticsError::SessionClosed("waiting for the game to end".into())),
            Err(_) => Err(TacticsError::Timeout(timeout)),
        }
    }

    /// Close the action path, then abort and join every worker
    ///
    /// Returns what workers failed with before they were stopped; workers
    /// cut short by the abort are not failures.
    pub async fn shutdown(&mut self) -> Vec<TacticsError> {
        self.actions = None;
        self.applier = None;
        self.workers.abort_all();

        let mut failures = Vec::new();
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(%error, "Session worker failed");
                    failures.push(error);
                }
                Err(join) if join.is_cancelled() => {}
                Err(join) => {
                    tracing::error!(error = %join, "Session worker panicked");
                    failures.push(join.into());
                }
            }
        }

        tracing::debug!(failures = failures.len(), "Session shut down");
        failures
    }
}

/// The single consumer of the action queue
async fn apply_actions(rules: Arc<dyn RulesEngine>, wiring: ApplierWiring) -> Result<()> {
    let ApplierWiring {
        mut actions,
        state,
        errors,
        end,
    } = wiring;

    while let Some(Submission { side, action }) = actions.recv().await {
        let current = state.borrow().clone();

        match rules.apply_action(side, &action, &current) {
            ActionOutcome::Accepted(next) => {
                let verdict = rules.check_victory(&next);
                tracing::trace!(side = ?side, action = action.kind(), version = next.version, "Accepted");
                state.send_replace(Arc::new(next));
                if let Some(result) = verdict {
                    finish(&end, result);
                    return Ok(());
                }
            }
            ActionOutcome::Rejected(message) => {
                tracing::debug!(side = ?side, action = action.kind(), %message, "Rejected");
                // A seat nobody claimed has no one to tell
                let _ = errors[side.index()].send(message);
            }
            ActionOutcome::GameEnd(result) => {
                finish(&end, result);
                return Ok(());
            }
        }
    }

    Ok(())
}

fn finish(end: &watch::Sender<Option<GameEnd>>, result: GameEnd) {
    tracing::info!(winner = ?result.winner, message = %result.message, "Game over");
    end.send_replace(Some(result));
}
