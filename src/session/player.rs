//! One side's connection to a session
//!
//! A `PlayerHandle` carries the three data paths of a seat: outgoing actions,
//! incoming rejection messages, and a read view of the latest snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::battle::action::Action;
use crate::battle::state::BattleState;
use crate::core::error::{Result, TacticsError};
use crate::core::types::PlayerSide;

/// An action tagged with the seat that sent it
#[derive(Debug, Clone)]
pub struct Submission {
    pub side: PlayerSide,
    pub action: Action,
}

/// What became of a checked submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Seen accepted, or no rejection arrived in time
    Accepted,
    Rejected(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

pub struct PlayerHandle {
    side: PlayerSide,
    actions: mpsc::UnboundedSender<Submission>,
    errors: mpsc::UnboundedReceiver<String>,
    state: watch::Receiver<Arc<BattleState>>,
    rejection_timeout: Duration,
}

impl PlayerHandle {
    pub fn new(
        side: PlayerSide,
        actions: mpsc::UnboundedSender<Submission>,
        errors: mpsc::UnboundedReceiver<String>,
        state: watch::Receiver<Arc<BattleState>>,
        rejection_timeout: Duration,
    ) -> Self {
        Self {
            side,
            actions,
            errors,
            state,
            rejection_timeout,
        }
    }

    pub fn side(&self) -> PlayerSide {
        self.side
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<BattleState> {
        self.state.borrow().clone()
    }

    /// Independent receiver of the snapshot stream
    pub fn subscribe(&self) -> watch::Receiver<Arc<BattleState>> {
        self.state.clone()
    }

    /// Fire and forget
    pub fn submit(&self, action: Action) -> Result<()> {
        tracing::debug!(side = ?self.side, action = action.kind(), "Submitting");
        self.actions
            .send(Submission {
                side: self.side,
                action,
            })
            .map_err(|_| TacticsError::SessionClosed("submitting an action".into()))
    }

    /// Submit and wait briefly to learn whether the action was rejected
    ///
    /// Resolves as soon as either a rejection arrives or a snapshot shows
    /// this side's accepted-action counter moving. If neither happens within
    /// the rejection timeout the action is assumed accepted.
    pub async fn submit_checked(&mut self, action: Action) -> Result<Verdict> {
        // Rejections of earlier fire-and-forget submissions are stale now
        while self.errors.try_recv().is_ok() {}

        let side = self.side;
        let mut state = self.state.clone();
        let before = state.borrow_and_update().accepted_actions(side);

        self.submit(action)?;

        let errors = &mut self.errors;
        let wait = async move {
            loop {
                tokio::select! {
                    biased;
                    message = errors.recv() => {
                        return match message {
                            Some(message) => Ok(Verdict::Rejected(message)),
                            None => Err(TacticsError::SessionClosed("awaiting a verdict".into())),
                        };
                    }
                    changed = state.changed() => {
                        if changed.is_err() {
                            return Err(TacticsError::SessionClosed("awaiting a verdict".into()));
                        }
                        if state.borrow_and_update().accepted_actions(side) > before {
                            return Ok(Verdict::Accepted);
                        }
                    }
                }
            }
        };

        match tokio::time::timeout(self.rejection_timeout, wait).await {
            Ok(verdict) => verdict,
            Err(_) => Ok(Verdict::Accepted),
        }
    }

    /// Next rejection message, if the session is still open
    pub async fn next_error(&mut self) -> Option<String> {
        self.errors.recv().await
    }
}
