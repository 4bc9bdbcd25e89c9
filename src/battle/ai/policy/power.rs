//! Power allocation has no choices yet; the phase is passed straight away

use crate::battle::ai::policy::{finish_phase, Flow};
use crate::core::error::Result;
use crate::session::player::PlayerHandle;

pub async fn run(player: &mut PlayerHandle) -> Result<Flow> {
    finish_phase(player).await
}
