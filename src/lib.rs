//! Fleet Tactics - autonomous battle agent and self-play instinct tournament

pub mod battle;
pub mod core;
pub mod math;
pub mod session;
pub mod tournament;
