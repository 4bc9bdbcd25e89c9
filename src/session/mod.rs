//! Session plumbing between players and the rules engine

pub mod orchestrator;
pub mod player;

pub use orchestrator::Session;
pub use player::{PlayerHandle, Submission, Verdict};
