//! Self-play tournament over a population of instinct vectors

pub mod population;
pub mod trial;

pub use population::generate_population;
pub use trial::{run_trial, Tournament, TournamentResult, TrialOutcome, WinMatrix};
