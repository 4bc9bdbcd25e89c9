//! Autonomous battle agent
//!
//! Architecture: data + policies
//! - Instincts hold the agent's fixed personality scalars
//! - Brain accumulates per-target attack priorities during one battle
//! - DecisionContext is the side-relative view a policy plans against
//! - AgentRuntime mirrors snapshots, feeds the brain and drives the policies

pub mod brain;
pub mod decision_context;
pub mod instinct;
pub mod policy;
pub mod runtime;

pub use brain::{Brain, BrainEntry, BrainKey, Neuron, NeuronId, StorageKey};
pub use decision_context::{AgentMind, DecisionContext};
pub use instinct::{load_instincts, InstinctKey, Instincts};
pub use policy::{Flow, PhaseScratch};
pub use runtime::{AgentRuntime, Readiness};
