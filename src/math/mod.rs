//! Numeric helpers shared by the decision policies and the tournament sampler

pub mod basis;
pub mod weighted;

pub use basis::{dot, gaussian, norm, normalize, project, random_orthonormal_basis};
pub use weighted::{weighted_pick, weighted_pick_required, PICK_EPSILON};
