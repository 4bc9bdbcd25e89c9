use thiserror::Error;

use crate::core::types::PlayerSide;

#[derive(Error, Debug)]
pub enum TacticsError {
    #[error("Selection requested on an effectively empty distribution")]
    EmptyDistribution,

    #[error("Cannot build a basis of non-positive dimension ({0})")]
    InvalidDimension(usize),

    #[error("Brain codec error for {key}: {message}")]
    BrainCodec { key: String, message: String },

    #[error("Session closed while {0}")]
    SessionClosed(String),

    #[error("Player handle for {0:?} was already claimed")]
    SideAlreadyClaimed(PlayerSide),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Worker task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, TacticsError>;
