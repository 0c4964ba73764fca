use crate::entity::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No local storage has been configured")]
    NotConfigured,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode command: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Peer {addr} unreachable")]
    Unreachable { addr: String },
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Robot '{identifier}' already registered")]
    DuplicateRobot { identifier: String },

    #[error("A local robot is already registered")]
    LocalRobotExists,

    #[error("No local robot has been registered")]
    NoLocalRobot,

    #[error("Cannot {action} while in stage {from:?}")]
    InvalidTransition { from: Stage, action: &'static str },

    #[error("Player '{name}' already registered")]
    DuplicatePlayer { name: String },

    #[error("Player '{name}' not found")]
    UnknownPlayer { name: String },

    #[error("Robot '{identifier}' not found")]
    UnknownRobot { identifier: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Node event loop is no longer running")]
    ChannelClosed,
}

pub type NodeResult<T> = Result<T, NodeError>;
