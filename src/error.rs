use crate::types::Rank;

pub type Result<T> = std::result::Result<T, RedistError>;

#[derive(Debug, thiserror::Error)]
pub enum RedistError {
    #[error("{operation} with rank {rank} failed: {reason}")]
    Transport {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("payload encode failed: {0}")]
    EncodeFailed(String),

    #[error("payload decode failed: {0}")]
    DecodeFailed(String),

    #[error("invalid value {value:?} for property {key}")]
    InvalidProperty { key: &'static str, value: String },

    #[error("transport threading unavailable: {0}")]
    Threading(String),

    #[error("partition storage error: {0}")]
    Partition(String),
}

impl RedistError {
    /// Create a `Transport` error for a failed operation with a peer.
    pub fn transport(operation: &'static str, rank: Rank, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            rank,
            reason: reason.into(),
        }
    }
}
