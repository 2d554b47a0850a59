pub mod config;
pub mod error;
pub mod exchange;
pub mod pool;
pub mod storage;
pub mod transport;
pub mod types;

pub use config::{Properties, EXCHANGE_TYPE};
pub use error::{RedistError, Result};
pub use exchange::{exchange, select_mode};
pub use pool::{LoopSync, ParallelLoop};
pub use storage::{Partition, PartitionGroup};
pub use transport::local::{LocalCluster, LocalTransport};
#[cfg(feature = "mpi")]
pub use transport::mpi::MpiTransport;
pub use transport::{Element, Transport};
pub use types::{ExchangeMode, Rank, Tag};
