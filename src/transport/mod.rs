//! Transport capability consumed by the exchange core.
//!
//! The communicator is wrapped as an opaque capability: topology queries,
//! the control-plane collectives of the sparsity probe, and byte-level
//! point-to-point transfers. Partition-aware operations sit on top as
//! free functions generic over the element type, serializing elements
//! with bincode.
//!
//! Collectives cannot be issued concurrently on one communicator, and the
//! exchange drives many partitions from worker threads at once, so the
//! gather is keyed by a caller-supplied tag and backends realize it over
//! tagged point-to-point transfers. Matching then never depends on thread
//! interleaving.

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RedistError, Result};
use crate::storage::Partition;
use crate::types::{Rank, Tag};

/// Element types a partition can carry across the transport.
pub trait Element: Serialize + DeserializeOwned + Send + 'static {}

impl<T: Serialize + DeserializeOwned + Send + 'static> Element for T {}

/// Blocking communicator capability.
///
/// All operations may be called from worker threads once `enable_cores`
/// has succeeded. Collective operations (`reduce_sum_i64`, `bcast_u8`,
/// `gather_bytes`) must be issued by every rank.
pub trait Transport: Send + Sync {
    /// This process's rank (0-indexed).
    fn rank(&self) -> Rank;

    /// Number of executor processes in the communicator.
    fn executors(&self) -> u32;

    /// Whether this process is `root`.
    fn is_root(&self, root: Rank) -> bool {
        self.rank() == root
    }

    /// Secure a threading level that permits transport calls from worker
    /// threads; returns the number of concurrent transport lanes.
    fn enable_cores(&self) -> Result<usize>;

    /// Element-wise sum reduction of `buf` to `root`, in place at the
    /// root. Contents on other ranks are unspecified afterwards.
    fn reduce_sum_i64(&self, buf: &mut [i64], root: Rank) -> Result<()>;

    /// Broadcast one byte from `root`.
    fn bcast_u8(&self, value: &mut u8, root: Rank) -> Result<()>;

    /// Blocking matched one-byte exchange with `peer`.
    fn sendrecv_u8(&self, send: u8, peer: Rank, tag: Tag) -> Result<u8>;

    fn send_bytes(&self, buf: Vec<u8>, peer: Rank, tag: Tag) -> Result<()>;

    fn recv_bytes(&self, peer: Rank, tag: Tag) -> Result<Vec<u8>>;

    /// Blocking matched pair: send `send` to `peer` and receive the
    /// peer's payload on the same tag.
    fn sendrecv_bytes(&self, send: Vec<u8>, peer: Rank, tag: Tag) -> Result<Vec<u8>>;

    /// Collective gather keyed by `tag`: every rank contributes one
    /// payload, the root receives all of them ordered by rank (`None`
    /// elsewhere).
    fn gather_bytes(&self, contrib: Vec<u8>, root: Rank, tag: Tag) -> Result<Option<Vec<Vec<u8>>>>;
}

pub(crate) fn encode_elements<T: Element>(elems: &[T]) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(elems, bincode::config::standard())
        .map_err(|e| RedistError::EncodeFailed(e.to_string()))
}

pub(crate) fn decode_elements<T: Element>(buf: &[u8]) -> Result<Vec<T>> {
    let (elems, _) = bincode::serde::decode_from_slice(buf, bincode::config::standard())
        .map_err(|e| RedistError::DecodeFailed(e.to_string()))?;
    Ok(elems)
}

/// Send every element of `part` to `peer`. The caller drains the slot
/// afterwards; the partition itself is not modified.
pub fn send_partition<C, T>(comm: &C, part: &Partition<T>, peer: Rank, tag: Tag) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    comm.send_bytes(encode_elements(part.elements())?, peer, tag)
}

/// Receive one partition payload from `peer` and append it to `part`.
pub fn recv_partition<C, T>(comm: &C, part: &mut Partition<T>, peer: Rank, tag: Tag) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    let buf = comm.recv_bytes(peer, tag)?;
    part.extend(decode_elements::<T>(&buf)?);
    Ok(())
}

/// Matched pairwise transfer: send `send` to `peer` while receiving the
/// peer's payload into `recv`.
pub fn send_recv_partition<C, T>(
    comm: &C,
    send: &Partition<T>,
    recv: &mut Partition<T>,
    peer: Rank,
    tag: Tag,
) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    let buf = comm.sendrecv_bytes(encode_elements(send.elements())?, peer, tag)?;
    recv.extend(decode_elements::<T>(&buf)?);
    Ok(())
}

/// Collective gather of one partition to `root`: the root's partition
/// becomes the concatenation of every rank's elements in rank order;
/// other ranks contribute and drain.
pub fn gather_partition<C, T>(comm: &C, part: &mut Partition<T>, root: Rank, tag: Tag) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    let contrib = encode_elements(part.elements())?;
    match comm.gather_bytes(contrib, root, tag)? {
        Some(contribs) => {
            let mut merged = Vec::new();
            for buf in &contribs {
                merged.extend(decode_elements::<T>(buf)?);
            }
            *part = Partition::from(merged);
        }
        None => part.clear(),
    }
    Ok(())
}
