//! MPI transport backend.
//!
//! Requires the `mpi` feature and an MPI installation. The caller owns
//! MPI initialization and must request `Threading::Multiple` so transport
//! calls may be issued from worker threads; the universe must outlive the
//! transport:
//!
//! ```ignore
//! let (_universe, threading) =
//!     mpi::initialize_with_threading(mpi::Threading::Multiple).expect("MPI init failed");
//! let transport = MpiTransport::new(threading);
//! ```
//!
//! Reduce and broadcast map to native collectives (they run in the
//! single-threaded probe phase). The gather and all partition payloads go
//! over tagged point-to-point transfers: collectives cannot be issued
//! concurrently on one communicator, and worker threads interleave
//! freely.

use mpi::collective::SystemOperation;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Threading;

use super::Transport;
use crate::error::{RedistError, Result};
use crate::types::{Rank, Tag};

/// MPI-backed transport over the world communicator.
pub struct MpiTransport {
    threading: Threading,
}

impl MpiTransport {
    /// Wrap the world communicator. `threading` is the level actually
    /// secured by `mpi::initialize_with_threading`.
    pub fn new(threading: Threading) -> Self {
        Self { threading }
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> Rank {
        SimpleCommunicator::world().rank() as Rank
    }

    fn executors(&self) -> u32 {
        SimpleCommunicator::world().size() as u32
    }

    fn enable_cores(&self) -> Result<usize> {
        if self.threading != Threading::Multiple {
            return Err(RedistError::Threading(format!(
                "MPI threading level {:?} does not permit concurrent transport calls",
                self.threading
            )));
        }
        Ok(std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1))
    }

    fn reduce_sum_i64(&self, buf: &mut [i64], root: Rank) -> Result<()> {
        let world = SimpleCommunicator::world();
        let send = buf.to_vec();
        let root_process = world.process_at_rank(root as i32);
        if world.rank() == root as i32 {
            root_process.reduce_into_root(&send[..], buf, SystemOperation::sum());
        } else {
            root_process.reduce_into(&send[..], SystemOperation::sum());
        }
        Ok(())
    }

    fn bcast_u8(&self, value: &mut u8, root: Rank) -> Result<()> {
        SimpleCommunicator::world()
            .process_at_rank(root as i32)
            .broadcast_into(value);
        Ok(())
    }

    fn sendrecv_u8(&self, send: u8, peer: Rank, tag: Tag) -> Result<u8> {
        let buf = self.sendrecv_bytes(vec![send], peer, tag)?;
        buf.first()
            .copied()
            .ok_or_else(|| RedistError::transport("sendrecv", peer, "empty payload"))
    }

    fn send_bytes(&self, buf: Vec<u8>, peer: Rank, tag: Tag) -> Result<()> {
        SimpleCommunicator::world()
            .process_at_rank(peer as i32)
            .send_with_tag(&buf[..], tag as i32);
        Ok(())
    }

    fn recv_bytes(&self, peer: Rank, tag: Tag) -> Result<Vec<u8>> {
        let (data, _status) = SimpleCommunicator::world()
            .process_at_rank(peer as i32)
            .receive_vec_with_tag::<u8>(tag as i32);
        Ok(data)
    }

    fn sendrecv_bytes(&self, send: Vec<u8>, peer: Rank, tag: Tag) -> Result<Vec<u8>> {
        let world = SimpleCommunicator::world();
        let process = world.process_at_rank(peer as i32);
        let data = mpi::request::scope(|scope| {
            let request = process.immediate_send_with_tag(scope, &send[..], tag as i32);
            let (data, _status) = process.receive_vec_with_tag::<u8>(tag as i32);
            request.wait();
            data
        });
        Ok(data)
    }

    fn gather_bytes(&self, contrib: Vec<u8>, root: Rank, tag: Tag) -> Result<Option<Vec<Vec<u8>>>> {
        let world = SimpleCommunicator::world();
        if world.rank() == root as i32 {
            let size = world.size() as usize;
            let mut contribs = vec![Vec::new(); size];
            contribs[root as usize] = contrib;
            for src in 0..size {
                if src == root as usize {
                    continue;
                }
                let (data, _status) = world
                    .process_at_rank(src as i32)
                    .receive_vec_with_tag::<u8>(tag as i32);
                contribs[src] = data;
            }
            Ok(Some(contribs))
        } else {
            world
                .process_at_rank(root as i32)
                .send_with_tag(&contrib[..], tag as i32);
            Ok(None)
        }
    }
}
