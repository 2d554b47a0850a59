//! In-process cluster transport.
//!
//! Wires `world_size` ranks inside one process through unbounded
//! per-`(src, dst, tag)` channels. Sends never block; receives block with
//! a timeout so a mismatched exchange fails instead of hanging. This is
//! the test substrate and the single-process development backend. The
//! wire behavior (payload framing, tag matching, rank-ordered gather)
//! mirrors the MPI backend.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;

use super::{decode_elements, encode_elements, Transport};
use crate::error::{RedistError, Result};
use crate::types::{Rank, Tag};

/// Reserved tag lane for reduce/broadcast control traffic. User tags must
/// stay below this value.
const CONTROL_TAG: Tag = u32::MAX;

const DEFAULT_CORES: usize = 2;
const RECV_TIMEOUT: Duration = Duration::from_secs(30);

type LaneKey = (Rank, Rank, Tag);
type Lane = (Sender<Vec<u8>>, Receiver<Vec<u8>>);

struct Mesh {
    lanes: DashMap<LaneKey, Lane>,
}

impl Mesh {
    fn sender(&self, key: LaneKey) -> Sender<Vec<u8>> {
        self.lanes.entry(key).or_insert_with(unbounded).0.clone()
    }

    fn receiver(&self, key: LaneKey) -> Receiver<Vec<u8>> {
        self.lanes.entry(key).or_insert_with(unbounded).1.clone()
    }
}

/// One rank's endpoint in an in-process cluster.
pub struct LocalTransport {
    rank: Rank,
    world: u32,
    cores: usize,
    recv_timeout: Duration,
    mesh: Arc<Mesh>,
}

/// Bootstraps in-process clusters, one [`LocalTransport`] per rank.
pub struct LocalCluster;

impl LocalCluster {
    /// Wire up `world_size` ranks in this process.
    pub fn bootstrap(world_size: u32) -> Vec<LocalTransport> {
        Self::bootstrap_with_cores(world_size, DEFAULT_CORES)
    }

    /// Same, with an explicit per-rank worker lane count.
    pub fn bootstrap_with_cores(world_size: u32, cores: usize) -> Vec<LocalTransport> {
        let mesh = Arc::new(Mesh {
            lanes: DashMap::new(),
        });
        (0..world_size)
            .map(|rank| LocalTransport {
                rank,
                world: world_size,
                cores: cores.max(1),
                recv_timeout: RECV_TIMEOUT,
                mesh: Arc::clone(&mesh),
            })
            .collect()
    }
}

impl LocalTransport {
    fn check_peer(&self, peer: Rank) -> Result<()> {
        if peer >= self.world {
            return Err(RedistError::InvalidRank {
                rank: peer,
                world_size: self.world,
            });
        }
        Ok(())
    }

    fn push(&self, dst: Rank, tag: Tag, buf: Vec<u8>) -> Result<()> {
        self.mesh
            .sender((self.rank, dst, tag))
            .send(buf)
            .map_err(|_| RedistError::PeerDisconnected { rank: dst })
    }

    fn pull(&self, src: Rank, tag: Tag) -> Result<Vec<u8>> {
        let rx = self.mesh.receiver((src, self.rank, tag));
        rx.recv_timeout(self.recv_timeout)
            .map_err(|e| RedistError::transport("recv", src, e.to_string()))
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn executors(&self) -> u32 {
        self.world
    }

    fn enable_cores(&self) -> Result<usize> {
        Ok(self.cores)
    }

    fn reduce_sum_i64(&self, buf: &mut [i64], root: Rank) -> Result<()> {
        self.check_peer(root)?;
        if self.rank == root {
            for src in 0..self.world {
                if src == root {
                    continue;
                }
                let bytes = self.pull(src, CONTROL_TAG)?;
                let contrib: Vec<i64> = decode_elements(&bytes)?;
                if contrib.len() != buf.len() {
                    return Err(RedistError::transport(
                        "reduce",
                        src,
                        format!("expected {} values, got {}", buf.len(), contrib.len()),
                    ));
                }
                for (acc, v) in buf.iter_mut().zip(contrib) {
                    *acc += v;
                }
            }
            Ok(())
        } else {
            self.push(root, CONTROL_TAG, encode_elements(buf)?)
        }
    }

    fn bcast_u8(&self, value: &mut u8, root: Rank) -> Result<()> {
        self.check_peer(root)?;
        if self.rank == root {
            for dst in 0..self.world {
                if dst != root {
                    self.push(dst, CONTROL_TAG, vec![*value])?;
                }
            }
            Ok(())
        } else {
            let bytes = self.pull(root, CONTROL_TAG)?;
            *value = *bytes
                .first()
                .ok_or_else(|| RedistError::transport("bcast", root, "empty payload"))?;
            Ok(())
        }
    }

    fn sendrecv_u8(&self, send: u8, peer: Rank, tag: Tag) -> Result<u8> {
        let buf = self.sendrecv_bytes(vec![send], peer, tag)?;
        buf.first()
            .copied()
            .ok_or_else(|| RedistError::transport("sendrecv", peer, "empty payload"))
    }

    fn send_bytes(&self, buf: Vec<u8>, peer: Rank, tag: Tag) -> Result<()> {
        self.check_peer(peer)?;
        self.push(peer, tag, buf)
    }

    fn recv_bytes(&self, peer: Rank, tag: Tag) -> Result<Vec<u8>> {
        self.check_peer(peer)?;
        self.pull(peer, tag)
    }

    fn sendrecv_bytes(&self, send: Vec<u8>, peer: Rank, tag: Tag) -> Result<Vec<u8>> {
        self.check_peer(peer)?;
        self.push(peer, tag, send)?;
        self.pull(peer, tag)
    }

    fn gather_bytes(&self, contrib: Vec<u8>, root: Rank, tag: Tag) -> Result<Option<Vec<Vec<u8>>>> {
        self.check_peer(root)?;
        if self.rank == root {
            let mut contribs = vec![Vec::new(); self.world as usize];
            contribs[self.rank as usize] = contrib;
            for src in 0..self.world {
                if src == root {
                    continue;
                }
                contribs[src as usize] = self.pull(src, tag)?;
            }
            Ok(Some(contribs))
        } else {
            self.push(root, tag, contrib)?;
            Ok(None)
        }
    }
}
