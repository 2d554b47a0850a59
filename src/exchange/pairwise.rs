//! Asynchronous pairwise exchange.
//!
//! Ranks walk a round-robin (circle) tournament: every unordered pair of
//! ranks meets in exactly one round, and within a round a rank talks to
//! at most one peer, so a single tag suffices for all transfers. Pairs
//! where neither side has anything to move are elided with a one-byte
//! handshake before any payload flows.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{SlotTable, EXCHANGE_TAG};
use crate::error::Result;
use crate::pool::ParallelLoop;
use crate::storage::PartitionGroup;
use crate::transport::{self, Element, Transport};
use crate::types::Rank;

/// Contiguous slice of global indices owned by each rank after exchange.
///
/// Rank `i` owns `[(block+1)*i, ..)` of length `block + 1` while
/// `i < remainder`, then length-`block` slices. Identical on every rank.
pub(crate) fn owned_ranges(num_partitions: usize, executors: usize) -> Vec<Range<usize>> {
    let block = num_partitions / executors;
    let remainder = num_partitions % executors;
    (0..executors)
        .map(|i| {
            let init = if i < remainder {
                (block + 1) * i
            } else {
                (block + 1) * remainder + block * (i - remainder)
            };
            let len = if i < remainder { block + 1 } else { block };
            init..init + len
        })
        .collect()
}

/// Peer queue for one rank in the circle tournament over `m` players
/// (`executors` rounded up to even). Queue position is the round number;
/// the peer value `executors` marks a bye and only occurs for odd
/// executor counts. Every unordered pair of real ranks meets in exactly
/// one of the `m - 1` rounds.
pub(crate) fn pairing_queue(executors: usize, rank: Rank) -> Vec<Rank> {
    let rank = rank as usize;
    let m = if executors % 2 == 0 {
        executors
    } else {
        executors + 1
    };

    let mut queue = Vec::with_capacity(m - 1);
    let mut id = 0;
    let mut id2 = m * m - 2;
    for _round in 0..m - 1 {
        if rank == id % (m - 1) {
            queue.push((m - 1) as Rank);
        }
        if rank == m - 1 {
            queue.push((id % (m - 1)) as Rank);
        }
        id += 1;
        for _ in 1..m / 2 {
            if rank == id % (m - 1) {
                queue.push((id2 % (m - 1)) as Rank);
            }
            if rank == id2 % (m - 1) {
                queue.push((id % (m - 1)) as Rank);
            }
            id += 1;
            id2 -= 1;
        }
    }
    queue
}

pub(crate) fn exchange_pairwise<C, T>(
    comm: &C,
    input: &mut PartitionGroup<T>,
    output: &mut PartitionGroup<T>,
) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    let executors = comm.executors() as usize;
    let rank = comm.rank();
    let num_partitions = input.len();
    let ranges = owned_ranges(num_partitions, executors);
    let queue = pairing_queue(executors, rank);
    let cores = comm.enable_cores()?;
    let table = SlotTable::drain_from(input);

    // Empty-pair elision: a one-byte flag exchange with every queued
    // peer. When neither side has anything to send, the pair moves no
    // payload and this side drops its outbound slots.
    let ignores: Vec<AtomicBool> = (0..queue.len()).map(|_| AtomicBool::new(false)).collect();
    ParallelLoop::new().threads(cores).run(queue.len(), |i, _sync| {
        let other = queue[i];
        if other as usize == executors {
            return Ok(());
        }
        let other_range = ranges[other as usize].clone();
        let mine_empty = other_range.clone().all(|j| table.is_empty_at(j));
        let peer_empty = comm.sendrecv_u8(u8::from(mine_empty), other, EXCHANGE_TAG)? != 0;
        if mine_empty && peer_empty {
            tracing::debug!(peer = other, "eliding empty pair exchange");
            ignores[i].store(true, Ordering::Relaxed);
            for j in other_range {
                table.clear(j);
            }
        }
        Ok(())
    })?;

    for (i, &other) in queue.iter().enumerate() {
        if other as usize == executors || ignores[i].load(Ordering::Relaxed) {
            continue;
        }
        let me_range = ranges[rank as usize].clone();
        let other_range = ranges[other as usize].clone();
        let iterations = me_range.len().max(other_range.len());

        // Both sides run this loop with identical bounds and peer, so
        // every send/recv at index j is matched on the other side.
        ParallelLoop::new()
            .threads(cores)
            .chunk(1)
            .run(iterations, |j, _sync| {
                let me_part = me_range.start + j;
                let other_part = other_range.start + j;
                let me_in = me_part < me_range.end;
                let other_in = other_part < other_range.end;
                if me_in && other_in {
                    let send = table.take(other_part).unwrap_or_default();
                    table.with_slot(me_part, |recv| {
                        transport::send_recv_partition(comm, &send, recv, other, EXCHANGE_TAG)
                    })?;
                } else if me_in {
                    table.with_slot(me_part, |recv| {
                        transport::recv_partition(comm, recv, other, EXCHANGE_TAG)
                    })?;
                } else if other_in {
                    let send = table.take(other_part).unwrap_or_default();
                    transport::send_partition(comm, &send, other, EXCHANGE_TAG)?;
                }
                Ok(())
            })?;
    }

    table.harvest_into(output);
    Ok(())
}
