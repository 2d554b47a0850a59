//! Synchronous gather-to-owner exchange.
//!
//! A deterministic plan assigns every global partition index to an owner
//! rank; each index is then gathered to its owner through the transport,
//! one collective per index, dispatched across worker threads with a
//! chunk size of one so gathers spread over targets.

use super::SlotTable;
use crate::error::Result;
use crate::pool::ParallelLoop;
use crate::storage::PartitionGroup;
use crate::transport::{self, Element, Transport};
use crate::types::{Rank, Tag};

/// One plan entry: the partition at `index` is gathered to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlanEntry {
    pub(crate) index: usize,
    pub(crate) target: Rank,
}

/// Deterministic owner assignment for every global partition index.
///
/// Pure function of `(num_partitions, executors)`: all ranks compute an
/// identical plan. Each index appears exactly once, and target `t`'s
/// indices form the contiguous slice starting at
/// `t * block + min(t, remainder)`. Entries are interleaved round-robin
/// across targets so a chunked loop spreads concurrent gathers over
/// owners.
pub(crate) fn build_plan(num_partitions: usize, executors: usize) -> Vec<PlanEntry> {
    let block = num_partitions / executors;
    let remainder = num_partitions % executors;

    let mut slots: Vec<Option<PlanEntry>> = vec![None; (block + 1) * executors];
    let mut cursor = 0;
    for i in 0..executors {
        for j in 0..block {
            slots[j * executors + i] = Some(PlanEntry {
                index: cursor + j,
                target: i as Rank,
            });
        }
        cursor += block;
        if i < remainder {
            slots[block * executors + i] = Some(PlanEntry {
                index: cursor,
                target: i as Rank,
            });
            cursor += 1;
        }
    }
    slots.into_iter().flatten().collect()
}

pub(crate) fn exchange_sync<C, T>(
    comm: &C,
    input: &mut PartitionGroup<T>,
    output: &mut PartitionGroup<T>,
) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    let executors = comm.executors() as usize;
    let num_partitions = input.len();
    let plan = build_plan(num_partitions, executors);
    let cores = comm.enable_cores()?;
    let table = SlotTable::drain_from(input);

    ParallelLoop::new()
        .threads(cores)
        .chunk(1)
        .run(num_partitions, |i, _sync| {
            let PlanEntry { index, target } = plan[i];
            let mut part = table.take(index).unwrap_or_default();
            transport::gather_partition(comm, &mut part, target, index as Tag)?;
            if comm.is_root(target) {
                part.fit()?;
                table.put(index, part);
            }
            Ok(())
        })?;

    table.harvest_into(output);
    Ok(())
}
