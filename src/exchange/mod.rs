//! All-to-all partition exchange.
//!
//! Every rank holds an aligned partition group (one slot per global
//! index). The exchange redistributes partitions so each rank ends up
//! owning a contiguous, balanced slice of the global index space, then
//! moves surviving non-empty partitions into the output group and leaves
//! the input empty.
//!
//! Two strategies implement the same contract:
//!
//! - sync: every global index is gathered to its deterministic owner,
//!   one collective per index, dispatched across worker threads.
//! - async: ranks meet every other rank exactly once on a round-robin
//!   tournament schedule and swap their owned ranges pairwise, skipping
//!   pairs with nothing to move.
//!
//! The strategy is forced by the `exchange.type` property or chosen by a
//! global sparsity probe: the more empty partitions, the more the
//! pairwise path wins by eliding them.

mod pairwise;
mod sync;

use parking_lot::Mutex;

use crate::config::Properties;
use crate::error::Result;
use crate::storage::{Partition, PartitionGroup};
use crate::transport::{Element, Transport};
use crate::types::{ExchangeMode, Tag};

/// Tag used by all pairwise partition transfers. Safe because the
/// schedule pairs a rank with at most one peer per round.
pub(crate) const EXCHANGE_TAG: Tag = 0;

/// Redistribute `input` across all ranks into `output`.
///
/// After a successful exchange, `output` holds this rank's non-empty
/// share of the global partition sequence in index order and `input` is
/// empty. Group state is undefined after an error; the caller is
/// expected to tear the executor down. Not reentrant on the same groups.
pub fn exchange<C, T>(
    comm: &C,
    props: &Properties,
    input: &mut PartitionGroup<T>,
    output: &mut PartitionGroup<T>,
) -> Result<()>
where
    C: Transport + ?Sized,
    T: Element,
{
    if comm.executors() <= 1 {
        for mut part in input.drain() {
            part.fit()?;
            output.add(part);
        }
        return Ok(());
    }

    match select_mode(comm, props, input)? {
        ExchangeMode::Sync => {
            tracing::info!("using synchronous exchange");
            sync::exchange_sync(comm, input, output)
        }
        ExchangeMode::Async => {
            tracing::info!("using asynchronous exchange");
            pairwise::exchange_pairwise(comm, input, output)
        }
    }
}

/// Strategy for the next exchange: the configured `exchange.type`, or
/// the outcome of the global sparsity probe when unset.
///
/// The probe sums `(partition count, empty count)` over all ranks to
/// rank 0, which picks sync iff fewer than `1/executors` of all
/// partitions are empty, and broadcasts the decision.
pub fn select_mode<C, T>(
    comm: &C,
    props: &Properties,
    input: &PartitionGroup<T>,
) -> Result<ExchangeMode>
where
    C: Transport + ?Sized,
{
    if let Some(mode) = props.exchange_mode()? {
        return Ok(mode);
    }

    tracing::debug!("detecting exchange type");
    let mut counts = [
        input.len() as i64,
        input.iter().filter(|p| p.is_empty()).count() as i64,
    ];
    comm.reduce_sum_i64(&mut counts, 0)?;
    let mut flag = 0u8;
    if comm.is_root(0) {
        flag = u8::from(counts[1] < counts[0] / i64::from(comm.executors()));
    }
    comm.bcast_u8(&mut flag, 0)?;
    Ok(if flag != 0 {
        ExchangeMode::Sync
    } else {
        ExchangeMode::Async
    })
}

/// Partition slots shared across loop iterations.
///
/// Concurrent iterations touch disjoint indices; the per-slot mutex makes
/// that sound without exposing vacant slots to callers. A vacant slot is
/// a drained partition and counts as empty.
pub(crate) struct SlotTable<T> {
    slots: Vec<Mutex<Option<Partition<T>>>>,
}

impl<T> SlotTable<T> {
    /// Move every partition out of `group` into the table, in order.
    pub(crate) fn drain_from(group: &mut PartitionGroup<T>) -> Self {
        Self {
            slots: group.drain().map(|p| Mutex::new(Some(p))).collect(),
        }
    }

    pub(crate) fn take(&self, index: usize) -> Option<Partition<T>> {
        self.slots[index].lock().take()
    }

    pub(crate) fn put(&self, index: usize, part: Partition<T>) {
        *self.slots[index].lock() = Some(part);
    }

    pub(crate) fn clear(&self, index: usize) {
        self.slots[index].lock().take();
    }

    pub(crate) fn is_empty_at(&self, index: usize) -> bool {
        self.slots[index].lock().as_ref().map_or(true, Partition::is_empty)
    }

    /// Run `f` on the partition at `index`, creating an empty one if the
    /// slot is vacant. The slot stays locked for the duration of `f`.
    pub(crate) fn with_slot<R>(&self, index: usize, f: impl FnOnce(&mut Partition<T>) -> R) -> R {
        let mut guard = self.slots[index].lock();
        f(guard.get_or_insert_with(Partition::new))
    }

    /// Move surviving non-empty partitions into `out` in index order.
    pub(crate) fn harvest_into(self, out: &mut PartitionGroup<T>) {
        for slot in self.slots {
            if let Some(part) = slot.into_inner() {
                if !part.is_empty() {
                    out.add(part);
                }
            }
        }
    }
}
