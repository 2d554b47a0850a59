use std::sync::Arc;

use redist::{LocalCluster, LocalTransport, Partition, PartitionGroup, Properties, EXCHANGE_TYPE};

/// Run one closure per rank over an in-process cluster, each on its own
/// OS thread, and join them all. A panic in any rank fails the test.
pub fn run_ranks<F>(world_size: u32, cores: usize, f: F)
where
    F: Fn(LocalTransport) + Send + Sync + 'static,
{
    let transports = LocalCluster::bootstrap_with_cores(world_size, cores);
    let f = Arc::new(f);
    let handles: Vec<_> = transports
        .into_iter()
        .map(|t| {
            let f = Arc::clone(&f);
            std::thread::spawn(move || f(t))
        })
        .collect();
    for h in handles {
        h.join().expect("rank thread panicked");
    }
}

/// Group with one partition per listed element vector.
pub fn group_of(parts: &[Vec<i64>]) -> PartitionGroup<i64> {
    parts.iter().map(|elems| Partition::from(elems.clone())).collect()
}

/// Properties forcing one exchange strategy.
pub fn forced(mode: &str) -> Properties {
    let mut props = Properties::new();
    props.set(EXCHANGE_TYPE, mode);
    props
}

/// Every element in the group, sorted: a multiset fingerprint.
pub fn sorted_elements(group: &PartitionGroup<i64>) -> Vec<i64> {
    let mut elems: Vec<i64> = group.iter().flat_map(|p| p.iter().copied()).collect();
    elems.sort_unstable();
    elems
}

/// The partitions of a group as plain element vectors, in order.
pub fn contents(group: &PartitionGroup<i64>) -> Vec<Vec<i64>> {
    group.iter().map(|p| p.elements().to_vec()).collect()
}
