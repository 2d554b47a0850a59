use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use redist::{exchange, LocalCluster, Partition, PartitionGroup, Properties, Rank, Transport};

use super::helpers::{contents, forced, group_of, run_ranks};

type RankOutputs = Arc<Mutex<HashMap<Rank, Vec<Vec<i64>>>>>;

fn collect_outputs<F>(world_size: u32, cores: usize, f: F) -> HashMap<Rank, Vec<Vec<i64>>>
where
    F: Fn(&redist::LocalTransport) -> Vec<Vec<i64>> + Send + Sync + 'static,
{
    let outs: RankOutputs = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&outs);
    run_ranks(world_size, cores, move |t| {
        let parts = f(&t);
        sink.lock().unwrap().insert(t.rank(), parts);
    });
    Arc::try_unwrap(outs).unwrap().into_inner().unwrap()
}

/// Single executor: partitions are fitted and moved, nothing else.
#[test]
fn test_single_executor_moves_partitions() {
    let transports = LocalCluster::bootstrap(1);
    let mut input = group_of(&[vec![1, 2], vec![], vec![3]]);
    let mut output = PartitionGroup::new();
    exchange(&transports[0], &Properties::new(), &mut input, &mut output).unwrap();
    assert!(input.is_empty());
    assert_eq!(contents(&output), vec![vec![1, 2], vec![], vec![3]]);
}

/// Two executors, six aligned slots each, nothing empty: the probe picks
/// sync, rank 0 owns indices {0,1,2}, rank 1 owns {3,4,5}, and every
/// owned slot merges both ranks' contributions in rank order.
#[test]
fn test_two_executors_balanced_sync() {
    let outs = collect_outputs(2, 2, |t| {
        let rank = t.rank();
        let mut input: PartitionGroup<i64> = (0..6)
            .map(|i| Partition::from(vec![i64::from(rank) * 100 + i]))
            .collect();
        let mut output = PartitionGroup::new();
        exchange(t, &Properties::new(), &mut input, &mut output).unwrap();
        assert!(input.is_empty());
        contents(&output)
    });

    assert_eq!(outs[&0].len(), 3);
    assert_eq!(outs[&1].len(), 3);
    for i in 0..3i64 {
        assert_eq!(outs[&0][i as usize], vec![i, 100 + i]);
        assert_eq!(outs[&1][i as usize], vec![3 + i, 103 + i]);
    }
}

/// Three executors, seven indices: block 2, remainder 1. Rank 0 ends
/// owning {0,1,2}, rank 1 {3,4}, rank 2 {5,6}.
#[test]
fn test_three_executors_remainder_split() {
    let outs = collect_outputs(3, 2, |t| {
        let rank = t.rank();
        let mut input: PartitionGroup<i64> = (0..7)
            .map(|i| Partition::from(vec![i64::from(rank) * 100 + i]))
            .collect();
        let mut output = PartitionGroup::new();
        exchange(t, &Properties::new(), &mut input, &mut output).unwrap();
        contents(&output)
    });

    let owned: HashMap<Rank, Vec<i64>> =
        [(0, vec![0, 1, 2]), (1, vec![3, 4]), (2, vec![5, 6])].into();
    for (rank, indices) in owned {
        let parts = &outs[&rank];
        assert_eq!(parts.len(), indices.len(), "rank {rank}");
        for (part, index) in parts.iter().zip(indices) {
            assert_eq!(part, &vec![index, 100 + index, 200 + index], "rank {rank}");
        }
    }
}

/// Four executors holding only empty partitions: the probe picks async,
/// every pair elides, and every output is empty.
#[test]
fn test_all_empty_elides_everything() {
    let outs = collect_outputs(4, 2, |t| {
        let mut input = group_of(&[vec![], vec![], vec![], vec![]]);
        let mut output = PartitionGroup::new();
        exchange(t, &Properties::new(), &mut input, &mut output).unwrap();
        assert!(input.is_empty());
        contents(&output)
    });
    for rank in 0..4 {
        assert!(outs[&rank].is_empty(), "rank {rank} output not empty");
    }
}

/// Forced async where each side already owns its only non-empty slot:
/// the pair elides, data stays put.
#[test]
fn test_async_elision_keeps_local_data() {
    let outs = collect_outputs(2, 1, |t| {
        let mut input = if t.rank() == 0 {
            group_of(&[vec![10], vec![]])
        } else {
            group_of(&[vec![], vec![20]])
        };
        let mut output = PartitionGroup::new();
        exchange(t, &forced("async"), &mut input, &mut output).unwrap();
        contents(&output)
    });
    assert_eq!(outs[&0], vec![vec![10]]);
    assert_eq!(outs[&1], vec![vec![20]]);
}

/// Forced async with real transfers: each rank keeps its own slot and
/// accumulates the peer's contribution behind its own elements.
#[test]
fn test_async_pairwise_transfer() {
    let outs = collect_outputs(2, 1, |t| {
        let mut input = if t.rank() == 0 {
            group_of(&[vec![1], vec![2]])
        } else {
            group_of(&[vec![3], vec![4]])
        };
        let mut output = PartitionGroup::new();
        exchange(t, &forced("async"), &mut input, &mut output).unwrap();
        contents(&output)
    });
    assert_eq!(outs[&0], vec![vec![1, 3]]);
    assert_eq!(outs[&1], vec![vec![4, 2]]);
}

/// More executors than indices: trailing ranks own nothing and end empty.
#[test]
fn test_fewer_partitions_than_executors() {
    for mode in ["sync", "async"] {
        let outs = collect_outputs(4, 1, move |t| {
            let rank = t.rank();
            let mut input: PartitionGroup<i64> = (0..2)
                .map(|i| Partition::from(vec![i64::from(rank) * 100 + i]))
                .collect();
            let mut output = PartitionGroup::new();
            exchange(t, &forced(mode), &mut input, &mut output).unwrap();
            contents(&output)
        });
        for (rank, index) in [(0u32, 0i64), (1, 1)] {
            assert_eq!(outs[&rank].len(), 1, "{mode} rank {rank}");
            let mut got = outs[&rank][0].clone();
            got.sort_unstable();
            assert_eq!(
                got,
                vec![index, 100 + index, 200 + index, 300 + index],
                "{mode} rank {rank}"
            );
        }
        assert!(outs[&2].is_empty(), "{mode} rank 2");
        assert!(outs[&3].is_empty(), "{mode} rank 3");
    }
}

/// Empty groups exchange cleanly in both modes.
#[test]
fn test_empty_groups() {
    for mode in ["sync", "async"] {
        let outs = collect_outputs(2, 2, move |t| {
            let mut input: PartitionGroup<i64> = PartitionGroup::new();
            let mut output = PartitionGroup::new();
            exchange(t, &forced(mode), &mut input, &mut output).unwrap();
            contents(&output)
        });
        assert!(outs[&0].is_empty(), "{mode}");
        assert!(outs[&1].is_empty(), "{mode}");
    }
}
