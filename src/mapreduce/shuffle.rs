//! Shuffle between map and reduce tasks
//!
//! Map tasks write keyed records into per-partition [`Buckets`]. The coordinator
//! commits each task's buckets into a [`ShuffleStore`] under the task id; a
//! second commit for the same id is ignored, so a re-executed task can never
//! double-count its records. Once every task is committed the store is drained
//! into one group list per reducer partition.

use fnv::FnvHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Reducer partition responsible for `key`
pub fn partition_for<K: Hash>(key: &K, partitions: usize) -> usize {
    let mut hasher = FnvHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Output of one map task, already split by reducer partition
#[derive(Debug, Clone)]
pub struct Buckets<K, V> {
    buckets: Vec<Vec<(K, V)>>,
}

impl<K: Hash, V> Buckets<K, V> {
    pub fn new(partitions: usize) -> Self {
        Self {
            buckets: (0..partitions.max(1)).map(|_| Vec::new()).collect(),
        }
    }

    pub fn push(&mut self, key: K, value: V) {
        let partition = partition_for(&key, self.buckets.len());
        self.buckets[partition].push((key, value));
    }

    pub fn partitions(&self) -> usize {
        self.buckets.len()
    }

    /// Number of records across all partitions
    pub fn records(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn partition(&self, index: usize) -> &[(K, V)] {
        &self.buckets[index]
    }
}

/// Committed map outputs, keyed by task id
#[derive(Debug)]
pub struct ShuffleStore<K, V> {
    partitions: usize,
    committed: BTreeMap<usize, Buckets<K, V>>,
}

impl<K: Hash + Ord, V> ShuffleStore<K, V> {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            committed: BTreeMap::new(),
        }
    }

    /// Commit the output of a task; returns `false` if the task was already committed
    pub fn commit(&mut self, task_id: usize, buckets: Buckets<K, V>) -> bool {
        debug_assert_eq!(buckets.partitions(), self.partitions);
        if self.committed.contains_key(&task_id) {
            debug!("Ignoring duplicate output for task {}", task_id);
            return false;
        }
        self.committed.insert(task_id, buckets);
        true
    }

    pub fn committed_tasks(&self) -> usize {
        self.committed.len()
    }

    /// Records held across every committed task
    pub fn records(&self) -> usize {
        self.committed.values().map(Buckets::records).sum()
    }

    /// Group committed records by key, one group list per reducer partition
    ///
    /// Values keep task order, so grouping is deterministic for a given plan.
    pub fn into_groups(self) -> Vec<Vec<(K, Vec<V>)>> {
        let mut grouped: Vec<BTreeMap<K, Vec<V>>> =
            (0..self.partitions).map(|_| BTreeMap::new()).collect();

        for (_, buckets) in self.committed {
            for (partition, records) in buckets.buckets.into_iter().enumerate() {
                for (key, value) in records {
                    grouped[partition].entry(key).or_default().push(value);
                }
            }
        }

        grouped
            .into_iter()
            .map(|groups| groups.into_iter().collect())
            .collect()
    }
}
