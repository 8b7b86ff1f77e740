//! Partitioned collections and the keyed operations the join is built from.
//!
//! Every operation runs one unit of work per partition on the [`Executor`]
//! and reads its input by reference, so a retried unit of work sees exactly
//! the input of the failed one. Nothing here depends on the order of records
//! within or across partitions.

use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

use super::executor::Executor;
use crate::error::Result;

/// A collection split into independently processed partitions
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    partitions: Vec<Vec<T>>,
}

/// Partition a key is shuffled to, stable across runs and processes
pub fn partition_for<K: Hash>(key: &K, num_partitions: usize) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % num_partitions.max(1) as u64) as usize
}

fn empty_partitions<T>(num_partitions: usize) -> Vec<Vec<T>> {
    (0..num_partitions.max(1)).map(|_| Vec::new()).collect()
}

/// Gather bucket `i` of every map-side output into output partition `i`
fn shuffle<T>(map_outputs: Vec<Vec<Vec<T>>>, num_partitions: usize) -> Vec<Vec<T>> {
    let mut partitions = empty_partitions(num_partitions);
    for buckets in map_outputs {
        for (index, bucket) in buckets.into_iter().enumerate() {
            partitions[index].extend(bucket);
        }
    }
    partitions
}

impl<T> Dataset<T> {
    pub fn from_partitions(partitions: Vec<Vec<T>>) -> Self {
        if partitions.is_empty() {
            return Self::empty(1);
        }
        Self { partitions }
    }

    pub fn empty(num_partitions: usize) -> Self {
        Self {
            partitions: empty_partitions(num_partitions),
        }
    }

    /// Split `items` into `num_partitions` contiguous, near-equal partitions
    pub fn from_vec(items: Vec<T>, num_partitions: usize) -> Self {
        let num_partitions = num_partitions.max(1);
        let chunk = items.len().div_ceil(num_partitions).max(1);
        let mut partitions = empty_partitions(num_partitions);
        for (index, item) in items.into_iter().enumerate() {
            partitions[index / chunk].push(item);
        }
        Self { partitions }
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn into_partitions(self) -> Vec<Vec<T>> {
        self.partitions
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }

    /// Flatten all partitions into one vector
    pub fn collect(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<T: Sync> Dataset<T> {
    pub fn try_map<U, F>(&self, exec: &Executor, stage: &str, f: F) -> Result<Dataset<U>>
    where
        U: Send,
        F: Fn(&T) -> Result<U> + Sync,
    {
        let partitions = exec.run(stage, &self.partitions, |_, partition| {
            partition.iter().map(&f).collect::<Result<Vec<U>>>()
        })?;
        Ok(Dataset { partitions })
    }

    pub fn map<U, F>(&self, exec: &Executor, stage: &str, f: F) -> Result<Dataset<U>>
    where
        U: Send,
        F: Fn(&T) -> U + Sync,
    {
        self.try_map(exec, stage, |item| Ok(f(item)))
    }

    pub fn try_flat_map<U, I, F>(&self, exec: &Executor, stage: &str, f: F) -> Result<Dataset<U>>
    where
        U: Send,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> Result<I> + Sync,
    {
        let partitions = exec.run(stage, &self.partitions, |_, partition| {
            let mut output = Vec::with_capacity(partition.len());
            for item in partition {
                output.extend(f(item)?);
            }
            Ok(output)
        })?;
        Ok(Dataset { partitions })
    }

    pub fn flat_map<U, I, F>(&self, exec: &Executor, stage: &str, f: F) -> Result<Dataset<U>>
    where
        U: Send,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + Sync,
    {
        self.try_flat_map(exec, stage, |item| Ok(f(item)))
    }

    /// Key every element; key extraction failures fail the stage
    pub fn key_by<K, F>(&self, exec: &Executor, stage: &str, f: F) -> Result<Dataset<(K, T)>>
    where
        K: Send,
        T: Clone + Send,
        F: Fn(&T) -> Result<K> + Sync,
    {
        self.try_map(exec, stage, |item| Ok((f(item)?, item.clone())))
    }
}

impl<T: Clone + Send + Sync> Dataset<T> {
    pub fn try_filter<F>(&self, exec: &Executor, stage: &str, predicate: F) -> Result<Dataset<T>>
    where
        F: Fn(&T) -> Result<bool> + Sync,
    {
        self.try_flat_map(exec, stage, |item| {
            Ok(if predicate(item)? {
                Some(item.clone())
            } else {
                None
            })
        })
    }

    pub fn filter<F>(&self, exec: &Executor, stage: &str, predicate: F) -> Result<Dataset<T>>
    where
        F: Fn(&T) -> bool + Sync,
    {
        self.try_filter(exec, stage, |item| Ok(predicate(item)))
    }
}

impl<K, V> Dataset<(K, V)>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Hash-shuffle pairs so that equal keys share a partition
    pub fn partition_by(
        &self,
        exec: &Executor,
        stage: &str,
        num_partitions: usize,
    ) -> Result<Dataset<(K, V)>> {
        let num_partitions = num_partitions.max(1);
        let map_outputs = exec.run(stage, &self.partitions, |_, partition| {
            let mut buckets = empty_partitions(num_partitions);
            for (key, value) in partition {
                buckets[partition_for(key, num_partitions)].push((key.clone(), value.clone()));
            }
            Ok(buckets)
        })?;
        Ok(Dataset {
            partitions: shuffle(map_outputs, num_partitions),
        })
    }

    /// Two-phase aggregation per key.
    ///
    /// Each partition folds its values into an accumulator starting from
    /// `zero` with `seq_op`; after the shuffle, accumulators for the same key
    /// from different partitions are merged with `comb_op`. Both operations
    /// must be associative and commutative, since neither the partition
    /// boundaries nor the merge order are fixed.
    pub fn aggregate_by_key<A, S, C>(
        &self,
        exec: &Executor,
        stage: &str,
        zero: A,
        seq_op: S,
        comb_op: C,
        num_partitions: usize,
    ) -> Result<Dataset<(K, A)>>
    where
        A: Clone + Send + Sync,
        S: Fn(A, &V) -> A + Sync,
        C: Fn(A, A) -> A + Sync,
    {
        let num_partitions = num_partitions.max(1);

        let map_outputs = exec.run(stage, &self.partitions, |_, partition| {
            let mut local: FxHashMap<K, A> = FxHashMap::default();
            for (key, value) in partition {
                let acc = local.remove(key).unwrap_or_else(|| zero.clone());
                local.insert(key.clone(), seq_op(acc, value));
            }

            let mut buckets = empty_partitions(num_partitions);
            for (key, acc) in local {
                buckets[partition_for(&key, num_partitions)].push((key, acc));
            }
            Ok(buckets)
        })?;

        let shuffled = shuffle(map_outputs, num_partitions);

        let partitions = exec.run(stage, &shuffled, |_, partition| {
            let mut merged: FxHashMap<K, A> = FxHashMap::default();
            for (key, acc) in partition {
                let combined = match merged.remove(key) {
                    Some(existing) => comb_op(existing, acc.clone()),
                    None => acc.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Ok(merged.into_iter().collect::<Vec<_>>())
        })?;

        Ok(Dataset { partitions })
    }

    /// All values per key, as a multiset
    pub fn group_by_key(
        &self,
        exec: &Executor,
        stage: &str,
        num_partitions: usize,
    ) -> Result<Dataset<(K, Vec<V>)>> {
        self.aggregate_by_key(
            exec,
            stage,
            Vec::new(),
            |mut acc, value| {
                acc.push(value.clone());
                acc
            },
            |mut left, right| {
                left.extend(right);
                left
            },
            num_partitions,
        )
    }

    /// Inner join; a key present `m` times on the left and `n` times on the
    /// right yields `m * n` pairs
    pub fn join<W>(
        &self,
        exec: &Executor,
        stage: &str,
        other: &Dataset<(K, W)>,
        num_partitions: usize,
    ) -> Result<Dataset<(K, (V, W))>>
    where
        W: Clone + Send + Sync,
    {
        let co_partitioned = self.co_partition(exec, stage, other, num_partitions)?;

        let partitions = exec.run(stage, &co_partitioned, |_, pair| {
            let (left, right) = pair;
            let index = index_by_key(right);
            let mut output = Vec::new();
            for (key, value) in left {
                if let Some(matches) = index.get(key) {
                    for matched in matches {
                        output.push((key.clone(), (value.clone(), (*matched).clone())));
                    }
                }
            }
            Ok(output)
        })?;

        Ok(Dataset { partitions })
    }

    /// Left outer join; left pairs without a match are kept with `None`
    pub fn left_outer_join<W>(
        &self,
        exec: &Executor,
        stage: &str,
        other: &Dataset<(K, W)>,
        num_partitions: usize,
    ) -> Result<Dataset<(K, (V, Option<W>))>>
    where
        W: Clone + Send + Sync,
    {
        let co_partitioned = self.co_partition(exec, stage, other, num_partitions)?;

        let partitions = exec.run(stage, &co_partitioned, |_, pair| {
            let (left, right) = pair;
            let index = index_by_key(right);
            let mut output = Vec::new();
            for (key, value) in left {
                match index.get(key) {
                    Some(matches) => {
                        for matched in matches {
                            output.push((key.clone(), (value.clone(), Some((*matched).clone()))));
                        }
                    }
                    None => output.push((key.clone(), (value.clone(), None))),
                }
            }
            Ok(output)
        })?;

        Ok(Dataset { partitions })
    }

    #[allow(clippy::type_complexity)]
    fn co_partition<W>(
        &self,
        exec: &Executor,
        stage: &str,
        other: &Dataset<(K, W)>,
        num_partitions: usize,
    ) -> Result<Vec<(Vec<(K, V)>, Vec<(K, W)>)>>
    where
        W: Clone + Send + Sync,
    {
        let left = self.partition_by(exec, stage, num_partitions)?;
        let right = other.partition_by(exec, stage, num_partitions)?;
        Ok(left
            .partitions
            .into_iter()
            .zip(right.partitions)
            .collect())
    }
}

fn index_by_key<K: Hash + Eq, W>(pairs: &[(K, W)]) -> FxHashMap<&K, Vec<&W>> {
    let mut index: FxHashMap<&K, Vec<&W>> = FxHashMap::default();
    for (key, value) in pairs {
        index.entry(key).or_default().push(value);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::ExecutorConfig;
    use std::collections::BTreeMap;

    fn exec() -> Executor {
        Executor::new(&ExecutorConfig {
            workers: 2,
            max_attempts: 1,
            default_partitions: 3,
        })
        .unwrap()
    }

    fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
        items.sort();
        items
    }

    #[test]
    fn test_from_vec_spreads_items() {
        let ds = Dataset::from_vec((0..10).collect(), 3);
        assert_eq!(ds.num_partitions(), 3);
        assert_eq!(ds.len(), 10);
        assert_eq!(ds.clone().collect(), (0..10).collect::<Vec<_>>());

        let empty: Dataset<i32> = Dataset::from_vec(Vec::new(), 4);
        assert_eq!(empty.num_partitions(), 4);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_partition_by_colocates_keys() {
        let exec = exec();
        let pairs: Vec<(String, i32)> = (0..40).map(|i| (format!("k{}", i % 7), i)).collect();
        let ds = Dataset::from_vec(pairs, 5).partition_by(&exec, "shuffle", 4).unwrap();

        assert_eq!(ds.num_partitions(), 4);
        assert_eq!(ds.len(), 40);
        for (index, partition) in ds.partitions().iter().enumerate() {
            for (key, _) in partition {
                assert_eq!(partition_for(key, 4), index);
            }
        }
    }

    #[test]
    fn test_group_by_key_keeps_duplicates() {
        let exec = exec();
        let pairs = vec![("a", 1), ("b", 2), ("a", 1), ("a", 3)];
        let grouped: BTreeMap<_, _> = Dataset::from_vec(pairs, 3)
            .group_by_key(&exec, "group", 2)
            .unwrap()
            .collect()
            .into_iter()
            .map(|(k, v)| (k, sorted(v)))
            .collect();

        assert_eq!(grouped["a"], vec![1, 1, 3]);
        assert_eq!(grouped["b"], vec![2]);
    }

    #[test]
    fn test_aggregate_by_key_sums() {
        let exec = exec();
        let pairs: Vec<(u8, u64)> = (0..100).map(|i| ((i % 3) as u8, i as u64)).collect();
        let sums: BTreeMap<_, _> = Dataset::from_vec(pairs, 7)
            .aggregate_by_key(&exec, "sum", 0u64, |acc, v| acc + v, |a, b| a + b, 3)
            .unwrap()
            .collect()
            .into_iter()
            .collect();

        let expected: u64 = (0..100u64).filter(|i| i % 3 == 0).sum();
        assert_eq!(sums[&0], expected);
        assert_eq!(sums.values().sum::<u64>(), (0..100u64).sum::<u64>());
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_crosses_duplicates() {
        let exec = exec();
        let left = Dataset::from_vec(vec![("k1", "l1"), ("k1", "l2"), ("k2", "l3")], 2);
        let right = Dataset::from_vec(vec![("k1", "r1"), ("k1", "r2"), ("k3", "r3")], 2);

        let joined = sorted(left.join(&exec, "join", &right, 3).unwrap().collect());
        assert_eq!(
            joined,
            vec![
                ("k1", ("l1", "r1")),
                ("k1", ("l1", "r2")),
                ("k1", ("l2", "r1")),
                ("k1", ("l2", "r2")),
            ]
        );
    }

    #[test]
    fn test_left_outer_join_keeps_unmatched_left() {
        let exec = exec();
        let left = Dataset::from_vec(vec![("k1", 1), ("k2", 2)], 2);
        let right = Dataset::from_vec(vec![("k1", "x"), ("k3", "y")], 1);

        let joined = sorted(left.left_outer_join(&exec, "join", &right, 2).unwrap().collect());
        assert_eq!(joined, vec![("k1", (1, Some("x"))), ("k2", (2, None))]);
    }

    #[test]
    fn test_try_filter_propagates_errors() {
        let exec = exec();
        let ds = Dataset::from_vec(vec![1, 2, 3], 2);

        let evens = ds.filter(&exec, "even", |x| x % 2 == 0).unwrap();
        assert_eq!(evens.collect(), vec![2]);

        let err = ds
            .try_filter(&exec, "fail", |x| {
                if *x == 3 {
                    Err(crate::error::JoinError::identity("ssm_p", "3", "absent"))
                } else {
                    Ok(true)
                }
            })
            .unwrap_err();
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_flat_map_keeps_partitioning() {
        let exec = exec();
        let ds = Dataset::from_vec(vec![1, 2, 3], 3);

        let repeated = ds.flat_map(&exec, "repeat", |x| vec![*x; *x]).unwrap();
        assert_eq!(repeated.num_partitions(), 3);
        assert_eq!(repeated.collect(), vec![1, 2, 2, 3, 3, 3]);
    }
}
