//! Task bodies run by the worker pool
//!
//! Each function here is the synchronous work of one task: a map task over an
//! input split, a join task over one shuffle partition, or a reduce task over
//! one shuffle partition. They hold no state between calls, so the pool can
//! rerun any of them on the same input.

use super::combiner::{bundle_by_cell, sum_by_cell};
use super::emitter::{ElementEmitter, InputSplit};
use super::partition::{
    fan_out, join_cross_product, key_by_shared_dimension, CellKey, JoinEntry, PartialEntry,
};
use super::reducer::{reduce_cell, sum_cell, ResultCell};
use super::shuffle::Buckets;
use crate::error::Result;
use crate::matrix::{MatrixSource, Scalar, Side};
use crate::registry::OperandRoles;
use std::sync::Arc;
use tracing::trace;

/// Fan-out records: a bundle of entries for one destination cell
pub type FanOutBuckets = Buckets<CellKey, Vec<PartialEntry>>;
/// Join input records keyed by shared index
pub type JoinBuckets = Buckets<usize, JoinEntry>;
/// Partial sums keyed by destination cell
pub type ProductBuckets = Buckets<CellKey, Scalar>;

/// One shuffle partition after grouping
pub type Groups<K, V> = Vec<(K, Vec<V>)>;

/// Everything a map task reads, shared read-only by all tasks
pub struct MapContext {
    pub roles: Arc<OperandRoles>,
    pub left: Arc<dyn MatrixSource>,
    pub right: Arc<dyn MatrixSource>,
    pub emitter: ElementEmitter,
    pub combiner: bool,
    pub partitions: usize,
}

impl MapContext {
    fn source(&self, side: Side) -> &dyn MatrixSource {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

/// Output of one map task
#[derive(Debug)]
pub struct MapOutput<B> {
    pub split: usize,
    pub buckets: B,
    pub elements: usize,
    /// Records before combining
    pub records: usize,
}

/// Map task for the fan-out strategy
pub fn fan_out_task(ctx: &MapContext, split: &InputSplit) -> Result<MapOutput<FanOutBuckets>> {
    let side = ctx.roles.side_of(&split.matrix)?;
    let handle = ctx.roles.handle(side);
    let elements = ctx
        .emitter
        .emit(ctx.source(side), handle, split.rows.clone())?;

    let mut buckets = Buckets::new(ctx.partitions);
    let mut emitted = 0;
    let mut records = 0;

    if ctx.combiner {
        let mut entries = Vec::new();
        for element in elements {
            emitted += 1;
            entries.extend(fan_out(&element, &ctx.roles)?);
        }
        records = entries.len();
        for (cell, bundle) in bundle_by_cell(entries) {
            buckets.push(cell, bundle);
        }
    } else {
        for element in elements {
            emitted += 1;
            for entry in fan_out(&element, &ctx.roles)? {
                records += 1;
                buckets.push(entry.cell(), vec![entry]);
            }
        }
    }

    trace!(
        "Split {} ({} rows {:?}): {} elements, {} entries, {} records shuffled",
        split.id,
        split.matrix,
        split.rows,
        emitted,
        records,
        buckets.records()
    );

    Ok(MapOutput {
        split: split.id,
        buckets,
        elements: emitted,
        records,
    })
}

/// Map task for the shared-dimension strategy
pub fn key_task(ctx: &MapContext, split: &InputSplit) -> Result<MapOutput<JoinBuckets>> {
    let side = ctx.roles.side_of(&split.matrix)?;
    let handle = ctx.roles.handle(side);
    let elements = ctx
        .emitter
        .emit(ctx.source(side), handle, split.rows.clone())?;

    let mut buckets = Buckets::new(ctx.partitions);
    let mut emitted = 0;
    for element in elements {
        emitted += 1;
        let (t, entry) = key_by_shared_dimension(&element, &ctx.roles)?;
        buckets.push(t, entry);
    }

    trace!(
        "Split {} ({} rows {:?}): {} elements keyed",
        split.id,
        split.matrix,
        split.rows,
        emitted
    );

    Ok(MapOutput {
        split: split.id,
        buckets,
        elements: emitted,
        records: emitted,
    })
}

/// Join task: cross product per shared index, optionally summed per cell
pub fn join_task(
    task: usize,
    groups: &Groups<usize, JoinEntry>,
    combiner: bool,
    partitions: usize,
) -> Result<MapOutput<ProductBuckets>> {
    let mut buckets = Buckets::new(partitions);
    let mut records = 0;

    if combiner {
        let products = groups.iter().flat_map(|(_, entries)| join_cross_product(entries));
        let sums = sum_by_cell(products.inspect(|_| records += 1));
        for (cell, value) in sums {
            buckets.push(cell, value);
        }
    } else {
        for (_, entries) in groups {
            for product in join_cross_product(entries) {
                records += 1;
                buckets.push(product.cell, product.value);
            }
        }
    }

    Ok(MapOutput {
        split: task,
        buckets,
        elements: groups.iter().map(|(_, entries)| entries.len()).sum(),
        records,
    })
}

/// Reduce task for the fan-out strategy
pub fn fan_out_reduce_task(
    groups: &Groups<CellKey, Vec<PartialEntry>>,
    shared: usize,
) -> Result<Vec<ResultCell>> {
    groups
        .iter()
        .map(|(cell, bundles)| reduce_cell(*cell, bundles.iter().flatten(), shared))
        .collect()
}

/// Reduce task for the shared-dimension strategy
pub fn sum_reduce_task(groups: &Groups<CellKey, Scalar>) -> Result<Vec<ResultCell>> {
    Ok(groups
        .iter()
        .map(|(cell, partials)| sum_cell(*cell, partials))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapreduce::emitter::{plan_splits, DensityPolicy};
    use crate::mapreduce::shuffle::ShuffleStore;
    use crate::matrix::{DenseMatrix, MatrixId};
    use crate::registry::ShapeRegistry;

    fn context(combiner: bool, policy: DensityPolicy) -> MapContext {
        let a = DenseMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let b = DenseMatrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();

        let mut registry = ShapeRegistry::new();
        registry.register(MatrixId::new("A"), a.shape()).unwrap();
        registry.register(MatrixId::new("B"), b.shape()).unwrap();

        MapContext {
            roles: registry.roles().unwrap(),
            left: Arc::new(a),
            right: Arc::new(b),
            emitter: ElementEmitter::new(policy),
            combiner,
            partitions: 3,
        }
    }

    fn sorted(mut cells: Vec<ResultCell>) -> Vec<(usize, usize, Scalar)> {
        cells.sort_by_key(|c| (c.row, c.col));
        cells.into_iter().map(|c| (c.row, c.col, c.value)).collect()
    }

    const PRODUCT: [(usize, usize, Scalar); 4] =
        [(0, 0, 19.0), (0, 1, 22.0), (1, 0, 43.0), (1, 1, 50.0)];

    #[test]
    fn test_fan_out_pipeline() {
        for combiner in [true, false] {
            let ctx = context(combiner, DensityPolicy::Dense);
            let splits = plan_splits(&[ctx.roles.left(), ctx.roles.right()], 1);

            let mut store = ShuffleStore::new(ctx.partitions);
            for split in &splits {
                let output = fan_out_task(&ctx, split).unwrap();
                assert_eq!(output.elements, 2);
                assert_eq!(output.records, 4);
                store.commit(output.split, output.buckets);
            }

            let mut cells = Vec::new();
            for groups in store.into_groups() {
                cells.extend(fan_out_reduce_task(&groups, 2).unwrap());
            }
            assert_eq!(sorted(cells), PRODUCT.to_vec());
        }
    }

    #[test]
    fn test_shared_dimension_pipeline() {
        for combiner in [true, false] {
            let ctx = context(combiner, DensityPolicy::SkipZeros);
            let splits = plan_splits(&[ctx.roles.left(), ctx.roles.right()], 2);

            let mut keyed = ShuffleStore::new(ctx.partitions);
            for split in &splits {
                let output = key_task(&ctx, split).unwrap();
                keyed.commit(output.split, output.buckets);
            }

            let mut products = ShuffleStore::new(ctx.partitions);
            for (task, groups) in keyed.into_groups().iter().enumerate() {
                let output = join_task(task, groups, combiner, ctx.partitions).unwrap();
                products.commit(output.split, output.buckets);
            }

            let mut cells = Vec::new();
            for groups in products.into_groups() {
                cells.extend(sum_reduce_task(&groups).unwrap());
            }
            assert_eq!(sorted(cells), PRODUCT.to_vec());
        }
    }

    #[test]
    fn test_missing_split_is_detected_by_reducer() {
        let ctx = context(true, DensityPolicy::Dense);
        let splits = plan_splits(&[ctx.roles.left(), ctx.roles.right()], 1);

        // Lose the last split of the right operand
        let mut store = ShuffleStore::new(ctx.partitions);
        for split in &splits[..splits.len() - 1] {
            let output = fan_out_task(&ctx, split).unwrap();
            store.commit(output.split, output.buckets);
        }

        let failed = store
            .into_groups()
            .iter()
            .any(|groups| fan_out_reduce_task(groups, 2).is_err());
        assert!(failed);
    }
}
