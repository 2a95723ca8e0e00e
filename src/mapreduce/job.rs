//! Multiplication job coordinator
//!
//! A job runs in strict phases:
//!
//! ```text
//! [ShapeDiscovery] → [Map] → [Reduce]                  (fan-out)
//! [ShapeDiscovery] → [Map] → [Join] → [Reduce]         (shared-dimension)
//!        ↓             ↓        ↓         ↓
//!     [Error]       [Error]  [Error]   [Error]
//! ```
//!
//! Shape discovery only looks at operand shapes and must lock both roles
//! before any map task is scheduled, so a shape mismatch is reported without
//! reading a single matrix entry. Every later phase fans work out over the
//! worker pool and commits task outputs into a shuffle store keyed by task id.

use super::assembler::{OutputAssembler, ResultSink};
use super::emitter::{plan_splits, DensityPolicy, ElementEmitter, InputSplit};
use super::partition::{CostInputs, PartitionStrategy};
use super::reducer::ResultCell;
use super::shuffle::ShuffleStore;
use super::stats::{JobStats, Phase};
use super::tasks::{
    fan_out_reduce_task, fan_out_task, join_task, key_task, sum_reduce_task, MapContext,
};
use super::worker::WorkerPool;
use crate::config::JobConfig;
use crate::error::Result;
use crate::matrix::{DenseMatrix, MatrixId, MatrixSource, Scalar, Shape};
use crate::registry::ShapeRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// An input matrix with its identity
#[derive(Clone)]
pub struct Operand {
    pub id: MatrixId,
    pub source: Arc<dyn MatrixSource>,
}

impl Operand {
    pub fn new(id: impl AsRef<str>, source: Arc<dyn MatrixSource>) -> Self {
        Self {
            id: MatrixId::new(id),
            source,
        }
    }

    pub fn from_matrix<M: MatrixSource + 'static>(id: impl AsRef<str>, matrix: M) -> Self {
        Self::new(id, Arc::new(matrix))
    }
}

impl std::fmt::Debug for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operand")
            .field("id", &self.id)
            .field("shape", &self.source.shape())
            .finish()
    }
}

/// Collected result of a job
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub shape: Shape,
    /// Result cells in no particular order
    pub cells: Vec<ResultCell>,
    pub stats: JobStats,
}

impl JobOutput {
    /// The product as a dense matrix; absent cells read as zero
    pub fn to_dense(&self) -> Result<DenseMatrix> {
        let mut dense = DenseMatrix::zeros(self.shape);
        for cell in &self.cells {
            dense.accept(*cell)?;
        }
        Ok(dense)
    }

    /// Cells sorted row-major as `(row, col, value)` triples
    pub fn sorted_triples(&self) -> Vec<(usize, usize, Scalar)> {
        let mut triples: Vec<_> = self.cells.iter().map(|c| (c.row, c.col, c.value)).collect();
        triples.sort_by_key(|&(row, col, _)| (row, col));
        triples
    }
}

/// Runs distributed multiplications under one configuration
#[derive(Debug, Clone)]
pub struct MatmulJob {
    config: JobConfig,
}

impl MatmulJob {
    pub fn new(config: JobConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Multiply two operands given in any order
    pub async fn run(&self, first: Operand, second: Operand) -> Result<JobOutput> {
        let mut cells = Vec::new();
        let (shape, stats) = self.execute(first, second, &mut cells).await?;
        Ok(JobOutput {
            shape,
            cells,
            stats,
        })
    }

    /// Multiply two operands, streaming result cells into `sink`
    pub async fn run_into<S>(&self, first: Operand, second: Operand, sink: &mut S) -> Result<JobStats>
    where
        S: ResultSink + ?Sized,
    {
        let (_, stats) = self.execute(first, second, sink).await?;
        Ok(stats)
    }

    async fn execute<S>(
        &self,
        first: Operand,
        second: Operand,
        sink: &mut S,
    ) -> Result<(Shape, JobStats)>
    where
        S: ResultSink + ?Sized,
    {
        let config = &self.config;
        config.validate()?;

        // Stage 1: lock roles before any entry is read
        let started = Instant::now();
        let mut registry = ShapeRegistry::new();
        registry.register(first.id.clone(), first.source.shape())?;
        registry.register(second.id.clone(), second.source.shape())?;
        let roles = registry.roles()?;
        let discovery = started.elapsed();

        let (left, right) = if roles.left().id == first.id {
            (first.source, second.source)
        } else {
            (second.source, first.source)
        };

        let costs = CostInputs {
            left_rows: roles.left().rows,
            shared: roles.shared_dimension(),
            right_cols: roles.right().cols,
            left_emitted: self.join_emission_estimate(left.as_ref()),
            right_emitted: self.join_emission_estimate(right.as_ref()),
        };
        let strategy = PartitionStrategy::select(config.strategy, &costs);
        debug!(
            "Estimated records: fan-out={}, shared-dimension={}",
            costs.fan_out_records(),
            costs.shared_dimension_records()
        );

        let policy = match strategy {
            PartitionStrategy::FanOut => {
                if config.skip_zeros {
                    warn!("Fan-out emits every input coordinate; skip_zeros only applies to output cells");
                }
                DensityPolicy::Dense
            }
            PartitionStrategy::SharedDimension if config.skip_zeros => DensityPolicy::SkipZeros,
            PartitionStrategy::SharedDimension => DensityPolicy::Dense,
        };

        let output_shape = roles.output_shape();
        info!(
            "Multiplying {} ({}) by {} ({}) into {} using {} strategy",
            roles.left().id,
            roles.left().shape(),
            roles.right().id,
            roles.right().shape(),
            output_shape,
            strategy
        );

        let mut stats = JobStats::new(
            strategy,
            roles.left().id.to_string(),
            roles.right().id.to_string(),
        );
        stats.record_phase(Phase::ShapeDiscovery, discovery);

        let splits = plan_splits(&[roles.left(), roles.right()], config.split_rows);
        stats.splits = splits.len();

        let ctx = Arc::new(MapContext {
            roles,
            left,
            right,
            emitter: ElementEmitter::new(policy),
            combiner: config.combiner,
            partitions: config.reduce_partitions,
        });
        let pool = WorkerPool::new(config.max_parallel, config.max_retries);
        let mut assembler = OutputAssembler::new(output_shape, config.skip_zeros);

        let cells = match strategy {
            PartitionStrategy::FanOut => self.run_fan_out(&pool, ctx, splits, &mut stats).await?,
            PartitionStrategy::SharedDimension => {
                self.run_shared_dimension(&pool, ctx, splits, &mut stats)
                    .await?
            }
        };

        for cell in cells {
            assembler.accept(cell, sink)?;
        }
        stats.result_cells = assembler.finish(sink)?;

        info!(
            "Job complete: {} result cells in {:.3}s ({} elements emitted, {} records shuffled, {} retries)",
            stats.result_cells,
            stats.total_duration().as_secs_f64(),
            stats.elements_emitted,
            stats.shuffled_records,
            stats.retries
        );
        Ok((output_shape, stats))
    }

    /// Elements an operand emits under the join strategy
    fn join_emission_estimate(&self, source: &dyn MatrixSource) -> usize {
        let cells = source.shape().cells();
        if self.config.skip_zeros {
            source.nonzeros().unwrap_or(cells)
        } else {
            cells
        }
    }

    async fn run_fan_out(
        &self,
        pool: &WorkerPool,
        ctx: Arc<MapContext>,
        splits: Vec<InputSplit>,
        stats: &mut JobStats,
    ) -> Result<Vec<ResultCell>> {
        let partitions = ctx.partitions;
        let shared = ctx.roles.shared_dimension();

        let started = Instant::now();
        let map_ctx = Arc::clone(&ctx);
        let mapped = pool
            .run(Phase::Map, splits, move |split| fan_out_task(&map_ctx, split))
            .await?;
        stats.retries += mapped.retries;

        let mut store = ShuffleStore::new(partitions);
        for output in mapped.outputs {
            stats.elements_emitted += output.elements;
            stats.map_records += output.records;
            stats.shuffled_records += output.buckets.records();
            store.commit(output.split, output.buckets);
        }
        stats.record_phase(Phase::Map, started.elapsed());
        info!(
            "Map phase complete: {} elements, {} entries in {} records",
            stats.elements_emitted, stats.map_records, stats.shuffled_records
        );

        let started = Instant::now();
        let groups = store.into_groups();
        stats.reduce_keys = groups.iter().map(Vec::len).sum();
        let reduced = pool
            .run(Phase::Reduce, groups, move |groups| {
                fan_out_reduce_task(groups, shared)
            })
            .await?;
        stats.retries += reduced.retries;
        stats.record_phase(Phase::Reduce, started.elapsed());
        info!("Reduce phase complete: {} cells", stats.reduce_keys);

        Ok(reduced.outputs.into_iter().flatten().collect())
    }

    async fn run_shared_dimension(
        &self,
        pool: &WorkerPool,
        ctx: Arc<MapContext>,
        splits: Vec<InputSplit>,
        stats: &mut JobStats,
    ) -> Result<Vec<ResultCell>> {
        let partitions = ctx.partitions;
        let combiner = ctx.combiner;

        let started = Instant::now();
        let map_ctx = Arc::clone(&ctx);
        let mapped = pool
            .run(Phase::Map, splits, move |split| key_task(&map_ctx, split))
            .await?;
        stats.retries += mapped.retries;

        let mut keyed = ShuffleStore::new(partitions);
        for output in mapped.outputs {
            stats.elements_emitted += output.elements;
            stats.map_records += output.records;
            stats.shuffled_records += output.buckets.records();
            keyed.commit(output.split, output.buckets);
        }
        stats.record_phase(Phase::Map, started.elapsed());
        info!(
            "Map phase complete: {} elements keyed by shared index",
            stats.elements_emitted
        );

        let started = Instant::now();
        let join_inputs: Vec<_> = keyed.into_groups().into_iter().enumerate().collect();
        let joined = pool
            .run(Phase::Join, join_inputs, move |(task, groups)| {
                join_task(*task, groups, combiner, partitions)
            })
            .await?;
        stats.retries += joined.retries;

        let mut products = ShuffleStore::new(partitions);
        let mut product_count = 0;
        for output in joined.outputs {
            product_count += output.records;
            stats.map_records += output.records;
            stats.shuffled_records += output.buckets.records();
            products.commit(output.split, output.buckets);
        }
        stats.record_phase(Phase::Join, started.elapsed());
        info!(
            "Join phase complete: {} partial products, {} after combining",
            product_count,
            products.records()
        );

        let started = Instant::now();
        let groups = products.into_groups();
        stats.reduce_keys = groups.iter().map(Vec::len).sum();
        let reduced = pool
            .run(Phase::Reduce, groups, sum_reduce_task)
            .await?;
        stats.retries += reduced.retries;
        stats.record_phase(Phase::Reduce, started.elapsed());
        info!("Reduce phase complete: {} cells", stats.reduce_keys);

        Ok(reduced.outputs.into_iter().flatten().collect())
    }
}
