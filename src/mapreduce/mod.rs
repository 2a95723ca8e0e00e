//! Map/shuffle/reduce matrix multiplication
//!
//! The pipeline is split into small stages that each own one concern:
//!
//! - [`emitter`] turns operand row ranges into element streams
//! - [`partition`] keys elements under the fan-out or shared-dimension strategy
//! - [`combiner`] aggregates map output before it is shuffled
//! - [`shuffle`] routes keyed records to reducer partitions
//! - [`reducer`] produces one value per destination cell
//! - [`assembler`] applies the output emission policy
//! - [`worker`] runs tasks on a bounded pool with retries
//! - [`job`] coordinates the phases

pub mod assembler;
pub mod combiner;
pub mod emitter;
pub mod job;
pub mod partition;
pub mod reducer;
pub mod shuffle;
pub mod stats;
pub mod tasks;
pub mod worker;

pub use assembler::{OutputAssembler, ResultSink};
pub use emitter::{DensityPolicy, ElementEmitter, InputSplit};
pub use job::{JobOutput, MatmulJob, Operand};
pub use partition::{PartitionStrategy, StrategyKind};
pub use reducer::ResultCell;
pub use stats::{JobStats, Phase};
pub use worker::WorkerPool;
