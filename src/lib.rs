//! # mapmul
//!
//! Matrix multiplication expressed as a map/shuffle/reduce job.
//!
//! ## Usage
//!
//! ```bash
//! mapmul multiply A.txt B.txt [--strategy fan-out|shared-dimension|auto] [-o C.txt]
//! mapmul verify A.txt B.txt C.txt
//! mapmul generate --rows 100 --shared 50 --cols 200 --out-a A.txt --out-b B.txt
//! ```
//!
//! ## Modules
//!
//! - `matrix` - Shapes, element records and the read-only matrix sources
//! - `registry` - Operand registration and left/right role assignment
//! - `mapreduce` - Emitter, partitioning strategies, shuffle, reducers and the job driver
//! - `config` - Job configuration from TOML, environment and CLI flags
//! - `io` - Dense, sparse and result file formats
//! - `verify` - Reference product and result comparison
//! - `generate` - Random integer operands for testing
//! - `error` - Error type and error codes
//! - `cli` - Command line interface
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod io;
pub mod mapreduce;
pub mod matrix;
pub mod registry;
pub mod verify;

pub use config::JobConfig;
pub use error::{MapmulError, Result};
pub use mapreduce::{JobOutput, MatmulJob, Operand, PartitionStrategy, ResultCell, StrategyKind};
pub use matrix::{DenseMatrix, MatrixSource, Shape, SparseMatrix};
pub use registry::{OperandRoles, ShapeRegistry};
