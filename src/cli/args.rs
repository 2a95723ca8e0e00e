//! CLI argument structures

use crate::io::MatrixFormat;
use crate::mapreduce::StrategyKind;
use crate::matrix::Shape;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Multiply matrices with a map/shuffle/reduce pipeline
#[derive(Parser)]
#[command(name = "mapmul")]
#[command(about = "mapmul - Distributed-style matrix multiplication", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Multiply two matrices given in either order
    #[command(name = "multiply")]
    Multiply {
        /// First operand
        a: PathBuf,

        /// Second operand
        b: PathBuf,

        /// Write result lines here instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Input file format (dense or sparse)
        #[arg(long, default_value = "dense")]
        format: MatrixFormat,

        /// Shape of the first operand, e.g. 100x50 (sparse files without trailing zeros)
        #[arg(long, value_name = "RxC")]
        shape_a: Option<Shape>,

        /// Shape of the second operand
        #[arg(long, value_name = "RxC")]
        shape_b: Option<Shape>,

        /// Partitioning strategy (fan-out, shared-dimension or auto)
        #[arg(long)]
        strategy: Option<StrategyKind>,

        /// Disable the per-worker partial aggregator
        #[arg(long)]
        no_combiner: bool,

        /// Skip zero inputs and omit zero-valued result cells
        #[arg(long)]
        skip_zeros: bool,

        /// Maximum number of tasks running at once
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Path to a TOML configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Print run statistics as JSON to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Check a result file against a direct product of the operands
    #[command(name = "verify")]
    Verify {
        /// First operand
        a: PathBuf,

        /// Second operand
        b: PathBuf,

        /// Result file of `row, col, value` lines
        c: PathBuf,

        /// Input file format of the operands
        #[arg(long, default_value = "dense")]
        format: MatrixFormat,

        /// Shape of the first operand
        #[arg(long, value_name = "RxC")]
        shape_a: Option<Shape>,

        /// Shape of the second operand
        #[arg(long, value_name = "RxC")]
        shape_b: Option<Shape>,

        /// Per-cell relative tolerance
        #[arg(long, default_value = "1e-9")]
        tolerance: f64,
    },

    /// Write a random pair of compatible integer matrices
    #[command(name = "generate")]
    Generate {
        /// Rows of the first matrix
        #[arg(long)]
        rows: usize,

        /// Shared dimension
        #[arg(long)]
        shared: usize,

        /// Columns of the second matrix
        #[arg(long)]
        cols: usize,

        /// Smallest value (inclusive)
        #[arg(long, default_value = "-10", allow_hyphen_values = true)]
        low: i64,

        /// Largest value (exclusive)
        #[arg(long, default_value = "10", allow_hyphen_values = true)]
        high: i64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output path of the first matrix
        #[arg(long)]
        out_a: PathBuf,

        /// Output path of the second matrix
        #[arg(long)]
        out_b: PathBuf,

        /// Also write the reference product as result lines
        #[arg(long)]
        out_c: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_args() {
        let cli = Cli::try_parse_from([
            "mapmul",
            "multiply",
            "A.txt",
            "B.txt",
            "--strategy",
            "fan-out",
            "--shape-a",
            "3x4",
            "--no-combiner",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Multiply {
                strategy,
                shape_a,
                no_combiner,
                format,
                ..
            } => {
                assert_eq!(strategy, Some(StrategyKind::FanOut));
                assert_eq!(shape_a, Some(Shape::new(3, 4)));
                assert!(no_combiner);
                assert_eq!(format, MatrixFormat::Dense);
            }
            _ => panic!("expected multiply"),
        }
    }

    #[test]
    fn test_generate_negative_bounds() {
        let cli = Cli::try_parse_from([
            "mapmul", "generate", "--rows", "2", "--shared", "3", "--cols", "4", "--low", "-5",
            "--high", "-1", "--out-a", "a", "--out-b", "b",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate { low, high, .. } => {
                assert_eq!(low, -5);
                assert_eq!(high, -1);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_invalid_shape_is_rejected() {
        assert!(Cli::try_parse_from(["mapmul", "multiply", "A", "B", "--shape-a", "3by4"]).is_err());
    }
}
