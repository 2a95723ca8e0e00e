//! Matrix and result files
//!
//! Two input formats are supported and chosen explicitly, since a dense file
//! with three columns is indistinguishable from a triple file:
//!
//! - dense: one row per line, whitespace-separated values
//! - sparse: `row col value` triples, one per line
//!
//! Results are written as unordered `row, col, value` lines. Blank lines and
//! lines starting with `#` are ignored on input.

pub mod reader;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use reader::{
    parse_dense, parse_sparse, parse_triples, read_dense, read_matrix, read_results, read_sparse,
};
pub use writer::{
    format_cell, render_results, write_dense, write_results, write_sparse, TripleWriter,
};

/// On-disk layout of an input matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixFormat {
    #[default]
    Dense,
    Sparse,
}

impl fmt::Display for MatrixFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixFormat::Dense => write!(f, "dense"),
            MatrixFormat::Sparse => write!(f, "sparse"),
        }
    }
}

impl FromStr for MatrixFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(MatrixFormat::Dense),
            "sparse" | "triples" => Ok(MatrixFormat::Sparse),
            other => Err(format!(
                "unknown matrix format '{}' (expected dense or sparse)",
                other
            )),
        }
    }
}
