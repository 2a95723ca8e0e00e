//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use mapmul::matrix::{DenseMatrix, MatrixSource, Scalar};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory holding matrix files for a test
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the path to the test directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file in the test directory
    pub fn create_file(&self, path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let full_path = self.temp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;
        Ok(full_path)
    }

    /// Write a dense matrix given as rows
    pub fn dense_file(&self, name: &str, rows: &[&[Scalar]]) -> Result<PathBuf> {
        let content: String = rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                format!("{}\n", cells.join(" "))
            })
            .collect();
        self.create_file(name, &content)
    }

    /// Read a file from the test directory
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(fs::read_to_string(self.temp_dir.path().join(path))?)
    }
}

/// Parse `row, col, value` lines into sorted triples
pub fn parse_result_lines(text: &str) -> Vec<(usize, usize, Scalar)> {
    let mut triples: Vec<_> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            assert_eq!(fields.len(), 3, "malformed result line: {line}");
            (
                fields[0].parse().unwrap(),
                fields[1].parse().unwrap(),
                fields[2].parse().unwrap(),
            )
        })
        .collect();
    triples.sort_by_key(|&(row, col, _)| (row, col));
    triples
}

/// All cells of a dense matrix as row-major triples
pub fn dense_triples(matrix: &DenseMatrix) -> Vec<(usize, usize, Scalar)> {
    let shape = matrix.shape();
    (0..shape.rows)
        .flat_map(|row| (0..shape.cols).map(move |col| (row, col)))
        .map(|(row, col)| (row, col, matrix.get(row, col)))
        .collect()
}

/// Common assertion helpers
pub mod assertions {
    use mapmul::matrix::Scalar;

    /// Assert that two triple lists agree cell by cell
    pub fn assert_triples_eq(actual: &[(usize, usize, Scalar)], expected: &[(usize, usize, Scalar)]) {
        assert_eq!(
            actual.len(),
            expected.len(),
            "cell count differs: {actual:?} vs {expected:?}"
        );
        for (a, e) in actual.iter().zip(expected) {
            assert_eq!((a.0, a.1), (e.0, e.1), "cell order differs");
            assert!(
                (a.2 - e.2).abs() <= 1e-9 * e.2.abs().max(1.0),
                "cell ({}, {}) is {} but expected {}",
                a.0,
                a.1,
                a.2,
                e.2
            );
        }
    }
}
