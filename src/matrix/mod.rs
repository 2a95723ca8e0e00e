//! Matrix model shared by every stage of the pipeline
//!
//! Operands enter the pipeline as [`MatrixSource`] implementations identified by a
//! [`MatrixId`]. The shape registry turns them into [`MatrixHandle`]s with an
//! assigned [`Role`], and the element emitter breaks them into [`MatrixElement`]s.

pub mod dense;
pub mod source;
pub mod sparse;

use crate::error::{ErrorCode, MapmulError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use dense::DenseMatrix;
pub use source::MatrixSource;
pub use sparse::SparseMatrix;

/// Scalar type carried through products and sums
pub type Scalar = f64;

/// Dimensions of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of coordinates in the matrix
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Parses `ROWSxCOLS`, e.g. `100x50`
impl FromStr for Shape {
    type Err = MapmulError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            MapmulError::validation(
                ErrorCode::VALIDATION_INVALID_SHAPE,
                format!("expected ROWSxCOLS, got '{}'", s),
            )
        };

        let (rows, cols) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let rows = rows.trim().parse().map_err(|_| invalid())?;
        let cols = cols.trim().parse().map_err(|_| invalid())?;
        Ok(Shape::new(rows, cols))
    }
}

/// Identity of an input matrix, usually derived from its file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixId(Arc<str>);

impl MatrixId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatrixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatrixId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Operand side of the product once roles are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Role of a registered matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Unassigned,
    Left,
    Right,
}

impl Role {
    pub fn side(&self) -> Option<Side> {
        match self {
            Role::Unassigned => None,
            Role::Left => Some(Side::Left),
            Role::Right => Some(Side::Right),
        }
    }
}

impl From<Side> for Role {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => Role::Left,
            Side::Right => Role::Right,
        }
    }
}

/// A matrix known to the shape registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixHandle {
    pub id: MatrixId,
    pub rows: usize,
    pub cols: usize,
    pub role: Role,
}

impl MatrixHandle {
    pub fn new(id: MatrixId, shape: Shape) -> Self {
        Self {
            id,
            rows: shape.rows,
            cols: shape.cols,
            role: Role::Unassigned,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    pub(crate) fn with_role(mut self, side: Side) -> Self {
        self.role = side.into();
        self
    }
}

/// One stored value of an input matrix
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixElement {
    pub matrix_id: MatrixId,
    pub row: usize,
    pub col: usize,
    pub value: Scalar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_parse() {
        assert_eq!("100x50".parse::<Shape>().unwrap(), Shape::new(100, 50));
        assert_eq!(" 3 X 4 ".parse::<Shape>().unwrap(), Shape::new(3, 4));
        assert!("100".parse::<Shape>().is_err());
        assert!("ax3".parse::<Shape>().is_err());
    }

    #[test]
    fn test_shape_display_round_trip() {
        let shape = Shape::new(7, 2);
        assert_eq!(shape.to_string(), "7x2");
        assert_eq!(shape.to_string().parse::<Shape>().unwrap(), shape);
    }

    #[test]
    fn test_role_side() {
        assert_eq!(Role::Unassigned.side(), None);
        assert_eq!(Role::from(Side::Right).side(), Some(Side::Right));
    }
}
