//! Operand role assignment
//!
//! The shape registry decides which input is the left operand and which is the
//! right one from their shapes alone. It is a three-state machine that runs to
//! completion before any partitioning work is scheduled; its final state is an
//! immutable [`OperandRoles`] value shared with every worker.
//!
//! ```text
//! ┌────────────┐  register(a)  ┌────────┐  register(b)  ┌────────┐
//! │ Unassigned │ ────────────▶ │ OneSet │ ────────────▶ │ Locked │
//! └────────────┘               └────────┘               └────────┘
//!                                   │                        │
//!                                   │ shapes incompatible    │ register(c)
//!                                   ▼                        ▼
//!                             ShapeMismatch            ProtocolError
//! ```
//!
//! Given a recorded matrix `(rA, cA)` and a new one `(r, c)`, `cA == r` makes the
//! recorded matrix the left operand; failing that, `c == rA` makes the new matrix
//! the left operand. When both hold (square operands of the same size) the first
//! test wins, so the first registered matrix is the left operand.
//!
//! ## Usage Example
//!
//! ```rust
//! use mapmul::matrix::{MatrixId, Shape};
//! use mapmul::registry::ShapeRegistry;
//!
//! let mut registry = ShapeRegistry::new();
//! registry.register(MatrixId::new("B"), Shape::new(3, 4)).unwrap();
//! registry.register(MatrixId::new("A"), Shape::new(2, 3)).unwrap();
//!
//! let roles = registry.roles().unwrap();
//! assert_eq!(roles.left().id.as_str(), "A");
//! assert_eq!(roles.shared_dimension(), 3);
//! ```

use crate::error::{ErrorCode, MapmulError, Result};
use crate::matrix::{MatrixHandle, MatrixId, Shape, Side};
use std::sync::Arc;
use tracing::{debug, info};

/// Both operands with their locked roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandRoles {
    left: MatrixHandle,
    right: MatrixHandle,
}

impl OperandRoles {
    pub fn left(&self) -> &MatrixHandle {
        &self.left
    }

    pub fn right(&self) -> &MatrixHandle {
        &self.right
    }

    pub fn handle(&self, side: Side) -> &MatrixHandle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// The summed-over dimension `k = cols(left) = rows(right)`
    pub fn shared_dimension(&self) -> usize {
        self.left.cols
    }

    /// Shape of the product
    pub fn output_shape(&self) -> Shape {
        Shape::new(self.left.rows, self.right.cols)
    }

    /// Side played by the matrix with the given id
    pub fn side_of(&self, id: &MatrixId) -> Result<Side> {
        if self.left.id == *id {
            Ok(Side::Left)
        } else if self.right.id == *id {
            Ok(Side::Right)
        } else {
            Err(MapmulError::protocol(
                ErrorCode::PROTOCOL_UNKNOWN_OPERAND,
                format!("matrix '{}' was never registered", id),
            ))
        }
    }

    pub fn handle_of(&self, id: &MatrixId) -> Result<&MatrixHandle> {
        self.side_of(id).map(|side| self.handle(side))
    }
}

/// State of the role-assignment machine
#[derive(Debug, Clone)]
pub enum RegistryState {
    Unassigned,
    OneSet { first: MatrixHandle },
    Locked { roles: Arc<OperandRoles> },
}

impl RegistryState {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryState::Unassigned => "Unassigned",
            RegistryState::OneSet { .. } => "OneSet",
            RegistryState::Locked { .. } => "Locked",
        }
    }
}

/// Decide roles for a recorded matrix and a newly arrived one
///
/// Pure function: returns the locked roles or a shape mismatch.
pub fn assign_roles(first: &MatrixHandle, second: MatrixHandle) -> Result<OperandRoles> {
    if first.cols == second.rows {
        Ok(OperandRoles {
            left: first.clone().with_role(Side::Left),
            right: second.with_role(Side::Right),
        })
    } else if second.cols == first.rows {
        Ok(OperandRoles {
            left: second.with_role(Side::Left),
            right: first.clone().with_role(Side::Right),
        })
    } else {
        Err(MapmulError::shape_mismatch(
            first.id.clone(),
            first.shape(),
            second.id.clone(),
            second.shape(),
        ))
    }
}

/// Apply one registration to the current state
///
/// Pure function: the input state is left untouched so a rejected
/// registration does not disturb an already locked registry.
pub fn apply_registration(
    state: &RegistryState,
    id: MatrixId,
    shape: Shape,
) -> Result<RegistryState> {
    let handle = MatrixHandle::new(id, shape);
    match state {
        RegistryState::Unassigned => Ok(RegistryState::OneSet { first: handle }),
        RegistryState::OneSet { first } if first.id == handle.id => Err(MapmulError::protocol(
            ErrorCode::PROTOCOL_DUPLICATE_OPERAND,
            format!("matrix '{}' is already registered", handle.id),
        )),
        RegistryState::OneSet { first } => {
            let roles = assign_roles(first, handle)?;
            Ok(RegistryState::Locked {
                roles: Arc::new(roles),
            })
        }
        RegistryState::Locked { .. } => Err(MapmulError::protocol(
            ErrorCode::PROTOCOL_TOO_MANY_OPERANDS,
            format!(
                "cannot register '{}': both operands are already locked",
                handle.id
            ),
        )),
    }
}

/// Tracks operand shapes until both roles are locked
#[derive(Debug)]
pub struct ShapeRegistry {
    state: RegistryState,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            state: RegistryState::Unassigned,
        }
    }

    /// Record a matrix; the second registration locks the roles
    pub fn register(&mut self, id: MatrixId, shape: Shape) -> Result<()> {
        debug!("Registering matrix {} with shape {}", id, shape);
        let next = apply_registration(&self.state, id, shape)?;
        if let RegistryState::Locked { roles } = &next {
            info!(
                "Operand roles locked: left={} ({}), right={} ({})",
                roles.left().id,
                roles.left().shape(),
                roles.right().id,
                roles.right().shape()
            );
        }
        self.state = next;
        Ok(())
    }

    /// The locked roles, shared read-only with every worker
    pub fn roles(&self) -> Result<Arc<OperandRoles>> {
        match &self.state {
            RegistryState::Locked { roles } => Ok(Arc::clone(roles)),
            other => Err(MapmulError::protocol(
                ErrorCode::PROTOCOL_TOO_FEW_OPERANDS,
                format!(
                    "roles requested in state {}: two operands must be registered",
                    other.name()
                ),
            )),
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, RegistryState::Locked { .. })
    }
}
