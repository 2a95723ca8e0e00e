use crate::matrix::{MatrixId, Shape};
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for the mapmul library
#[derive(Error, Debug)]
pub enum MapmulError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(
        "[E{code:04}] Shape mismatch: {first} ({first_shape}) and {second} ({second_shape}) cannot be multiplied in either order"
    )]
    ShapeMismatch {
        code: u16,
        first: MatrixId,
        first_shape: Shape,
        second: MatrixId,
        second_shape: Shape,
    },

    #[error("[E{code:04}] Protocol error: {message}")]
    Protocol { code: u16, message: String },

    #[error("[E{code:04}] Join integrity error at cell ({row}, {col}): {message}")]
    JoinIntegrity {
        code: u16,
        row: usize,
        col: usize,
        message: String,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Parse error: {message}")]
    Parse {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        line: Option<usize>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation { code: u16, message: String },
}

impl MapmulError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a shape mismatch error for two operands
    pub fn shape_mismatch(
        first: MatrixId,
        first_shape: Shape,
        second: MatrixId,
        second_shape: Shape,
    ) -> Self {
        Self::ShapeMismatch {
            code: ErrorCode::SHAPE_MISMATCH,
            first,
            first_shape,
            second,
            second_shape,
        }
    }

    /// Create a protocol error with specific code
    pub fn protocol(code: u16, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Create a join integrity error for a destination cell
    pub fn join_integrity(code: u16, row: usize, col: usize, message: impl Into<String>) -> Self {
        Self::JoinIntegrity {
            code,
            row,
            col,
            message: message.into(),
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::storage_with_code(ErrorCode::STORAGE_GENERIC, message, None)
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a parse error for a line of matrix text
    pub fn parse(code: u16, message: impl Into<String>, line: Option<usize>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            path: None,
            line,
        }
    }

    /// Create an execution error with specific code
    pub fn execution(code: u16, message: impl Into<String>) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error with specific code
    pub fn validation(code: u16, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Execution { source: src, .. } => {
                *src = Some(source.into());
            }
            _ => {}
        }
        self
    }

    /// Attach the file the error refers to
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::Storage { path: p, .. } | Self::Parse { path: p, .. } => {
                *p = Some(path.into());
            }
            _ => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Protocol { message, .. }
            | Self::JoinIntegrity { message, .. }
            | Self::Storage { message, .. }
            | Self::Parse { message, .. }
            | Self::Execution { message, .. }
            | Self::Validation { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            Self::ShapeMismatch { .. } => {}
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::ShapeMismatch { .. } => 3,
            Self::Protocol { .. } => 4,
            Self::Storage { .. } => 5,
            Self::Parse { .. } => 6,
            Self::Execution { .. } => 7,
            Self::JoinIntegrity { .. } => 8,
            Self::Validation { .. } => 9,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::ShapeMismatch { code, .. }
            | Self::Protocol { code, .. }
            | Self::JoinIntegrity { code, .. }
            | Self::Storage { code, .. }
            | Self::Parse { code, .. }
            | Self::Execution { code, .. }
            | Self::Validation { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::ShapeMismatch {
                first,
                first_shape,
                second,
                second_shape,
                ..
            } => format!(
                "Cannot multiply {} ({}) with {} ({}): no operand order has a shared dimension",
                first, first_shape, second, second_shape
            ),
            Self::Protocol { message, .. } => format!("Operand protocol violated: {}", message),
            Self::JoinIntegrity {
                row, col, message, ..
            } => format!("Result cell ({}, {}) could not be joined: {}", row, col, message),
            Self::Storage { message, path, .. } => match path {
                Some(p) => format!("Storage error at {}: {}", p.display(), message),
                None => format!("Storage error: {}", message),
            },
            Self::Parse {
                message,
                path,
                line,
                ..
            } => {
                let mut location = String::new();
                if let Some(p) = path {
                    location.push_str(&p.display().to_string());
                }
                if let Some(l) = line {
                    if !location.is_empty() {
                        location.push(':');
                    }
                    location.push_str(&format!("line {}", l));
                }
                if location.is_empty() {
                    format!("Malformed matrix: {}", message)
                } else {
                    format!("Malformed matrix at {}: {}", location, message)
                }
            }
            Self::Execution { message, .. } => format!("Execution error: {}", message),
            Self::Validation { message, .. } => format!("Validation error: {}", message),
        }
    }

    /// Whether a worker may rerun the task that produced this error
    ///
    /// Only storage failures are transient. Shape, protocol and join errors are
    /// deterministic functions of the input and would fail again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage { code, .. } => {
                *code == ErrorCode::STORAGE_TEMPORARY || *code == ErrorCode::STORAGE_IO_ERROR
            }
            _ => false,
        }
    }
}

/// Type alias for Results using MapmulError
pub type Result<T> = std::result::Result<T, MapmulError>;

impl From<std::io::Error> for MapmulError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut => {
                (ErrorCode::STORAGE_TEMPORARY, "Resource temporarily unavailable")
            }
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        MapmulError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<toml::de::Error> for MapmulError {
    fn from(err: toml::de::Error) -> Self {
        MapmulError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "A.txt");
        let err = MapmulError::from(io_err)
            .with_path("A.txt")
            .with_context("while reading left operand");

        assert_eq!(err.code(), ErrorCode::STORAGE_NOT_FOUND);
        assert!(err.to_string().contains("[E3004]"));
        assert!(err.user_message().contains("A.txt"));
        assert!(err.user_message().contains("while reading left operand"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = MapmulError::shape_mismatch(
            MatrixId::new("A"),
            Shape::new(2, 3),
            MatrixId::new("B"),
            Shape::new(4, 5),
        );

        assert_eq!(err.code(), ErrorCode::SHAPE_MISMATCH);
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("2x3"));
        assert!(err.to_string().contains("4x5"));
    }

    #[test]
    fn test_parse_error_location() {
        let err = MapmulError::parse(ErrorCode::VALIDATION_PARSE, "bad number 'x'", Some(4))
            .with_path("B.txt");

        assert_eq!(
            err.user_message(),
            "Malformed matrix at B.txt:line 4: bad number 'x'"
        );
    }

    #[test]
    fn test_retryable_errors() {
        let transient = MapmulError::storage_with_code(ErrorCode::STORAGE_TEMPORARY, "busy", None);
        assert!(transient.is_retryable());

        let join = MapmulError::join_integrity(ErrorCode::JOIN_MISSING_INDEX, 0, 0, "gap");
        assert!(!join.is_retryable());

        let missing = MapmulError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        assert!(!missing.is_retryable());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            MapmulError::config("x"),
            MapmulError::shape_mismatch(
                MatrixId::new("a"),
                Shape::new(1, 1),
                MatrixId::new("b"),
                Shape::new(2, 2),
            ),
            MapmulError::protocol(ErrorCode::PROTOCOL_GENERIC, "x"),
            MapmulError::storage("x"),
            MapmulError::parse(ErrorCode::VALIDATION_PARSE, "x", None),
            MapmulError::execution(ErrorCode::EXEC_GENERIC, "x"),
            MapmulError::join_integrity(ErrorCode::JOIN_GENERIC, 0, 0, "x"),
            MapmulError::validation(ErrorCode::VALIDATION_GENERIC, "x"),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c != 0));
    }
}
