//! CLI command handlers
//!
//! This module contains all CLI-related functionality:
//! - Argument parsing structures
//! - Command implementations
//! - Log level selection and exit codes

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands};
pub use router::execute_command;

use crate::config::{JobConfig, ENV_PREFIX, VALID_LOG_LEVELS};
use crate::error::MapmulError;

/// Pick the log filter for a run
///
/// `-v` flags win; otherwise `MAPMUL_LOG_LEVEL`, then the configuration file
/// named on the command line, then `info`.
pub async fn get_log_level(verbose: u8, command: &Commands) -> String {
    match verbose {
        0 => {}
        1 => return "debug".to_string(),
        _ => return "trace".to_string(),
    }

    if let Ok(level) = std::env::var(format!("{}LOG_LEVEL", ENV_PREFIX)) {
        let level = level.trim().to_ascii_lowercase();
        if VALID_LOG_LEVELS.contains(&level.as_str()) {
            return level;
        }
    }

    if let Commands::Multiply {
        config: Some(path), ..
    } = command
    {
        // A broken file is reported by the command itself
        if let Ok(config) = JobConfig::load(path).await {
            return config.log_level;
        }
    }

    "info".to_string()
}

/// Message shown to the user for a failed command
pub fn error_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<MapmulError>() {
        Some(err) => format!("[E{:04}] {}", err.code(), err.user_message()),
        None => error.to_string(),
    }
}

/// Process exit code for a failed command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<MapmulError>()
        .map(MapmulError::exit_code)
        .unwrap_or(1)
}
