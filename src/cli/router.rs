//! Command routing
//!
//! Routes parsed CLI commands to their implementations.

use crate::cli::args::Commands;
use crate::cli::commands::*;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Multiply {
            a,
            b,
            output,
            format,
            shape_a,
            shape_b,
            strategy,
            no_combiner,
            skip_zeros,
            max_parallel,
            config,
            stats,
        } => {
            run_multiply(MultiplyParams {
                a,
                b,
                output,
                format,
                shape_a,
                shape_b,
                strategy,
                no_combiner,
                skip_zeros,
                max_parallel,
                config,
                stats,
            })
            .await
        }
        Commands::Verify {
            a,
            b,
            c,
            format,
            shape_a,
            shape_b,
            tolerance,
        } => {
            run_verify(VerifyParams {
                a,
                b,
                c,
                format,
                shape_a,
                shape_b,
                tolerance,
            })
            .await
        }
        Commands::Generate {
            rows,
            shared,
            cols,
            low,
            high,
            seed,
            out_a,
            out_b,
            out_c,
        } => {
            run_generate(GenerateParams {
                rows,
                shared,
                cols,
                low,
                high,
                seed,
                out_a,
                out_b,
                out_c,
            })
            .await
        }
    }
}
