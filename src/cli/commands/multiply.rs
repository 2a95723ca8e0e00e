//! `multiply` command

use crate::config::{ConfigOverrides, JobConfig};
use crate::error::MapmulError;
use crate::io::{read_matrix, MatrixFormat, TripleWriter};
use crate::mapreduce::{MatmulJob, Operand, StrategyKind};
use crate::matrix::Shape;
use anyhow::Result;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::info;

/// Parameters of one `multiply` invocation
#[derive(Debug, Clone)]
pub struct MultiplyParams {
    pub a: PathBuf,
    pub b: PathBuf,
    pub output: Option<PathBuf>,
    pub format: MatrixFormat,
    pub shape_a: Option<Shape>,
    pub shape_b: Option<Shape>,
    pub strategy: Option<StrategyKind>,
    pub no_combiner: bool,
    pub skip_zeros: bool,
    pub max_parallel: Option<usize>,
    pub config: Option<PathBuf>,
    pub stats: bool,
}

impl MultiplyParams {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            strategy: self.strategy,
            combiner: self.no_combiner.then_some(false),
            skip_zeros: self.skip_zeros.then_some(true),
            max_parallel: self.max_parallel,
            log_level: None,
        }
    }
}

/// Operand ids for two paths; the same file given twice gets a suffix
pub fn operand_ids(a: &Path, b: &Path) -> (String, String) {
    let first = a.display().to_string();
    let second = b.display().to_string();
    if first == second {
        let renamed = format!("{}#2", second);
        (first, renamed)
    } else {
        (first, second)
    }
}

/// Temp file next to `path` so the final rename stays on one filesystem
fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = NamedTempFile::new_in(dir).map_err(|e| MapmulError::from(e).with_path(dir))?;
    Ok(file)
}

/// Execute the multiply command
pub async fn run_multiply(params: MultiplyParams) -> Result<()> {
    let started = Instant::now();
    let config = JobConfig::resolve(params.config.as_deref(), &params.overrides()).await?;

    let (id_a, id_b) = operand_ids(&params.a, &params.b);
    let a = read_matrix(&params.a, params.format, params.shape_a).await?;
    let b = read_matrix(&params.b, params.format, params.shape_b).await?;

    let job = MatmulJob::new(config);
    let first = Operand::new(id_a, a);
    let second = Operand::new(id_b, b);

    let stats = match &params.output {
        Some(path) => {
            // Results land in a sibling temp file that only replaces `path` once the
            // job succeeds; dropping it on error removes it
            let staged = staging_file(path)?;
            let mut writer = TripleWriter::new(BufWriter::new(staged));
            let stats = job.run_into(first, second, &mut writer).await?;
            let staged = writer
                .into_inner()?
                .into_inner()
                .map_err(|e| MapmulError::from(e.into_error()).with_path(path))?;
            staged
                .persist(path)
                .map_err(|e| MapmulError::from(e.error).with_path(path))?;
            info!("Wrote {} result cells to {}", stats.result_cells, path.display());
            stats
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = TripleWriter::new(BufWriter::new(stdout.lock()));
            let stats = job.run_into(first, second, &mut writer).await?;
            writer.into_inner()?;
            stats
        }
    };

    if params.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }
    eprintln!(
        "Multiplied {} by {} with {} strategy in {:.3}s",
        stats.left,
        stats.right,
        stats.strategy,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_ids() {
        let (a, b) = operand_ids(Path::new("data/A.txt"), Path::new("data/B.txt"));
        assert_eq!(a, "data/A.txt");
        assert_eq!(b, "data/B.txt");

        let (a, b) = operand_ids(Path::new("M.txt"), Path::new("M.txt"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_flags_only_override_when_set() {
        let params = MultiplyParams {
            a: "A".into(),
            b: "B".into(),
            output: None,
            format: MatrixFormat::Dense,
            shape_a: None,
            shape_b: None,
            strategy: None,
            no_combiner: false,
            skip_zeros: false,
            max_parallel: None,
            config: None,
            stats: false,
        };
        let overrides = params.overrides();
        assert_eq!(overrides.combiner, None);
        assert_eq!(overrides.skip_zeros, None);

        let overrides = MultiplyParams {
            no_combiner: true,
            skip_zeros: true,
            ..params
        }
        .overrides();
        assert_eq!(overrides.combiner, Some(false));
        assert_eq!(overrides.skip_zeros, Some(true));
    }
}
