use super::MatrixFormat;
use crate::error::{ErrorCode, MapmulError, Result};
use crate::mapreduce::ResultCell;
use crate::matrix::{DenseMatrix, MatrixSource, Scalar, Shape, SparseMatrix};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Lines that carry data, with their 1-based line numbers
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_value(field: &str, line: usize) -> Result<Scalar> {
    field.parse().map_err(|_| {
        MapmulError::parse(
            ErrorCode::VALIDATION_PARSE,
            format!("invalid number '{}'", field),
            Some(line),
        )
    })
}

fn parse_index(field: &str, line: usize) -> Result<usize> {
    field.parse().map_err(|_| {
        MapmulError::parse(
            ErrorCode::VALIDATION_PARSE,
            format!("invalid index '{}'", field),
            Some(line),
        )
    })
}

/// Parse dense row-major text: one row per line, whitespace-separated values
pub fn parse_dense(text: &str) -> Result<DenseMatrix> {
    let mut data = Vec::new();
    let mut rows = 0;
    let mut cols = None;

    for (line_no, line) in data_lines(text) {
        let start = data.len();
        for field in line.split_whitespace() {
            data.push(parse_value(field, line_no)?);
        }
        let width = data.len() - start;

        match cols {
            None => cols = Some(width),
            Some(expected) if expected != width => {
                return Err(MapmulError::parse(
                    ErrorCode::VALIDATION_RAGGED_ROW,
                    format!("row has {} values, expected {}", width, expected),
                    Some(line_no),
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    DenseMatrix::from_vec(Shape::new(rows, cols.unwrap_or(0)), data)
}

/// Parse `row col value` lines without any shape checks
///
/// Fields may be separated by whitespace or commas, so result files written as
/// `row, col, value` read back with the same parser.
pub fn parse_triples(text: &str) -> Result<Vec<(usize, usize, Scalar)>> {
    let mut triples = Vec::new();

    for (line_no, line) in data_lines(text) {
        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 3 {
            return Err(MapmulError::parse(
                ErrorCode::VALIDATION_PARSE,
                format!("expected 'row col value', found {} fields", fields.len()),
                Some(line_no),
            ));
        }
        triples.push((
            parse_index(fields[0], line_no)?,
            parse_index(fields[1], line_no)?,
            parse_value(fields[2], line_no)?,
        ));
    }

    Ok(triples)
}

/// Parse a sparse matrix of `row col value` triples, one per line
///
/// Without an explicit shape it is inferred as `(max(row) + 1, max(col) + 1)`.
pub fn parse_sparse(text: &str, shape: Option<Shape>) -> Result<SparseMatrix> {
    let entries = parse_triples(text)?;
    match shape {
        Some(shape) => SparseMatrix::new(shape, entries),
        None => SparseMatrix::from_triples(entries),
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MapmulError::from(e).with_path(path))
}

pub async fn read_dense(path: &Path) -> Result<DenseMatrix> {
    let text = read_text(path).await?;
    parse_dense(&text).map_err(|e| e.with_path(path))
}

pub async fn read_sparse(path: &Path, shape: Option<Shape>) -> Result<SparseMatrix> {
    let text = read_text(path).await?;
    parse_sparse(&text, shape).map_err(|e| e.with_path(path))
}

/// Read a result file of `row, col, value` lines
pub async fn read_results(path: &Path) -> Result<Vec<ResultCell>> {
    let text = read_text(path).await?;
    let triples = parse_triples(&text).map_err(|e| e.with_path(path))?;
    Ok(triples
        .into_iter()
        .map(|(row, col, value)| ResultCell::new(row, col, value))
        .collect())
}

/// Read a matrix in the given format
///
/// For dense files an explicit `shape` must agree with the file contents.
pub async fn read_matrix(
    path: &Path,
    format: MatrixFormat,
    shape: Option<Shape>,
) -> Result<Arc<dyn MatrixSource>> {
    let source: Arc<dyn MatrixSource> = match format {
        MatrixFormat::Dense => {
            let matrix = read_dense(path).await?;
            if let Some(expected) = shape.filter(|s| *s != matrix.shape()) {
                return Err(MapmulError::validation(
                    ErrorCode::VALIDATION_INVALID_SHAPE,
                    format!(
                        "{} holds a {} matrix, but {} was given",
                        path.display(),
                        matrix.shape(),
                        expected
                    ),
                ));
            }
            Arc::new(matrix)
        }
        MatrixFormat::Sparse => Arc::new(read_sparse(path, shape).await?),
    };

    debug!(
        "Read {} matrix {} from {}",
        format,
        source.shape(),
        path.display()
    );
    Ok(source)
}
