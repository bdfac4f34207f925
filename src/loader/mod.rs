//! Input table loading.
//!
//! The expression matrix is comma-delimited with a leading `rid` column;
//! the gene annotation table is tab-delimited and keyed by `pr_gene_id`.

use crate::error::PipelineError;
use crate::models::{
    canonical_gene_id, AnnotationRow, ExpressionMatrix, GeneAnnotation, ANNOTATION_ID_COLUMN,
    ANNOTATION_LANDMARK_COLUMN, ANNOTATION_SYMBOL_COLUMN, MATRIX_ID_COLUMN,
};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Cell markers treated as missing values.
const MISSING_MARKERS: [&str; 5] = ["", "nan", "na", "n/a", "null"];

/// Load the expression matrix from a CSV file.
pub fn load_expression_matrix(path: &Path) -> Result<ExpressionMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open expression matrix: {}", path.display()))?;
    let matrix = read_expression_matrix(file)
        .with_context(|| format!("Failed to load expression matrix: {}", path.display()))?;

    info!(
        "Loaded expression matrix: {} genes x {} samples",
        matrix.row_count(),
        matrix.columns.len()
    );
    Ok(matrix)
}

/// Load the gene annotation table from a tab-delimited file.
pub fn load_gene_annotation(path: &Path) -> Result<GeneAnnotation> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open gene annotation: {}", path.display()))?;
    let annotation = read_gene_annotation(file)
        .with_context(|| format!("Failed to load gene annotation: {}", path.display()))?;

    info!(
        "Loaded gene annotation: {} genes ({} landmark)",
        annotation.rows.len(),
        annotation.landmark_count()
    );
    Ok(annotation)
}

/// Parse an expression matrix from comma-delimited text.
pub fn read_expression_matrix<R: Read>(reader: R) -> Result<ExpressionMatrix, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::InputShape(format!("unreadable matrix header: {}", e)))?
        .clone();

    let id_index = headers
        .iter()
        .position(|h| h.trim() == MATRIX_ID_COLUMN)
        .ok_or_else(|| {
            PipelineError::InputShape(format!(
                "expression matrix has no '{}' column",
                MATRIX_ID_COLUMN
            ))
        })?;

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != id_index)
        .map(|(_, h)| h.trim().to_string())
        .collect();

    let mut matrix = ExpressionMatrix {
        row_ids: Vec::new(),
        columns,
        values: Vec::new(),
    };

    for (row_number, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::InputShape(format!("matrix row {}: {}", row_number + 1, e))
        })?;

        let raw_id = record.get(id_index).unwrap_or_default();
        let mut row = Vec::with_capacity(matrix.columns.len());
        for (i, cell) in record.iter().enumerate() {
            if i == id_index {
                continue;
            }
            let value = parse_cell(cell).ok_or_else(|| {
                PipelineError::InputShape(format!(
                    "matrix row {} column '{}': not a number: {:?}",
                    row_number + 1,
                    matrix.columns[row.len()],
                    cell
                ))
            })?;
            row.push(value);
        }

        matrix.row_ids.push(canonical_gene_id(raw_id));
        matrix.values.push(row);
    }

    debug!("Parsed {} matrix rows", matrix.row_count());
    Ok(matrix)
}

/// Parse a gene annotation table from tab-delimited text.
pub fn read_gene_annotation<R: Read>(reader: R) -> Result<GeneAnnotation, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::InputShape(format!("unreadable annotation header: {}", e)))?
        .clone();

    let find = |name: &str| {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            PipelineError::InputShape(format!("gene annotation has no '{}' column", name))
        })
    };
    let id_index = find(ANNOTATION_ID_COLUMN)?;
    let symbol_index = find(ANNOTATION_SYMBOL_COLUMN)?;
    let landmark_index = find(ANNOTATION_LANDMARK_COLUMN)?;

    let mut annotation = GeneAnnotation::default();
    for (row_number, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::InputShape(format!("annotation row {}: {}", row_number + 1, e))
        })?;

        let symbol = record.get(symbol_index).unwrap_or_default().trim();
        annotation.rows.push(AnnotationRow {
            gene_id: canonical_gene_id(record.get(id_index).unwrap_or_default()),
            gene_symbol: (!symbol.is_empty()).then(|| symbol.to_string()),
            is_landmark: parse_flag(record.get(landmark_index).unwrap_or_default()),
        });
    }

    debug!("Parsed {} annotation rows", annotation.rows.len());
    Ok(annotation)
}

/// Parse an expression cell. `Some(None)` is a missing value, `None` is garbage.
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    let cell = cell.trim();
    if MISSING_MARKERS.contains(&cell.to_lowercase().as_str()) {
        return Some(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_nan() => Some(None),
        Ok(v) => Some(Some(v)),
        Err(_) => None,
    }
}

/// Landmark flags are 1/0; `true`/`false` is accepted as well.
fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        return true;
    }
    raw.parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn test_read_expression_matrix() {
        let csv = "rid,X:B01,X:A09\n1,5.0,2.0\n2,,NaN\n";
        let matrix = read_expression_matrix(csv.as_bytes()).unwrap();

        assert_eq!(matrix.row_ids, vec!["1", "2"]);
        assert_eq!(matrix.columns, vec!["X:B01", "X:A09"]);
        assert_eq!(matrix.values[0], vec![Some(5.0), Some(2.0)]);
        assert_eq!(matrix.values[1], vec![None, None]);
    }

    #[test]
    fn test_id_column_need_not_be_first() {
        let csv = "X:B01,rid\n4.5,0007\n";
        let matrix = read_expression_matrix(csv.as_bytes()).unwrap();
        assert_eq!(matrix.row_ids, vec!["7"]);
        assert_eq!(matrix.columns, vec!["X:B01"]);
        assert_eq!(matrix.values[0], vec![Some(4.5)]);
    }

    #[test]
    fn test_matrix_without_rid_is_shape_error() {
        let csv = "gene,X:B01\n1,5.0\n";
        let err = read_expression_matrix(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::InputShape(_)));
    }

    #[test]
    fn test_matrix_with_text_cell_is_shape_error() {
        let csv = "rid,X:B01\n1,high\n";
        let err = read_expression_matrix(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("X:B01"));
    }

    #[test]
    fn test_ragged_matrix_is_shape_error() {
        let csv = "rid,X:B01,X:A09\n1,5.0\n";
        let err = read_expression_matrix(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::InputShape(_)));
    }

    #[test]
    fn test_read_gene_annotation() {
        let tsv = "pr_gene_id\tpr_gene_symbol\tpr_is_lm\textra\n\
                   1\tGENEA\t1\tx\n\
                   2\t\t0\ty\n\
                   3\tGENEC\ttrue\tz\n";
        let annotation = read_gene_annotation(tsv.as_bytes()).unwrap();

        assert_eq!(annotation.rows.len(), 3);
        assert_eq!(annotation.rows[0].gene_symbol.as_deref(), Some("GENEA"));
        assert!(annotation.rows[0].is_landmark);
        assert_eq!(annotation.rows[1].gene_symbol, None);
        assert!(!annotation.rows[1].is_landmark);
        assert!(annotation.rows[2].is_landmark);
    }

    #[test]
    fn test_annotation_missing_landmark_column() {
        let tsv = "pr_gene_id\tpr_gene_symbol\n1\tGENEA\n";
        let err = read_gene_annotation(tsv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("pr_is_lm"));
    }

    #[test]
    fn test_comma_separated_annotation_is_shape_error() {
        let csv = "pr_gene_id,pr_gene_symbol,pr_is_lm\n1,GENEA,1\n";
        assert!(read_gene_annotation(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("1.0"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_load_from_files() {
        let mut matrix_file = NamedTempFile::new().unwrap();
        write!(matrix_file, "rid,X:B01,X:A09\n1,5.0,2.0\n").unwrap();

        let matrix = load_expression_matrix(matrix_file.path()).unwrap();
        assert_eq!(matrix.row_count(), 1);

        let missing = load_gene_annotation(Path::new("/nonexistent/gene_info.txt"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_load_fixtures() {
        let matrix = load_expression_matrix(&fixture("l5_subset.csv")).unwrap();
        assert_eq!(matrix.row_count(), 6);
        assert_eq!(matrix.columns.len(), 6);

        let annotation = load_gene_annotation(&fixture("gene_info.txt")).unwrap();
        assert_eq!(annotation.rows.len(), 6);
        assert_eq!(annotation.landmark_count(), 4);
    }
}
