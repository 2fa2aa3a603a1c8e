//! Tabular reports: one CSV file per sheet, or a single JSON document when a
//! sheet is too large for a spreadsheet and the fallback is enabled.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, TextlensError};

/// Spreadsheet row limit, header included.
pub const MAX_ROWS: usize = 1_048_576;
/// Spreadsheet column limit, index column included.
pub const MAX_COLS: usize = 16_384;

/// One table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(x) => Some(*x),
            Self::Text(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Number(x) => x.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Self::Number(x)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A labelled 2-D table. `rows[i]` belongs to `index[i]`, `rows[i][j]` to `columns[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(index: Vec<String>, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(TextlensError::config(format!(
                "table has {} row labels but {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(TextlensError::config(format!(
                "table row has {} cells but there are {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    pub fn numeric(index: Vec<String>, columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Cell::Number).collect())
            .collect();
        Self::new(index, columns, rows)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn exceeds_spreadsheet_limits(&self) -> bool {
        self.n_rows() + 1 > MAX_ROWS || self.n_cols() + 1 > MAX_COLS
    }

    /// Values of column `j`, skipping text cells.
    pub fn column_values(&self, j: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(j)?.as_f64()).collect()
    }

    /// Per-column mean, sample standard deviation, min and max.
    /// Rows of the result are this table's columns.
    pub fn summary(&self) -> Table {
        let rows = (0..self.n_cols())
            .map(|j| {
                let values = self.column_values(j);
                let n = values.len() as f64;
                if values.is_empty() {
                    return vec![0.0; 4];
                }
                let mean = values.iter().sum::<f64>() / n;
                let std = if values.len() > 1 {
                    (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
                } else {
                    0.0
                };
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                vec![mean, std, min, max]
            })
            .map(|r| r.into_iter().map(Cell::Number).collect())
            .collect();
        Table {
            index: self.columns.clone(),
            columns: ["mean", "std", "min", "max"].map(String::from).to_vec(),
            rows,
        }
    }

    /// One row per document listing its non-zero columns as `"name (value)"`,
    /// largest first. Columns are ranks `1..`.
    pub fn human_readable(&self) -> Table {
        let ranked: Vec<Vec<Cell>> = self
            .rows
            .iter()
            .map(|row| {
                let mut present: Vec<(usize, f64)> = row
                    .iter()
                    .enumerate()
                    .filter_map(|(j, c)| c.as_f64().filter(|&x| x != 0.0).map(|x| (j, x)))
                    .collect();
                present.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                present
                    .into_iter()
                    .map(|(j, x)| Cell::Text(format!("{} ({})", self.columns[j], x)))
                    .collect()
            })
            .collect();
        let width = ranked.iter().map(Vec::len).max().unwrap_or(0);
        let rows = ranked
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Text(String::new()));
                r
            })
            .collect();
        Table {
            index: self.index.clone(),
            columns: (1..=width).map(|i| i.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Serialize)]
struct NamedSheet<'a> {
    name: &'a str,
    #[serde(flatten)]
    table: &'a Table,
}

/// Write every sheet next to `path`.
///
/// Each sheet goes to `<stem>_<sheet>.csv`. If any sheet exceeds spreadsheet
/// limits, either fail or, with `fallback`, write all sheets to a single
/// `<stem>.json` instead. Returns the files written.
pub fn write_report(
    path: &Path,
    sheets: &[(String, Table)],
    fallback: bool,
) -> Result<Vec<PathBuf>> {
    if sheets.is_empty() {
        return Err(TextlensError::config("report has no sheets to write"));
    }
    if let Some((name, table)) = sheets.iter().find(|(_, t)| t.exceeds_spreadsheet_limits()) {
        if !fallback {
            return Err(TextlensError::config(format!(
                "sheet '{name}' is {}x{}, beyond spreadsheet limits; enable the JSON fallback to write it",
                table.n_rows(),
                table.n_cols()
            )));
        }
        warn!(sheet = %name, "sheet exceeds spreadsheet limits, writing JSON instead");
        let target = path.with_extension("json");
        let named: Vec<NamedSheet> = sheets
            .iter()
            .map(|(name, table)| NamedSheet { name, table })
            .collect();
        let file = std::fs::File::create(&target)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &named)?;
        info!(path = %target.display(), "wrote report");
        return Ok(vec![target]);
    }

    let mut written = Vec::with_capacity(sheets.len());
    for (name, table) in sheets {
        let target = sheet_path(path, name);
        if let Err(e) = write_csv(&target, table) {
            // No partial report: drop the sheets already on disk.
            for done in written.iter().chain([&target]) {
                if std::fs::remove_file(done).is_ok() {
                    debug!(path = %done.display(), "removed partial sheet");
                }
            }
            return Err(e);
        }
        info!(
            path = %target.display(),
            rows = table.n_rows(),
            cols = table.n_cols(),
            "wrote sheet"
        );
        written.push(target);
    }
    Ok(written)
}

/// `<dir>/<stem>_<sheet>.csv`
pub fn sheet_path(path: &Path, sheet: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".into());
    path.with_file_name(format!("{stem}_{sheet}.csv"))
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = Vec::with_capacity(table.n_cols() + 1);
    header.push(String::new());
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;
    for (label, row) in table.index.iter().zip(&table.rows) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.clone());
        record.extend(row.iter().map(Cell::render));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> Table {
        Table::numeric(
            vec!["d0".into(), "d1".into(), "d2".into()],
            vec!["x".into(), "y".into()],
            vec![vec![2.0, 1.0], vec![0.0, 2.0], vec![1.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Table::numeric(vec!["a".into()], vec!["x".into()], vec![vec![1.0, 2.0]]);
        assert!(err.is_err());
        let err = Table::numeric(vec![], vec!["x".into()], vec![vec![1.0]]);
        assert!(err.is_err());
    }

    #[test]
    fn summary_stats() {
        let s = counts().summary();
        assert_eq!(s.index, vec!["x", "y"]);
        assert_eq!(s.columns, vec!["mean", "std", "min", "max"]);
        assert_eq!(s.rows[0][0], Cell::Number(1.0));
        assert_eq!(s.rows[0][1], Cell::Number(1.0));
        assert_eq!(s.rows[0][2], Cell::Number(0.0));
        assert_eq!(s.rows[0][3], Cell::Number(2.0));
    }

    #[test]
    fn human_readable_ranks_nonzero() {
        let h = counts().human_readable();
        assert_eq!(h.columns, vec!["1", "2"]);
        assert_eq!(h.rows[0][0], Cell::Text("x (2)".into()));
        assert_eq!(h.rows[0][1], Cell::Text("y (1)".into()));
        assert_eq!(h.rows[1][0], Cell::Text("y (2)".into()));
        assert_eq!(h.rows[1][1], Cell::Text(String::new()));
    }

    #[test]
    fn sheet_paths() {
        assert_eq!(
            sheet_path(Path::new("/tmp/out.xlsx"), "counts"),
            PathBuf::from("/tmp/out_counts.csv")
        );
        assert_eq!(sheet_path(Path::new("out"), "a"), PathBuf::from("out_a.csv"));
    }

    #[test]
    fn limits() {
        let wide = Table::numeric(
            vec!["r".into()],
            (0..MAX_COLS).map(|i| i.to_string()).collect(),
            vec![vec![0.0; MAX_COLS]],
        )
        .unwrap();
        assert!(wide.exceeds_spreadsheet_limits());
        assert!(!counts().exceeds_spreadsheet_limits());
    }
}
