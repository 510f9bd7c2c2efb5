use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;

use crate::domain::product::{ProductColumn, ProductRow};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product file `{0}` does not exist")]
    NotFound(PathBuf),
    #[error("could not read spreadsheet `{path}`: {message}")]
    Spreadsheet { path: PathBuf, message: String },
    #[error("could not read csv file `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("product file `{0}` has no header row")]
    EmptySheet(PathBuf),
    #[error("product file `{path}` is missing required columns: {}", .columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<&'static str> },
}

/// Read-only supplier of product rows.
pub trait CatalogSource: Send + Sync {
    fn load_rows(&self) -> Result<Vec<ProductRow>, CatalogError>;

    /// Human-readable origin used in logs and operator output.
    fn describe(&self) -> String;
}

/// Rows read from a spreadsheet on disk. The first sheet is used and its first
/// row must hold the column headers.
#[derive(Clone, Debug)]
pub struct SpreadsheetSource {
    path: PathBuf,
}

impl SpreadsheetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_csv(&self) -> bool {
        self.path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    fn load_workbook(&self) -> Result<Vec<ProductRow>, CatalogError> {
        let spreadsheet_error = |message: String| CatalogError::Spreadsheet {
            path: self.path.clone(),
            message,
        };

        let mut workbook =
            open_workbook_auto(&self.path).map_err(|error| spreadsheet_error(error.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| CatalogError::EmptySheet(self.path.clone()))?
            .map_err(|error| spreadsheet_error(error.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| CatalogError::EmptySheet(self.path.clone()))?
            .iter()
            .map(|cell| cell_text(cell).unwrap_or_default())
            .collect();
        let mapping = map_columns(&self.path, &headers)?;

        Ok(rows
            .map(|cells| build_row(&mapping, |index| cells.get(index).and_then(cell_text)))
            .filter(|row| !row.is_blank())
            .collect())
    }

    fn load_csv(&self) -> Result<Vec<ProductRow>, CatalogError> {
        let csv_error = |source: csv::Error| CatalogError::Csv { path: self.path.clone(), source };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(csv_error)?;
        let headers: Vec<String> =
            reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
        let mapping = map_columns(&self.path, &headers)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let row = build_row(&mapping, |index| record.get(index).map(str::to_string));
            if !row.is_blank() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl CatalogSource for SpreadsheetSource {
    fn load_rows(&self) -> Result<Vec<ProductRow>, CatalogError> {
        if !self.path.exists() {
            return Err(CatalogError::NotFound(self.path.clone()));
        }

        if self.is_csv() {
            self.load_csv()
        } else {
            self.load_workbook()
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fixed in-memory rows.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    rows: Vec<ProductRow>,
}

impl StaticSource {
    pub fn new(rows: Vec<ProductRow>) -> Self {
        Self { rows }
    }
}

impl CatalogSource for StaticSource {
    fn load_rows(&self) -> Result<Vec<ProductRow>, CatalogError> {
        Ok(self.rows.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory catalog ({} rows)", self.rows.len())
    }
}

fn map_columns(
    path: &Path,
    headers: &[String],
) -> Result<Vec<(usize, ProductColumn)>, CatalogError> {
    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(CatalogError::EmptySheet(path.to_path_buf()));
    }

    let mut mapping: Vec<(usize, ProductColumn)> = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        let Some(column) = ProductColumn::from_header(header) else {
            continue;
        };
        // first matching header wins for duplicated columns
        if !mapping.iter().any(|(_, mapped)| *mapped == column) {
            mapping.push((index, column));
        }
    }

    let missing: Vec<&'static str> = ProductColumn::ALL
        .into_iter()
        .filter(|column| column.is_required())
        .filter(|column| !mapping.iter().any(|(_, mapped)| mapped == column))
        .map(ProductColumn::header)
        .collect();
    if !missing.is_empty() {
        return Err(CatalogError::MissingColumns { path: path.to_path_buf(), columns: missing });
    }

    Ok(mapping)
}

fn build_row(
    mapping: &[(usize, ProductColumn)],
    cell: impl Fn(usize) -> Option<String>,
) -> ProductRow {
    let mut row = ProductRow::default();
    for (index, column) in mapping {
        row.set(*column, cell(*index));
    }
    row
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(value) => Some(value.clone()),
        Data::Float(value) => Some(value.to_string()),
        Data::Int(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        other => Some(other.to_string()),
    }
}
