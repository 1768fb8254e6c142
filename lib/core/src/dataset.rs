use crate::error::{Error, Result};
use crate::record::{columns, VehicleRecord};
use crate::table::Table;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File metadata for a dataset loaded from disk
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

impl SourceFile {
    pub fn stat<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
        })
    }

    pub fn size_kib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    /// Last-modified date as `"Jan 05, 2025"`
    pub fn modified_label(&self) -> Option<String> {
        self.modified.map(|m| m.format("%b %d, %Y").to_string())
    }
}

/// The reference vehicle dataset.
///
/// Every row has a numeric `price`; rows without one are dropped when the
/// dataset is built and cannot be added back. The dataset is immutable once
/// constructed.
#[derive(Debug, Clone)]
pub struct Dataset {
    table: Table,
    source: Option<SourceFile>,
    dropped_rows: usize,
}

impl Dataset {
    /// Build a dataset from an in-memory table
    pub fn from_table(table: Table) -> Result<Self> {
        if !table.has_column(columns::PRICE) {
            return Err(Error::ColumnNotFound(columns::PRICE.to_string()));
        }
        let total = table.len();
        let (cols, rows) = table.into_parts();
        let rows: Vec<VehicleRecord> = rows
            .into_iter()
            .filter(|r| r.get_f64(columns::PRICE).is_some())
            .collect();
        let dropped_rows = total - rows.len();
        if dropped_rows > 0 {
            debug!("Dropped {} rows without a price", dropped_rows);
        }

        Ok(Self {
            table: Table::new(cols, rows),
            source: None,
            dropped_rows,
        })
    }

    /// Load the dataset CSV from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::from_csv_path(path)?;
        let mut dataset = Self::from_table(table)?;
        dataset.source = Some(SourceFile::stat(path)?);
        info!(
            "Loaded dataset {:?}: {} rows, {} columns ({} rows without price dropped)",
            path,
            dataset.len(),
            dataset.columns().len(),
            dataset.dropped_rows
        );
        Ok(dataset)
    }

    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[inline]
    pub fn rows(&self) -> &[VehicleRecord] {
        self.table.rows()
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&VehicleRecord> {
        self.table.row(index)
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    /// Rows removed at load because `price` was missing
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Prices in row order; every row has one
    pub fn prices(&self) -> Vec<f64> {
        self.table.numeric_column(columns::PRICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rows_without_price_are_dropped() {
        let csv = "make,year,price\nToyota,2020,20000\nFord,2018,\nKia,2019,NaN\nBMW,2021,45000\n";
        let table = Table::from_csv_bytes(csv.as_bytes()).unwrap();
        let dataset = Dataset::from_table(table).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dropped_rows(), 2);
        assert_eq!(dataset.prices(), vec![20000.0, 45000.0]);
    }

    #[test]
    fn test_missing_price_column() {
        let table = Table::from_csv_bytes(b"make,year\nToyota,2020\n").unwrap();
        assert!(matches!(
            Dataset::from_table(table),
            Err(Error::ColumnNotFound(c)) if c == "price"
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "make,price").unwrap();
        writeln!(file, "Audi,31000").unwrap();
        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        let source = dataset.source().unwrap();
        assert!(source.size_bytes > 0);
        assert!(source.modified_label().is_some());
    }
}
