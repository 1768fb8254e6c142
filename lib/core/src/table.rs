//! Ordered tabular data with CSV input and output
//!
//! A [`Table`] keeps the header order of its source so that anything written
//! back out (prediction exports, browse previews) lines up with what the user
//! uploaded.

use crate::error::{Error, Result};
use crate::record::VehicleRecord;
use crate::value::FieldValue;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;

/// An ordered set of columns plus the rows that populate them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<VehicleRecord>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<VehicleRecord>) -> Self {
        Self { columns, rows }
    }

    /// Build a table from records, taking the column order from `columns`
    pub fn from_records<S: AsRef<str>>(columns: &[S], rows: Vec<VehicleRecord>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        }
    }

    /// Parse CSV with a header row. An input without any header yields an
    /// empty table rather than an error.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let raw = result?;
            let record: VehicleRecord = columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = raw.get(i).map(FieldValue::parse).unwrap_or_default();
                    (col.clone(), value)
                })
                .collect();
            rows.push(record);
        }

        Ok(Self { columns, rows })
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[VehicleRecord] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn row(&self, index: usize) -> Option<&VehicleRecord> {
        self.rows.get(index)
    }

    /// First `n` rows as a new table
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Keep only rows matching `predicate`
    pub fn filter<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&VehicleRecord) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Restrict to `columns`, which must all exist
    pub fn select(&self, columns: &[String]) -> Result<Table> {
        for c in columns {
            if !self.has_column(c) {
                return Err(Error::ColumnNotFound(c.clone()));
            }
        }
        Ok(Table {
            columns: columns.to_vec(),
            rows: self.rows.clone(),
        })
    }

    /// Append a column, filling each row from `values` (shorter input pads
    /// with missing cells)
    pub fn push_column(&mut self, column: impl Into<String>, values: Vec<FieldValue>) {
        let column = column.into();
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.set(column.clone(), values.next().unwrap_or_default());
        }
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }

    /// Non-missing numeric values of a column, in row order
    pub fn numeric_column(&self, column: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get_f64(column)).collect()
    }

    /// Write header and rows as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(self.columns.iter().map(|c| row.get(c).to_csv_field()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Rows as ordered JSON objects, for API responses that must keep the
    /// column order
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| {
                        let v = serde_json::to_value(row.get(c)).unwrap_or(serde_json::Value::Null);
                        (c.clone(), v)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<VehicleRecord>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "name,make,year,price\n\
        Car A,Toyota,2020,20000\n\
        Car B,Ford,,15000\n";

    #[test]
    fn test_parse_csv() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["name", "make", "year", "price"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get_f64("year"), Some(2020.0));
        assert!(table.rows()[1].get("year").is_missing());
    }

    #[test]
    fn test_empty_input() {
        let table = Table::from_csv_bytes(b"").unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());

        let header_only = Table::from_csv_bytes(b"make,year\n").unwrap();
        assert!(header_only.is_empty());
        assert_eq!(header_only.columns().len(), 2);
    }

    #[test]
    fn test_short_rows_pad_missing() {
        let table = Table::from_csv_bytes(b"make,year,doors\nKia,2019\n").unwrap();
        assert!(table.rows()[0].get("doors").is_missing());
    }

    #[test]
    fn test_write_csv_keeps_order() {
        let table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        let out = String::from_utf8(table.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            "name,make,year,price\nCar A,Toyota,2020,20000\nCar B,Ford,,15000\n"
        );
    }

    #[test]
    fn test_push_column_and_select() {
        let mut table = Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap();
        table.push_column("score", vec![FieldValue::Number(1.0)]);
        assert_eq!(table.columns().last().map(String::as_str), Some("score"));
        assert!(table.rows()[1].get("score").is_missing());

        let narrowed = table.select(&["make".to_string()]).unwrap();
        assert_eq!(narrowed.columns().len(), 1);
        assert!(table.select(&["nope".to_string()]).is_err());
    }
}
