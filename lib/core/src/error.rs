use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Unsupported column for this operation: {0}")]
    UnsupportedColumn(String),

    #[error("Invalid row range: start {start}, end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
