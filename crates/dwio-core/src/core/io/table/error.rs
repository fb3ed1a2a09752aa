use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("No header found")]
    NoHeader,
    #[error("Unsupported version '{0}'")]
    UnsupportedVersion(String),
    #[error("End of file reached before '{0}'")]
    MissingTerminator(&'static str),
    #[error("Column title line is missing")]
    MissingColumnTitles,
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("Row has {found} fields but the table declares {expected} columns")]
    RowWidth { expected: usize, found: usize },
}
