use dwio::core::io::rxn::RxnError;
use dwio::core::io::table::TableError;
use dwio::workflows::open::OpenError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Reaction(#[from] RxnError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot read '{path}': {reason}", path = path.display())]
    Input { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
