use crate::core::io::filetype::{FileTypes, classify};
use crate::core::io::rxn::{RxnError, RxnFileParser};
use crate::core::io::table::{TableError, TableParser, TableReadOptions};
use crate::core::models::reaction::Reaction;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// A file opened by [`open_document`].
pub enum Document {
    Table(TableParser<BufReader<File>>),
    Reaction(Reaction),
}

impl Document {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Reaction(_) => "reaction",
        }
    }
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Unsupported file type '{types}' for {path:?}")]
    UnsupportedType { path: PathBuf, types: FileTypes },
    #[error("Failed to read table: {0}")]
    Table(#[from] TableError),
    #[error("Failed to read reaction: {0}")]
    Reaction(#[from] RxnError),
}

/// File types that open as a streaming table.
pub const TABLE_TYPES: FileTypes = FileTypes::DATAWARRIOR.union(FileTypes::SOM_FILE);

/// Opens `path` according to its extension.
///
/// Native tables and self-organizing-map files open as a [`TableParser`] positioned
/// before the first row; reaction files are read completely.
///
/// # Errors
///
/// Returns [`OpenError::UnsupportedType`] for any other extension, and the reader's
/// error if the file content is malformed.
#[instrument(skip_all, name = "open_document", fields(path = %path.display()))]
pub fn open_document(path: &Path, options: &TableReadOptions) -> Result<Document, OpenError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let types = classify(&name);
    info!("Opening {} file.", types);

    if TABLE_TYPES.intersects(types) {
        let parser = TableParser::open(path, options.clone())?;
        return Ok(Document::Table(parser));
    }
    if types.contains(FileTypes::RXN) {
        let mut reaction = Reaction::default();
        RxnFileParser::new().parse_path(path, &mut reaction)?;
        return Ok(Document::Reaction(reaction));
    }
    Err(OpenError::UnsupportedType {
        path: path.to_path_buf(),
        types,
    })
}
