//! MDL reaction files (`.rxn`).
//!
//! Two grammars share the `$RXN` magic line. The legacy V2000 grammar stores
//! reactant and product counts in fixed columns and one `$MOL` block per molecule;
//! the V3000 grammar wraps V3000 CTAB blocks in tagged `REACTANT`/`PRODUCT`
//! sections. Both are read; only V2000 is written.

pub mod reader;
pub mod writer;

pub use reader::RxnFileParser;
pub use writer::RxnFileWriter;

use crate::core::io::molfile::MolfileError;
use std::io;
use thiserror::Error;

pub const RXN_MAGIC: &str = "$RXN";
pub const RXN_V3000_MAGIC: &str = "$RXN V3000";
pub(crate) const MOL_TAG: &str = "$MOL";
pub(crate) const MOL_END_TAG: &str = "M  END";

#[derive(Debug, Error)]
pub enum RxnError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: RxnParseErrorKind },
    #[error("Molecule {index} is malformed: {source}")]
    Molecule {
        index: usize,
        #[source]
        source: MolfileError,
    },
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
    #[error("No reaction has been serialized")]
    NoBuffer,
}

#[derive(Debug, Error)]
pub enum RxnParseErrorKind {
    #[error("'$RXN' magic line not found")]
    MissingMagic,
    #[error("File ended before {0}")]
    UnexpectedEof(&'static str),
    #[error("Invalid {field} count '{value}'")]
    InvalidCount { field: &'static str, value: String },
    #[error("'$MOL' tag not found")]
    MissingMolTag,
    #[error("Expected '{expected}'")]
    MissingBlockMarker { expected: &'static str },
    #[error("Malformed counts line '{0}'")]
    MalformedCounts(String),
}

/// Grammar of a reaction file, decided by its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxnGrammar {
    V2000,
    V3000,
}

impl RxnGrammar {
    /// The exact V3000 magic is checked first, since it shares the V2000 prefix.
    pub fn detect(first_line: &str) -> Option<Self> {
        let line = first_line.trim_end();
        if line == RXN_V3000_MAGIC {
            Some(Self::V3000)
        } else if line.starts_with(RXN_MAGIC) {
            Some(Self::V2000)
        } else {
            None
        }
    }
}
