use crate::core::io::molfile::MolfileError;
use crate::core::models::molecule::Molecule;

/// Converts one self-contained molecule text block into a [`Molecule`].
///
/// Reaction readers cut a file into per-molecule blocks and delegate each block to an
/// implementor of this trait. Implementors decide how strictly they validate.
pub trait MoleculeParser {
    /// Parses a complete molfile block (header, counts line, CTAB, `M  END`).
    ///
    /// # Errors
    ///
    /// Returns an error describing the first malformed record.
    fn parse(&self, block: &str) -> Result<Molecule, MolfileError>;
}

/// Serializes a [`Molecule`] into a self-contained molecule text block.
pub trait MoleculeWriter {
    /// Produces a complete molfile block terminated by `M  END` and a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the molecule cannot be represented in the target format.
    fn write(&self, molecule: &Molecule) -> Result<String, MolfileError>;
}
