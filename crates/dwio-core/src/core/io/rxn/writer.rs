use super::{MOL_TAG, RXN_MAGIC, RxnError};
use crate::core::io::molfile::MolfileWriter;
use crate::core::io::traits::MoleculeWriter;
use crate::core::models::reaction::Reaction;
use crate::core::utils::geometry::{bounding_rect, normalization_scale, transform};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

const DEFAULT_PROGRAM: &str = "dwio";

/// Serializes reactions into the V2000 reaction grammar.
///
/// All molecules are brought onto one common scale before they are handed to the
/// molecule writer, so that relative placement survives per-molecule formatting.
#[derive(Debug, Clone, Default)]
pub struct RxnFileWriter<M = MolfileWriter> {
    molecule_writer: M,
    buffer: Option<String>,
}

impl RxnFileWriter<MolfileWriter> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: MoleculeWriter> RxnFileWriter<M> {
    pub fn with_molecule_writer(molecule_writer: M) -> Self {
        Self {
            molecule_writer,
            buffer: None,
        }
    }

    /// Serializes `reaction` into the internal buffer and returns the text.
    ///
    /// The reaction itself is not modified. A failed serialization clears the buffer.
    pub fn serialize(&mut self, reaction: &Reaction, program: Option<&str>) -> Result<&str, RxnError> {
        self.buffer = None;
        let mut scaled = reaction.clone();
        match bounding_rect(&scaled).as_ref().and_then(normalization_scale) {
            Some(scale) => {
                trace!("Scaling reaction coordinates by {}", scale);
                transform(&mut scaled, 0.0, 0.0, scale);
            }
            None => trace!("Reaction has no extent, coordinates are kept."),
        }

        let mut out = String::new();
        writeln!(out, "{RXN_MAGIC}")?;
        writeln!(out, "{}", scaled.name)?;
        writeln!(out, "  {}", program.unwrap_or(DEFAULT_PROGRAM))?;
        writeln!(out)?;
        writeln!(out, "{:>3}{:>3}", scaled.reactant_count(), scaled.product_count())?;
        for (index, molecule) in scaled.molecules().enumerate() {
            let block = self
                .molecule_writer
                .write(molecule)
                .map_err(|source| RxnError::Molecule { index, source })?;
            writeln!(out, "{MOL_TAG}")?;
            out.push_str(&block);
        }
        debug!(
            "Serialized reaction with {} reactants and {} products.",
            scaled.reactant_count(),
            scaled.product_count()
        );
        Ok(self.buffer.insert(out).as_str())
    }

    /// Text of the last successful serialization.
    pub fn text(&self) -> Result<&str, RxnError> {
        self.buffer.as_deref().ok_or(RxnError::NoBuffer)
    }

    pub fn write_to(&self, mut sink: impl Write) -> Result<(), RxnError> {
        sink.write_all(self.text()?.as_bytes())?;
        sink.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), RxnError> {
        let text = self.text()?;
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
