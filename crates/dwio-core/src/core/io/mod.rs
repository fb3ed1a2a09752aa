//! Provides input/output functionality for the supported file formats.
//!
//! - [`filetype`] classifies files by extension.
//! - [`table`] streams the native tab-delimited table format.
//! - [`rxn`] reads V2000/V3000 reaction files and writes V2000.
//! - [`molfile`] is the CTAB codec the reaction layer hands molecule blocks to,
//!   behind the [`traits`] seam.

pub mod filetype;
pub mod molfile;
pub mod rxn;
pub mod table;
pub mod traits;
