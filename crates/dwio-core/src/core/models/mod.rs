//! In-memory molecule and reaction models produced by the file readers.

pub mod molecule;
pub mod reaction;
