//! # dwio
//!
//! Streaming readers and writers for the file formats a cheminformatics desktop
//! application exchanges with the outside world.
//!
//! ## Layout
//!
//! - **[`core`]: The Foundation.** Data models (`Molecule`, `Reaction`), the bit-packed
//!   binary codec, file type classification, the native table reader/writer, and the
//!   MDL reaction file codec.
//!
//! - **[`workflows`]: The Public API.** Entry points that tie the `core` pieces together,
//!   such as opening an arbitrary file by its extension.

pub mod core;
pub mod workflows;
