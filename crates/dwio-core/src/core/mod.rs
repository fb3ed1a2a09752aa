//! # Core Module
//!
//! The building blocks of the library.
//!
//! - **Binary attachments** ([`codec`]) - Bit-packed text encoding of binary blobs
//! - **Molecular Representation** ([`models`]) - Molecules and reactions
//! - **File I/O** ([`io`]) - File type classification, native tables, molfiles and reaction files
//! - **Descriptors** ([`descriptors`]) - Decoding of precomputed descriptor columns
//! - **Geometry** ([`utils`]) - Bounding boxes and coordinate transforms

pub mod codec;
pub mod descriptors;
pub mod io;
pub mod models;
pub mod utils;
