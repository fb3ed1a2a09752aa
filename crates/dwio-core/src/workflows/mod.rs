//! High-level entry points built on top of [`crate::core`].

pub mod open;
