//! Codecs for binary data embedded in line-oriented text files.

pub mod bitpacked;
