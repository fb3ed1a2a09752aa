//! Decoding of precomputed descriptor columns.
//!
//! Descriptor columns are children of a structure column, tagged with the descriptor's
//! short name as their special type. Their cells hold the descriptor in an encoded text
//! form. A [`DescriptorRegistry`] maps a short name to the [`DescriptorHandler`] that
//! understands that encoding.

use crate::core::codec::bitpacked::{BitPackedDecoder, DEFAULT_BASE_CHAR, DEFAULT_BITS_PER_CHAR};
use phf::{Map, phf_map};
use std::io::Cursor;
use thiserror::Error;

/// Short name of the fingerprint used for substructure pre-screening.
pub const SUBSTRUCTURE_FINGERPRINT: &str = "FragFp";
/// Version of [`SUBSTRUCTURE_FINGERPRINT`] that the screening index is valid for.
pub const SUBSTRUCTURE_FINGERPRINT_VERSION: &str = "1.2.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// A binary fingerprint as 32-bit words, most significant bit first.
    Fingerprint(Vec<u32>),
    /// A descriptor whose encoding is kept as-is.
    Encoded(String),
}

impl Descriptor {
    /// Number of set bits, for fingerprints.
    pub fn bit_count(&self) -> Option<u32> {
        match self {
            Self::Fingerprint(words) => Some(words.iter().map(|w| w.count_ones()).sum()),
            Self::Encoded(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("No handler is registered for descriptor '{0}'")]
    UnknownDescriptor(String),
    #[error("Malformed '{short_name}' descriptor: {source}")]
    Malformed {
        short_name: &'static str,
        source: std::io::Error,
    },
}

pub trait DescriptorHandler {
    fn short_name(&self) -> &'static str;
    fn version(&self) -> &'static str;
    /// Decodes the cell text of a descriptor column.
    fn decode(&self, text: &str) -> Result<Descriptor, DescriptorError>;
}

pub trait DescriptorRegistry {
    fn handler_for(&self, short_name: &str) -> Option<&dyn DescriptorHandler>;

    fn is_known(&self, short_name: &str) -> bool {
        self.handler_for(short_name).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Fingerprint,
    Opaque,
}

#[derive(Debug)]
pub struct BuiltinHandler {
    short_name: &'static str,
    version: &'static str,
    encoding: Encoding,
}

impl BuiltinHandler {
    const fn fingerprint(short_name: &'static str, version: &'static str) -> Self {
        Self {
            short_name,
            version,
            encoding: Encoding::Fingerprint,
        }
    }

    const fn opaque(short_name: &'static str, version: &'static str) -> Self {
        Self {
            short_name,
            version,
            encoding: Encoding::Opaque,
        }
    }
}

impl DescriptorHandler for BuiltinHandler {
    fn short_name(&self) -> &'static str {
        self.short_name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn decode(&self, text: &str) -> Result<Descriptor, DescriptorError> {
        match self.encoding {
            Encoding::Opaque => Ok(Descriptor::Encoded(text.to_string())),
            Encoding::Fingerprint => decode_fingerprint(text).map(Descriptor::Fingerprint).map_err(|source| {
                DescriptorError::Malformed {
                    short_name: self.short_name,
                    source,
                }
            }),
        }
    }
}

/// Fingerprint text carries no count prefix: every 6-bit character contributes to a
/// run of 32-bit words, and trailing bits short of a full word are padding.
fn decode_fingerprint(text: &str) -> std::io::Result<Vec<u32>> {
    let symbols = text.chars().filter(|&c| u32::from(c) >= DEFAULT_BASE_CHAR).count();
    let words = symbols * DEFAULT_BITS_PER_CHAR as usize / 32;
    let mut decoder = BitPackedDecoder::new(Cursor::new(text.as_bytes()));
    decoder.set_data_bits(32)?;
    (0..words).map(|_| decoder.read()).collect()
}

static BUILTIN_HANDLERS: Map<&'static str, BuiltinHandler> = phf_map! {
    "FragFp" => BuiltinHandler::fingerprint("FragFp", "1.2.1"),
    "PathFp" => BuiltinHandler::fingerprint("PathFp", "1.1"),
    "SphereFp" => BuiltinHandler::fingerprint("SphereFp", "1.1"),
    "RxnFp" => BuiltinHandler::fingerprint("RxnFp", "1.0"),
    "SkelSpheres" => BuiltinHandler::opaque("SkelSpheres", "1.1"),
    "OrgFunctions" => BuiltinHandler::opaque("OrgFunctions", "1.0"),
    "CenteredSkelFp" => BuiltinHandler::opaque("CenteredSkelFp", "1.0"),
    "Flexophore" => BuiltinHandler::opaque("Flexophore", "5.0"),
    "PheSA" => BuiltinHandler::opaque("PheSA", "2.1"),
};

/// Registry of the descriptors known out of the box.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDescriptorRegistry;

impl DescriptorRegistry for DefaultDescriptorRegistry {
    fn handler_for(&self, short_name: &str) -> Option<&dyn DescriptorHandler> {
        BUILTIN_HANDLERS
            .get(short_name)
            .map(|h| h as &dyn DescriptorHandler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::bitpacked::BitPackedEncoder;

    fn encode_words(words: &[u32]) -> String {
        let mut encoder = BitPackedEncoder::new(Vec::new());
        encoder.set_data_bits(32).unwrap();
        for &w in words {
            encoder.write(w).unwrap();
        }
        String::from_utf8(encoder.finish().unwrap()).unwrap().trim_end().to_string()
    }

    #[test]
    fn fingerprint_handler_decodes_words() {
        let words = [0xDEAD_BEEF, 0, 1, 0x8000_0000];
        let text = encode_words(&words);
        let handler = DefaultDescriptorRegistry.handler_for("FragFp").unwrap();
        assert_eq!(handler.version(), SUBSTRUCTURE_FINGERPRINT_VERSION);
        let descriptor = handler.decode(&text).unwrap();
        assert_eq!(descriptor, Descriptor::Fingerprint(words.to_vec()));
        assert_eq!(descriptor.bit_count(), Some(24 + 0 + 1 + 1));
    }

    #[test]
    fn empty_fingerprint_text_decodes_to_no_words() {
        let handler = DefaultDescriptorRegistry.handler_for("PathFp").unwrap();
        assert_eq!(handler.decode("").unwrap(), Descriptor::Fingerprint(vec![]));
    }

    #[test]
    fn opaque_handlers_keep_the_text() {
        let handler = DefaultDescriptorRegistry.handler_for("Flexophore").unwrap();
        assert_eq!(
            handler.decode("abc").unwrap(),
            Descriptor::Encoded("abc".to_string())
        );
        assert_eq!(Descriptor::Encoded(String::new()).bit_count(), None);
    }

    #[test]
    fn malformed_fingerprint_is_reported_with_its_name() {
        let handler = DefaultDescriptorRegistry.handler_for("SphereFp").unwrap();
        let err = handler.decode("@@@@@\u{00FF}@@").unwrap_err();
        assert!(matches!(err, DescriptorError::Malformed { short_name: "SphereFp", .. }));
    }

    #[test]
    fn registry_knows_only_builtin_names() {
        assert!(DefaultDescriptorRegistry.is_known("SkelSpheres"));
        assert!(!DefaultDescriptorRegistry.is_known("fragfp"));
        assert!(DefaultDescriptorRegistry.handler_for("Unknown").is_none());
    }
}
