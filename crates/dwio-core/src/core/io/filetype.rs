//! File type classification by file name extension.

use phf::{Map, phf_map};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// A single file format known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FileType {
    DataWarrior,
    Template,
    Query,
    SomFile,
    Macro,
    Text,
    Csv,
    SdV2,
    SdV3,
    Rxn,
    RdV2,
    RdV3,
    Jpeg,
    Png,
    Svg,
}

impl FileType {
    pub const ALL: [FileType; 15] = [
        FileType::DataWarrior,
        FileType::Template,
        FileType::Query,
        FileType::SomFile,
        FileType::Macro,
        FileType::Text,
        FileType::Csv,
        FileType::SdV2,
        FileType::SdV3,
        FileType::Rxn,
        FileType::RdV2,
        FileType::RdV3,
        FileType::Jpeg,
        FileType::Png,
        FileType::Svg,
    ];

    pub const fn mask(self) -> FileTypes {
        FileTypes(1 << self as u8)
    }

    /// Extensions including the leading dot; the first one is canonical.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::DataWarrior => &[".dwar", ".ode"],
            Self::Template => &[".dwat", ".odt"],
            Self::Query => &[".dwaq", ".odq"],
            Self::SomFile => &[".dwas", ".som"],
            Self::Macro => &[".dwam"],
            Self::Text => &[".txt"],
            Self::Csv => &[".csv"],
            Self::SdV2 | Self::SdV3 => &[".sdf"],
            Self::Rxn => &[".rxn"],
            Self::RdV2 | Self::RdV3 => &[".rdf"],
            Self::Jpeg => &[".jpg", ".jpeg"],
            Self::Png => &[".png"],
            Self::Svg => &[".svg"],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DataWarrior => "DataWarrior files",
            Self::Template => "DataWarrior templates",
            Self::Query => "DataWarrior queries",
            Self::SomFile => "DataWarrior self-organizing maps",
            Self::Macro => "DataWarrior macros",
            Self::Text => "TAB-delimited text files",
            Self::Csv => "Comma-separated files",
            Self::SdV2 => "SD files (V2000)",
            Self::SdV3 => "SD files (V3000)",
            Self::Rxn => "Reaction files",
            Self::RdV2 => "RD files (V2000)",
            Self::RdV3 => "RD files (V3000)",
            Self::Jpeg => "JPEG images",
            Self::Png => "PNG images",
            Self::Svg => "SVG images",
        }
    }
}

/// A set of [`FileType`]s. The empty set stands for an unknown type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileTypes(u32);

impl FileTypes {
    pub const UNKNOWN: Self = Self(0);

    pub const DATAWARRIOR: Self = FileType::DataWarrior.mask();
    pub const TEMPLATE: Self = FileType::Template.mask();
    pub const QUERY: Self = FileType::Query.mask();
    pub const SOM_FILE: Self = FileType::SomFile.mask();
    pub const MACRO: Self = FileType::Macro.mask();
    pub const TEXT: Self = FileType::Text.mask();
    pub const CSV: Self = FileType::Csv.mask();
    pub const SD_V2: Self = FileType::SdV2.mask();
    pub const SD_V3: Self = FileType::SdV3.mask();
    pub const RXN: Self = FileType::Rxn.mask();
    pub const RD_V2: Self = FileType::RdV2.mask();
    pub const RD_V3: Self = FileType::RdV3.mask();
    pub const JPEG: Self = FileType::Jpeg.mask();
    pub const PNG: Self = FileType::Png.mask();
    pub const SVG: Self = FileType::Svg.mask();

    pub const SD: Self = Self::SD_V2.union(Self::SD_V3);
    pub const RD: Self = Self::RD_V2.union(Self::RD_V3);

    pub const DATAWARRIOR_COMPATIBLE_DATA: Self = Self::DATAWARRIOR
        .union(Self::TEXT)
        .union(Self::CSV)
        .union(Self::SD);
    pub const DATAWARRIOR_TEMPLATE_CONTAINING: Self = Self::DATAWARRIOR
        .union(Self::TEMPLATE)
        .union(Self::QUERY);
    pub const PICTURES: Self = Self::JPEG.union(Self::PNG).union(Self::SVG);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_unknown(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Iterates the single types in this set in declaration order.
    pub fn iter(self) -> impl Iterator<Item = FileType> {
        FileType::ALL
            .into_iter()
            .filter(move |t| self.intersects(t.mask()))
    }
}

impl BitOr for FileTypes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for FileTypes {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<FileType> for FileTypes {
    fn from(t: FileType) -> Self {
        t.mask()
    }
}

impl fmt::Display for FileTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "unknown");
        }
        let names: Vec<String> = self.iter().map(|t| format!("{t:?}")).collect();
        write!(f, "{}", names.join("|"))
    }
}

static EXTENSION_TYPES: Map<&'static str, FileTypes> = phf_map! {
    "dwar" => FileTypes::DATAWARRIOR,
    "ode" => FileTypes::DATAWARRIOR,
    "dwat" => FileTypes::TEMPLATE,
    "odt" => FileTypes::TEMPLATE,
    "dwaq" => FileTypes::QUERY,
    "odq" => FileTypes::QUERY,
    "dwas" => FileTypes::SOM_FILE,
    "som" => FileTypes::SOM_FILE,
    "dwam" => FileTypes::MACRO,
    "txt" => FileTypes::TEXT,
    "csv" => FileTypes::CSV,
    "sdf" => FileTypes::SD,
    "rxn" => FileTypes::RXN,
    "rdf" => FileTypes::RD,
    "jpg" => FileTypes::JPEG,
    "jpeg" => FileTypes::JPEG,
    "png" => FileTypes::PNG,
    "svg" => FileTypes::SVG,
};

fn extension_of(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next()?;
    let dot = base.rfind('.')?;
    Some(&base[dot + 1..])
}

/// Classifies a file name by its extension, ignoring case.
pub fn classify(file_name: &str) -> FileTypes {
    extension_of(file_name)
        .and_then(|ext| EXTENSION_TYPES.get(ext.to_ascii_lowercase().as_str()))
        .copied()
        .unwrap_or(FileTypes::UNKNOWN)
}

/// The extension (with leading dot) files of `types` are saved with.
///
/// Only single types and the version-agnostic `SD` / `RD` sets have one.
pub fn canonical_extension(types: FileTypes) -> Option<&'static str> {
    let mut iter = types.iter();
    let first = iter.next()?;
    if iter.all(|t| t.extensions()[0] == first.extensions()[0]) {
        Some(first.extensions()[0])
    } else {
        None
    }
}

/// Strips a known extension; names of unknown type are returned unchanged.
pub fn remove_extension(file_name: &str) -> &str {
    if classify(file_name).is_unknown() {
        return file_name;
    }
    match file_name.rfind('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    }
}

/// Extensions and a human-readable description for a set of acceptable types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub types: FileTypes,
    pub description: String,
    pub extensions: Vec<&'static str>,
}

impl FileFilter {
    pub fn for_types(types: FileTypes) -> Self {
        let mut extensions: Vec<&'static str> = Vec::new();
        for t in types.iter() {
            for ext in t.extensions() {
                if !extensions.contains(ext) {
                    extensions.push(ext);
                }
            }
        }

        let description = match types {
            FileTypes::DATAWARRIOR_COMPATIBLE_DATA => "DataWarrior compatible files".to_string(),
            FileTypes::DATAWARRIOR_TEMPLATE_CONTAINING => {
                "DataWarrior template containing files".to_string()
            }
            FileTypes::PICTURES => "Image files".to_string(),
            _ => types
                .iter()
                .map(FileType::description)
                .collect::<Vec<_>>()
                .join(", "),
        };

        Self {
            types,
            description,
            extensions,
        }
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        classify(file_name).intersects(self.types)
    }

    /// Candidate file names for a name given without extension.
    pub fn candidates(&self, stem: &str) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| format!("{stem}{ext}"))
            .collect()
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<String> = self.extensions.iter().map(|e| format!("*{e}")).collect();
        write!(f, "{} ({})", self.description, patterns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_current_and_legacy_extensions() {
        assert_eq!(classify("table.dwar"), FileTypes::DATAWARRIOR);
        assert_eq!(classify("table.ode"), FileTypes::DATAWARRIOR);
        assert_eq!(classify("query.odq"), FileTypes::QUERY);
        assert_eq!(classify("map.som"), FileTypes::SOM_FILE);
        assert_eq!(classify("run.dwam"), FileTypes::MACRO);
        assert_eq!(classify("reaction.rxn"), FileTypes::RXN);
        assert_eq!(classify("photo.jpeg"), FileTypes::JPEG);
    }

    #[test]
    fn classify_is_case_insensitive_and_ignores_directories() {
        assert_eq!(classify("DATA.CSV"), FileTypes::CSV);
        assert_eq!(classify("/tmp/dir.with.dots/file.Sdf"), FileTypes::SD);
        assert_eq!(classify("C:\\data\\x.TXT"), FileTypes::TEXT);
    }

    #[test]
    fn classify_returns_unknown_without_a_known_extension() {
        assert!(classify("README").is_unknown());
        assert!(classify("archive.tar.gz").is_unknown());
        assert!(classify("/some.dir/noext").is_unknown());
    }

    #[test]
    fn sd_and_rd_are_version_agnostic() {
        assert!(classify("x.sdf").contains(FileTypes::SD_V2));
        assert!(classify("x.sdf").contains(FileTypes::SD_V3));
        assert_eq!(classify("x.rdf"), FileTypes::RD);
    }

    #[test]
    fn canonical_extension_maps_types_back() {
        assert_eq!(canonical_extension(FileTypes::DATAWARRIOR), Some(".dwar"));
        assert_eq!(canonical_extension(FileTypes::SD), Some(".sdf"));
        assert_eq!(canonical_extension(FileTypes::SD_V3), Some(".sdf"));
        assert_eq!(canonical_extension(FileTypes::JPEG), Some(".jpg"));
        assert_eq!(canonical_extension(FileTypes::UNKNOWN), None);
        assert_eq!(canonical_extension(FileTypes::PICTURES), None);
    }

    #[test]
    fn remove_extension_only_strips_known_extensions() {
        assert_eq!(remove_extension("table.dwar"), "table");
        assert_eq!(remove_extension("dir/reaction.RXN"), "dir/reaction");
        assert_eq!(remove_extension("notes.md"), "notes.md");
        assert_eq!(remove_extension("plain"), "plain");
    }

    #[test]
    fn filter_for_combined_types_is_the_union_of_its_members() {
        let filter = FileFilter::for_types(FileTypes::RXN | FileTypes::CSV);
        assert_eq!(filter.extensions, vec![".csv", ".rxn"]);
        assert_eq!(filter.description, "Comma-separated files, Reaction files");
        assert!(filter.accepts("a.rxn"));
        assert!(!filter.accepts("a.dwar"));
    }

    #[test]
    fn named_aggregates_use_override_descriptions() {
        let compatible = FileFilter::for_types(FileTypes::DATAWARRIOR_COMPATIBLE_DATA);
        assert_eq!(compatible.description, "DataWarrior compatible files");
        assert_eq!(compatible.extensions, vec![".dwar", ".ode", ".txt", ".csv", ".sdf"]);

        let templates = FileFilter::for_types(FileTypes::DATAWARRIOR_TEMPLATE_CONTAINING);
        assert_eq!(templates.description, "DataWarrior template containing files");

        let pictures = FileFilter::for_types(FileTypes::PICTURES);
        assert_eq!(pictures.description, "Image files");
        assert_eq!(pictures.extensions, vec![".jpg", ".jpeg", ".png", ".svg"]);
    }

    #[test]
    fn sd_filter_lists_the_shared_extension_once() {
        let filter = FileFilter::for_types(FileTypes::SD);
        assert_eq!(filter.extensions, vec![".sdf"]);
        assert_eq!(filter.description, "SD files (V2000), SD files (V3000)");
        assert_eq!(filter.to_string(), "SD files (V2000), SD files (V3000) (*.sdf)");
    }

    #[test]
    fn candidates_append_every_extension() {
        let filter = FileFilter::for_types(FileTypes::DATAWARRIOR);
        assert_eq!(filter.candidates("data/set"), vec!["data/set.dwar", "data/set.ode"]);
    }

    #[test]
    fn display_lists_member_names() {
        assert_eq!(FileTypes::UNKNOWN.to_string(), "unknown");
        assert_eq!(FileTypes::SD.to_string(), "SdV2|SdV3");
    }
}
