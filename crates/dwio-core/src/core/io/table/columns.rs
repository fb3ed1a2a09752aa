use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Semantic type of a non-plain column, read from its `specialType` property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpecialType {
    StructureCode,
    ReactionCode,
    Coordinates2D,
    Coordinates3D,
    AtomColorInfo,
    /// A precomputed descriptor, identified by its short name.
    Descriptor(String),
}

impl SpecialType {
    pub fn parse(value: &str) -> Self {
        match value {
            "idcode" => Self::StructureCode,
            "rxncode" => Self::ReactionCode,
            "idcoordinates2D" => Self::Coordinates2D,
            "idcoordinates3D" => Self::Coordinates3D,
            "atomColorInfo" => Self::AtomColorInfo,
            other => Self::Descriptor(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::StructureCode => "idcode",
            Self::ReactionCode => "rxncode",
            Self::Coordinates2D => "idcoordinates2D",
            Self::Coordinates3D => "idcoordinates3D",
            Self::AtomColorInfo => "atomColorInfo",
            Self::Descriptor(short_name) => short_name,
        }
    }

    pub fn descriptor_name(&self) -> Option<&str> {
        match self {
            Self::Descriptor(short_name) => Some(short_name),
            _ => None,
        }
    }
}

impl fmt::Display for SpecialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column as declared by the column-properties block and the title line.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub(crate) name: String,
    pub(crate) source_index: Option<usize>,
    pub(crate) special_type: Option<SpecialType>,
    pub(crate) parent: Option<String>,
    pub(crate) id_column: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) properties: HashMap<String, String>,
}

impl ColumnDescriptor {
    pub(crate) fn plain(name: &str, source_index: usize) -> Self {
        Self {
            name: name.to_string(),
            source_index: Some(source_index),
            special_type: None,
            parent: None,
            id_column: None,
            version: None,
            properties: HashMap::new(),
        }
    }

    pub(crate) fn from_properties(name: &str, properties: HashMap<String, String>) -> Self {
        use super::{PROPERTY_ID_COLUMN, PROPERTY_PARENT, PROPERTY_SPECIAL_TYPE, PROPERTY_VERSION};
        Self {
            name: name.to_string(),
            source_index: None,
            special_type: properties.get(PROPERTY_SPECIAL_TYPE).map(|t| SpecialType::parse(t)),
            parent: properties.get(PROPERTY_PARENT).cloned(),
            id_column: properties.get(PROPERTY_ID_COLUMN).cloned(),
            version: properties.get(PROPERTY_VERSION).cloned(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the raw row; `None` for a declared column missing from the title line.
    pub fn source_index(&self) -> Option<usize> {
        self.source_index
    }

    pub fn special_type(&self) -> Option<&SpecialType> {
        self.special_type.as_ref()
    }

    pub fn is_special(&self) -> bool {
        self.special_type.is_some()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub(crate) fn is_child_of(&self, parent: &str) -> bool {
        self.parent.as_deref() == Some(parent)
    }
}

/// Which coordinate child of the structure column to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateMode {
    #[serde(rename = "require-2d")]
    Require2D,
    #[serde(rename = "require-3d")]
    Require3D,
    #[default]
    #[serde(rename = "prefer-2d")]
    Prefer2D,
    #[serde(rename = "prefer-3d")]
    Prefer3D,
}

impl FromStr for CoordinateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "require-2d" | "2d" => Ok(Self::Require2D),
            "require-3d" | "3d" => Ok(Self::Require3D),
            "prefer-2d" => Ok(Self::Prefer2D),
            "prefer-3d" => Ok(Self::Prefer3D),
            other => Err(format!(
                "unknown coordinate mode '{other}' (expected require-2d, require-3d, prefer-2d or prefer-3d)"
            )),
        }
    }
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Require2D => "require-2d",
            Self::Require3D => "require-3d",
            Self::Prefer2D => "prefer-2d",
            Self::Prefer3D => "prefer-3d",
        })
    }
}

/// Picks the coordinate column among the 2D and 3D candidates of a structure column.
pub fn resolve_coordinates(
    mode: CoordinateMode,
    coords_2d: Option<usize>,
    coords_3d: Option<usize>,
) -> Option<usize> {
    match mode {
        CoordinateMode::Require2D => coords_2d,
        CoordinateMode::Require3D => coords_3d,
        CoordinateMode::Prefer2D => coords_2d.or(coords_3d),
        CoordinateMode::Prefer3D => coords_3d.or(coords_2d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_type_strings_round_trip() {
        for value in ["idcode", "rxncode", "idcoordinates2D", "idcoordinates3D", "atomColorInfo", "FragFp"] {
            assert_eq!(SpecialType::parse(value).as_str(), value);
        }
        assert_eq!(
            SpecialType::parse("PathFp"),
            SpecialType::Descriptor("PathFp".to_string())
        );
        assert_eq!(SpecialType::parse("PathFp").descriptor_name(), Some("PathFp"));
        assert_eq!(SpecialType::StructureCode.descriptor_name(), None);
    }

    #[test]
    fn coordinate_modes_select_expected_child() {
        let both = (Some(3), Some(4));
        assert_eq!(resolve_coordinates(CoordinateMode::Require2D, both.0, both.1), Some(3));
        assert_eq!(resolve_coordinates(CoordinateMode::Require3D, both.0, both.1), Some(4));
        assert_eq!(resolve_coordinates(CoordinateMode::Prefer2D, both.0, both.1), Some(3));
        assert_eq!(resolve_coordinates(CoordinateMode::Prefer3D, both.0, both.1), Some(4));

        assert_eq!(resolve_coordinates(CoordinateMode::Require3D, Some(3), None), None);
        assert_eq!(resolve_coordinates(CoordinateMode::Require2D, None, Some(4)), None);
        assert_eq!(resolve_coordinates(CoordinateMode::Prefer2D, None, Some(4)), Some(4));
        assert_eq!(resolve_coordinates(CoordinateMode::Prefer3D, Some(3), None), Some(3));
        assert_eq!(resolve_coordinates(CoordinateMode::Prefer3D, None, None), None);
    }

    #[test]
    fn coordinate_mode_parses_from_cli_strings() {
        assert_eq!("require-3d".parse::<CoordinateMode>().unwrap(), CoordinateMode::Require3D);
        assert_eq!("Prefer-3D".parse::<CoordinateMode>().unwrap(), CoordinateMode::Prefer3D);
        assert!("4d".parse::<CoordinateMode>().is_err());
        assert_eq!(CoordinateMode::default().to_string(), "prefer-2d");
    }

    #[test]
    fn descriptor_reads_relations_from_properties() {
        let properties = HashMap::from([
            ("specialType".to_string(), "idcoordinates2D".to_string()),
            ("parent".to_string(), "Structure".to_string()),
        ]);
        let column = ColumnDescriptor::from_properties("idcoordinates2D", properties);
        assert_eq!(column.special_type(), Some(&SpecialType::Coordinates2D));
        assert!(column.is_child_of("Structure"));
        assert_eq!(column.id_column(), None);
        assert_eq!(column.source_index(), None);
    }
}
