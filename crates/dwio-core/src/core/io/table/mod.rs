//! Reading and writing of native DataWarrior tables (`.dwar` and relatives).
//!
//! A table file is line oriented:
//!
//! ```text
//! <datawarrior-fileinfo>
//! <version="3.1">
//! <rowcount="2">
//! </datawarrior-fileinfo>
//! <column properties>
//! <columnName="Structure">
//! <columnProperty="specialType	idcode">
//! </column properties>
//! Structure	Name	Value
//! ...one tab-delimited line per row...
//! <detail data>
//! <detailID="1">
//! ...bit-packed blob...
//! </detail data>
//! ```

pub mod columns;
pub mod error;
pub mod escape;
pub mod export;
pub mod options;
pub mod parser;
pub mod writer;

pub use columns::{ColumnDescriptor, CoordinateMode, SpecialType};
pub use error::TableError;
pub use options::{TableReadOptions, TableReadOptionsBuilder};
pub use parser::{Row, TableLayout, TableParser};
pub use writer::{ColumnSpec, TableWriter};

pub(crate) const HEADER_START: &str = "<datawarrior-fileinfo>";
pub(crate) const HEADER_END: &str = "</datawarrior-fileinfo>";
pub(crate) const VERSION_TAG: &str = "version";
pub(crate) const ROW_COUNT_TAG: &str = "rowcount";
pub(crate) const SUPPORTED_VERSIONS: [&str; 3] = ["3.0", "3.1", ""];
pub(crate) const CURRENT_VERSION: &str = "3.1";

pub(crate) const EXPLANATION_START: &str = "<fileexplanation";
pub(crate) const EXPLANATION_END: &str = "</fileexplanation>";

pub(crate) const PROPERTIES_START: &str = "<column properties>";
pub(crate) const PROPERTIES_END: &str = "</column properties>";
pub(crate) const COLUMN_NAME_TAG: &str = "columnName";
pub(crate) const COLUMN_PROPERTY_TAG: &str = "columnProperty";

pub(crate) const PROPERTY_SPECIAL_TYPE: &str = "specialType";
pub(crate) const PROPERTY_PARENT: &str = "parent";
pub(crate) const PROPERTY_ID_COLUMN: &str = "idColumn";
pub(crate) const PROPERTY_VERSION: &str = "version";

/// Name conventionally given to the primary structure column.
pub const STRUCTURE_COLUMN_NAME: &str = "Structure";

pub(crate) const RUNTIME_PROPERTIES_START: &str = "<datawarrior properties>";
pub(crate) const LEGACY_RUNTIME_PROPERTIES_START: &str = "<runtime properties>";
pub(crate) const HITLIST_START: &str = "<hitlist data>";
pub(crate) const DETAIL_START: &str = "<detail data>";
pub(crate) const DETAIL_END: &str = "</detail data>";
pub(crate) const DETAIL_ID_TAG: &str = "detailID";
pub(crate) const DETAIL_ID_END: &str = "</detailID>";

/// Parses a `<key="value">` tag line, returning the key and the unquoted value.
pub(crate) fn parse_tag(line: &str) -> Option<(&str, &str)> {
    let inner = line.trim().strip_prefix('<')?.strip_suffix('>')?;
    let (key, value) = inner.split_once('=')?;
    let value = value.strip_prefix('"')?.strip_suffix('"')?;
    Some((key.trim(), value))
}

pub(crate) fn is_tail_marker(line: &str) -> bool {
    matches!(
        line,
        RUNTIME_PROPERTIES_START | LEGACY_RUNTIME_PROPERTIES_START | HITLIST_START | DETAIL_START
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tag_splits_key_and_quoted_value() {
        assert_eq!(parse_tag("<version=\"3.1\">"), Some(("version", "3.1")));
        assert_eq!(parse_tag("<version=\"\">"), Some(("version", "")));
        assert_eq!(
            parse_tag("<columnProperty=\"specialType\tidcode\">"),
            Some(("columnProperty", "specialType\tidcode"))
        );
    }

    #[test]
    fn parse_tag_rejects_lines_without_quoted_value() {
        assert_eq!(parse_tag("<version=3.1>"), None);
        assert_eq!(parse_tag("version=\"3.1\""), None);
        assert_eq!(parse_tag("<datawarrior-fileinfo>"), None);
    }

    #[test]
    fn tail_markers_are_recognized_exactly() {
        assert!(is_tail_marker("<detail data>"));
        assert!(is_tail_marker("<hitlist data>"));
        assert!(is_tail_marker("<datawarrior properties>"));
        assert!(is_tail_marker("<runtime properties>"));
        assert!(!is_tail_marker(" <detail data>"));
        assert!(!is_tail_marker("</detail data>"));
    }
}
