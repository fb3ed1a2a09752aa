use super::columns::CoordinateMode;
use serde::Deserialize;

/// Options controlling how much of a table file the parser keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TableReadOptions {
    pub coordinate_mode: CoordinateMode,
    /// Decode the `<detail data>` section into a blob map.
    pub extract_details: bool,
    /// Keep header and tail lines verbatim for later round-tripping.
    pub buffer_head_and_tail: bool,
}

impl TableReadOptions {
    pub fn builder() -> TableReadOptionsBuilder {
        TableReadOptionsBuilder::new()
    }

    /// Whether anything after the last row has to be read at all.
    pub(crate) fn needs_tail(&self) -> bool {
        self.extract_details || self.buffer_head_and_tail
    }
}

#[derive(Default)]
pub struct TableReadOptionsBuilder {
    coordinate_mode: Option<CoordinateMode>,
    extract_details: Option<bool>,
    buffer_head_and_tail: Option<bool>,
}

impl TableReadOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinate_mode(mut self, mode: CoordinateMode) -> Self {
        self.coordinate_mode = Some(mode);
        self
    }

    pub fn extract_details(mut self, extract: bool) -> Self {
        self.extract_details = Some(extract);
        self
    }

    pub fn buffer_head_and_tail(mut self, buffer: bool) -> Self {
        self.buffer_head_and_tail = Some(buffer);
        self
    }

    pub fn build(self) -> TableReadOptions {
        TableReadOptions {
            coordinate_mode: self.coordinate_mode.unwrap_or_default(),
            extract_details: self.extract_details.unwrap_or(false),
            buffer_head_and_tail: self.buffer_head_and_tail.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default_options() {
        assert_eq!(TableReadOptions::builder().build(), TableReadOptions::default());
        assert!(!TableReadOptions::default().needs_tail());
    }

    #[test]
    fn builder_sets_every_field() {
        let options = TableReadOptionsBuilder::new()
            .coordinate_mode(CoordinateMode::Require3D)
            .extract_details(true)
            .buffer_head_and_tail(true)
            .build();
        assert_eq!(options.coordinate_mode, CoordinateMode::Require3D);
        assert!(options.extract_details);
        assert!(options.buffer_head_and_tail);
        assert!(options.needs_tail());
    }

    #[test]
    fn deserializes_from_kebab_case_toml() {
        let options: TableReadOptions = toml::from_str(
            r#"
            coordinate-mode = "prefer-3d"
            extract-details = true
            "#,
        )
        .unwrap();
        assert_eq!(options.coordinate_mode, CoordinateMode::Prefer3D);
        assert!(options.extract_details);
        assert!(!options.buffer_head_and_tail);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<TableReadOptions, _> = toml::from_str("row-limit = 10");
        assert!(result.is_err());
    }
}
