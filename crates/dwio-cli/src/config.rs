use crate::cli::TableFlags;
use crate::error::{CliError, Result};
use dwio::core::io::table::{CoordinateMode, TableReadOptions};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialTableConfig {
    pub coordinate_mode: Option<CoordinateMode>,
    pub extract_details: Option<bool>,
    pub buffer_head_and_tail: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialRxnConfig {
    pub program_name: Option<String>,
}

/// Settings read from a TOML file. Command-line flags take precedence.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub table: Option<PartialTableConfig>,
    pub rxn: Option<PartialRxnConfig>,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn table_options(&self, flags: &TableFlags) -> TableReadOptions {
        let file = self.table.clone().unwrap_or_default();
        let mut builder = TableReadOptions::builder()
            .extract_details(flags.details || file.extract_details.unwrap_or(false))
            .buffer_head_and_tail(
                flags.buffer_head_and_tail || file.buffer_head_and_tail.unwrap_or(false),
            );
        if let Some(mode) = flags.coordinate_mode.or(file.coordinate_mode) {
            builder = builder.coordinate_mode(mode);
        }
        builder.build()
    }

    pub fn program_name(&self, flag: Option<&str>) -> Option<String> {
        flag.map(str::to_string).or_else(|| {
            self.rxn
                .as_ref()
                .and_then(|rxn| rxn.program_name.clone())
        })
    }
}
