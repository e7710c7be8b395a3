//! Persistent run settings
//!
//! Every field has a default, so a config file only needs the keys it overrides.
//! Command-line flags are applied on top by the caller.

use crate::error::{Error, Result};
use crate::filter::FilterCriteria;
use crate::pipeline::RunOptions;
use crate::writer::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT: &str = "./spell_list_inputs.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "./output/cards";
pub const DEFAULT_TABLES_DIR: &str = "./resources/tables";

/// Settings loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spell list CSV
    pub input: PathBuf,
    /// Root of the per-level output directories
    pub output_dir: PathBuf,
    /// Directory holding `<name>_table<n>.html` fragments
    pub tables_dir: PathBuf,
    pub format: DocumentFormat,
    /// Comma-separated class filter, e.g. "wizard,cleric"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<String>,
    /// Comma-separated level filter, e.g. "0,1,9"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tables_dir: PathBuf::from(DEFAULT_TABLES_DIR),
            format: DocumentFormat::default(),
            classes: None,
            levels: None,
        }
    }
}

impl Config {
    /// Load a config file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parse the class and level filters
    pub fn criteria(&self) -> Result<FilterCriteria> {
        FilterCriteria::parse(self.classes.as_deref(), self.levels.as_deref())
    }

    pub fn run_options(&self, preview: bool) -> RunOptions {
        RunOptions {
            input: self.input.clone(),
            output_dir: self.output_dir.clone(),
            tables_dir: self.tables_dir.clone(),
            format: self.format,
            preview,
        }
    }
}
