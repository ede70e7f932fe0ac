//! # Application Configuration
//!
//! A single TOML file tells the engine where the model artifacts live, which sheet
//! to append to and which override rules each condition applies. Relative paths
//! are resolved against the directory of the configuration file.
//!
//! ```toml
//! [ledger]
//! directory = "data"
//! worksheet = "WellAI"
//! ttl_secs = 5
//!
//! [models]
//! cardiovascular = "models/cardio_model.toml"
//! stroke = "models/stroke_model.toml"
//! diabetes = "models/diabetes_model.toml"
//!
//! [[overrides.diabetes]]
//! attribute = "Hba1cLevel"
//! threshold = { below = 4.0 }
//! probability = 0.0
//! ```

use crate::ledger::CsvSheetStore;
use crate::model::ModelError;
use crate::normalize::{NormalizationPolicy, OverrideRule, default_diabetes_overrides};
use crate::types::Condition;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_WORKSHEET: &str = "WellAI";
pub const DEFAULT_TTL_SECS: u64 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid {condition} override rule: {reason}")]
    InvalidOverride { condition: Condition, reason: String },
    #[error("Failed to load the {condition} model from '{path}': {source}")]
    Model {
        condition: Condition,
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("No model is configured for {0}.")]
    MissingCondition(Condition),
    #[error("More than one model is configured for {0}.")]
    DuplicateCondition(Condition),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub directory: PathBuf,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    /// How long a fetched copy of the sheet may be reused for plain reads.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelPaths {
    pub cardiovascular: PathBuf,
    pub stroke: PathBuf,
    pub diabetes: PathBuf,
}

impl ModelPaths {
    pub fn path(&self, condition: Condition) -> &Path {
        match condition {
            Condition::Cardiovascular => &self.cardiovascular,
            Condition::Stroke => &self.stroke,
            Condition::Diabetes => &self.diabetes,
        }
    }
}

/// Override tables per condition. Diabetes defaults to the HbA1c rules when the
/// section is omitted; an explicit empty list disables them.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideConfig {
    #[serde(default)]
    pub cardiovascular: Vec<OverrideRule>,
    #[serde(default)]
    pub stroke: Vec<OverrideRule>,
    #[serde(default = "default_diabetes_overrides")]
    pub diabetes: Vec<OverrideRule>,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            cardiovascular: Vec::new(),
            stroke: Vec::new(),
            diabetes: default_diabetes_overrides(),
        }
    }
}

impl OverrideConfig {
    pub fn rules(&self, condition: Condition) -> &[OverrideRule] {
        match condition {
            Condition::Cardiovascular => &self.cardiovascular,
            Condition::Stroke => &self.stroke,
            Condition::Diabetes => &self.diabetes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub models: ModelPaths,
    #[serde(default)]
    pub overrides: OverrideConfig,
}

fn default_worksheet() -> String {
    DEFAULT_WORKSHEET.to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl AppConfig {
    /// Reads the configuration, resolves relative paths and checks the override
    /// tables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        log::debug!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    /// Parses configuration text. Paths are left exactly as written.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        for condition in Condition::ALL {
            config.policy(condition)?;
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.ledger.directory);
        resolve(&mut self.models.cardiovascular);
        resolve(&mut self.models.stroke);
        resolve(&mut self.models.diabetes);
    }

    pub fn policy(&self, condition: Condition) -> Result<NormalizationPolicy, ConfigError> {
        NormalizationPolicy::new(condition, self.overrides.rules(condition).to_vec())
            .map_err(|reason| ConfigError::InvalidOverride { condition, reason })
    }

    pub fn read_ttl(&self) -> Duration {
        Duration::from_secs(self.ledger.ttl_secs)
    }

    pub fn sheet_store(&self) -> CsvSheetStore {
        CsvSheetStore::new(&self.ledger.directory, &self.ledger.worksheet)
    }
}
