//! elprep Configuration Management
//!
//! Handles configuration from environment variables and TOML files,
//! with defaults reproducing the stock biomedical dataset set.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Root directory for per-dataset output folders
    pub output_root: PathBuf,

    /// Write `<split>.skipped.jsonl` files next to mention files
    pub write_diagnostics: bool,

    /// Convert documents of a split in parallel
    pub parallel: bool,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Datasets to prepare
    pub datasets: Vec<DatasetConfig>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        let mm = PathBuf::from("data/UMLS_processed/MM");
        let quaero = PathBuf::from("data/UMLS_processed/QUAERO");
        let spaccc = PathBuf::from("data/UMLS_processed/SPACCC");
        let quaero_fixes = PathBuf::from("data/corrected_code/QUAERO_2014_adapted.csv");

        Self {
            output_root: PathBuf::from("arboEL/data/final_data_encoder"),
            write_diagnostics: true,
            parallel: false,
            logging: LoggingConfig::default(),
            datasets: vec![
                DatasetConfig::new(
                    "MedMentions",
                    mm,
                    CorpusSourceConfig::BigbioJsonl {
                        dir: PathBuf::from("data/bigbio/medmentions_st21pv"),
                    },
                ),
                DatasetConfig::new(
                    "EMEA",
                    quaero.clone(),
                    CorpusSourceConfig::BigbioJsonl {
                        dir: PathBuf::from("data/bigbio/quaero_emea"),
                    },
                )
                .with_corrections(quaero_fixes.clone()),
                DatasetConfig::new(
                    "MEDLINE",
                    quaero,
                    CorpusSourceConfig::BigbioJsonl {
                        dir: PathBuf::from("data/bigbio/quaero_medline"),
                    },
                )
                .with_corrections(quaero_fixes),
                DatasetConfig::new(
                    "SPACCC",
                    spaccc,
                    CorpusSourceConfig::LocalTsv {
                        dir: PathBuf::from("data/SPACCC/Normalization"),
                    },
                )
                .with_corrections("data/corrected_code/SPACCC_adapted.csv"),
            ],
        }
    }
}

impl PrepConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(root) = std::env::var("ELPREP_OUTPUT_ROOT") {
            self.output_root = PathBuf::from(root);
        }
        if let Ok(value) = std::env::var("ELPREP_PARALLEL") {
            self.parallel = parse_bool("ELPREP_PARALLEL", &value)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(value) = std::env::var("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", &value)?;
        }

        Ok(self)
    }

    /// Check dataset names are present and unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(ConfigError::MissingRequired("datasets[].name".to_string()));
            }
            if !seen.insert(dataset.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "datasets[].name".to_string(),
                    value: dataset.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find a dataset by name (case-insensitive)
    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Output directory of a dataset
    pub fn dataset_output_dir(&self, dataset: &DatasetConfig) -> PathBuf {
        self.output_root.join(&dataset.name)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// One corpus to convert against one terminology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset name, also the output folder name
    pub name: String,

    /// Directory holding the concept and semantic tables
    pub terminology_dir: PathBuf,

    /// Where the documents come from
    pub source: CorpusSourceConfig,

    /// Optional two-column `old_id,new_id` correction file
    #[serde(default)]
    pub correction_file: Option<PathBuf>,
}

impl DatasetConfig {
    pub fn new(
        name: impl Into<String>,
        terminology_dir: impl Into<PathBuf>,
        source: CorpusSourceConfig,
    ) -> Self {
        Self {
            name: name.into(),
            terminology_dir: terminology_dir.into(),
            source,
            correction_file: None,
        }
    }

    /// Set the correction file
    pub fn with_corrections(mut self, path: impl Into<PathBuf>) -> Self {
        self.correction_file = Some(path.into());
        self
    }
}

/// Supported corpus source kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorpusSourceConfig {
    /// Directory of `<split>.jsonl` BigBio-KB exports
    BigbioJsonl { dir: PathBuf },

    /// Directory of `<split>.tsv` annotation tables with raw texts in
    /// `../raw_txt/<split>/`
    LocalTsv { dir: PathBuf },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
