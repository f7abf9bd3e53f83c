//! Runtime configuration.
//!
//! Values come from an optional TOML/JSON file and `FRONT_DESK__*`
//! environment variables, the latter taking precedence:
//!
//! ```text
//! FRONT_DESK__DATA_DIR=/var/lib/front-desk
//! FRONT_DESK__SLOT_MINUTES=30
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Where the front desk keeps its files and how it slices the day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Directory holding both record files.
    pub data_dir: PathBuf,
    pub patients_file: String,
    pub appointments_file: String,
    /// Length of a bookable slot.
    pub slot_minutes: u32,
    /// Replacement clinic catalog. The built-in one is used when absent.
    pub knowledge_file: Option<PathBuf>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            patients_file: "patients.json".to_string(),
            appointments_file: "appointments.json".to_string(),
            slot_minutes: 30,
            knowledge_file: None,
        }
    }
}

impl DeskConfig {
    /// Defaults rooted at `data_dir`.
    pub fn in_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn patients_path(&self) -> PathBuf {
        self.data_dir.join(&self.patients_file)
    }

    pub fn appointments_path(&self) -> PathBuf {
        self.data_dir.join(&self.appointments_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=240).contains(&self.slot_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "slot_minutes",
                message: format!("{} is outside 5..=240", self.slot_minutes),
            });
        }
        for (field, name) in [
            ("patients_file", &self.patients_file),
            ("appointments_file", &self.appointments_file),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "file name is empty".to_string(),
                });
            }
        }
        if self.patients_file == self.appointments_file {
            return Err(ConfigError::InvalidValue {
                field: "appointments_file",
                message: "must differ from patients_file".to_string(),
            });
        }
        Ok(())
    }
}

/// Load configuration from `file` (if given) and the environment.
pub fn load_config(file: Option<&Path>) -> Result<DeskConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(File::from(path).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("FRONT_DESK")
            .separator("__")
            .try_parsing(true),
    );

    let config: DeskConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    tracing::debug!(data_dir = %config.data_dir.display(), slot_minutes = config.slot_minutes, "Loaded configuration");
    Ok(config)
}
