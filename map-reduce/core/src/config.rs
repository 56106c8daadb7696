// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::merger::CleanupPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("mr-work")
}

fn default_max_workers() -> usize {
    4
}

/// Description of one job run, as read from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub job_name: String,
    /// One map task per input file, in task index order
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    pub reduce_count: usize,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub cleanup: CleanupPolicy,
}

impl JobConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn map_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job_name.is_empty() {
            return Err(ConfigError::Invalid("job_name must not be empty".into()));
        }
        if self.reduce_count == 0 {
            return Err(ConfigError::Invalid("reduce_count must be positive".into()));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be positive".into()));
        }
        if self.inputs.is_empty() {
            return Err(ConfigError::Invalid("at least one input is required".into()));
        }
        Ok(())
    }
}
